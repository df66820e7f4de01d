//! Infection levels, corpse rise and rot, zombification.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorId};
use crate::combat::{Remains, kill_actor_with};
use crate::constants::{
    BLOOD_DECORATION_TURNS, INFECTION_BLEED_HP_LOSS, INFECTION_EFFECT_TRIGGER_CHANCE_1000,
    INFECTION_LEVEL_1_WEAK, INFECTION_LEVEL_2_TIRED, INFECTION_LEVEL_3_VOMIT,
    INFECTION_LEVEL_4_BLEED, INFECTION_LEVEL_5_DEATH, INFECTION_TIRED_SLEEP_LOSS,
    INFECTION_TIRED_STAMINA_LOSS, INFECTION_VOMIT_STAMINA_LOSS, INFECTION_WEAK_STAMINA_LOSS,
    LOG_CORPSE_RISE, LOG_CORPSE_ROT, LOG_INFECTION_EFFECT, LOG_INFECTION_TURNED,
    LOG_PLAYER_ZOMBIFIED, VOMIT_FOOD_LOSS,
};
use crate::context::{SpawnRole, TurnContext};
use crate::economy::{infect, spend_food, spend_sleep, spend_stamina, take_damage};
use crate::error::SimError;
use crate::map::{Decoration, Map};
use crate::numbers::{percent_of, scale_pct, scale_ratio};

/// Severity band of an actor's infection meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectionLevel {
    Healthy,
    Weak,
    Tired,
    Vomit,
    Bleed,
    Death,
}

impl InfectionLevel {
    #[must_use]
    pub const fn from_percent(percent: i32) -> Self {
        if percent >= INFECTION_LEVEL_5_DEATH {
            Self::Death
        } else if percent >= INFECTION_LEVEL_4_BLEED {
            Self::Bleed
        } else if percent >= INFECTION_LEVEL_3_VOMIT {
            Self::Vomit
        } else if percent >= INFECTION_LEVEL_2_TIRED {
            Self::Tired
        } else if percent >= INFECTION_LEVEL_1_WEAK {
            Self::Weak
        } else {
            Self::Healthy
        }
    }

    #[must_use]
    pub const fn i18n_key(self) -> &'static str {
        match self {
            Self::Healthy => "infection.healthy",
            Self::Weak => "infection.weak",
            Self::Tired => "infection.tired",
            Self::Vomit => "infection.vomit",
            Self::Bleed => "infection.bleed",
            Self::Death => "infection.death",
        }
    }
}

/// Infection as a percentage of the model maximum.
#[must_use]
pub fn infection_percent(actor: &Actor) -> i32 {
    percent_of(actor.infection, actor.model.max_infection)
}

#[must_use]
pub fn infection_level(actor: &Actor) -> InfectionLevel {
    InfectionLevel::from_percent(infection_percent(actor))
}

/// Per-mille chance that the current level's effect fires this turn.
#[must_use]
pub const fn effect_chance_permil(percent: i32) -> i32 {
    INFECTION_EFFECT_TRIGGER_CHANCE_1000 + percent / 5
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectionReport {
    pub effects: usize,
    pub bled_out: usize,
    pub turned: usize,
}

/// Grow every infected actor's meter and roll its level effect.
///
/// # Errors
///
/// Propagates invariant violations from the resulting deaths.
pub fn update_infection(ctx: &mut TurnContext, map: &mut Map) -> Result<InfectionReport, SimError> {
    let mut report = InfectionReport::default();
    if !ctx.config.mode.has_infection() {
        return Ok(report);
    }
    let turn = map.local_time.turn;
    let mut bled: Vec<ActorId> = Vec::new();
    let mut turning: Vec<ActorId> = Vec::new();
    let mut vomit_at = Vec::new();
    for actor in &mut map.actors {
        if !actor.is_infected() {
            continue;
        }
        infect(actor, ctx.config.infection_growth_per_turn);
        let percent = infection_percent(actor);
        let level = InfectionLevel::from_percent(percent);
        if level == InfectionLevel::Healthy || !ctx.dice.roll_permil(effect_chance_permil(percent)) {
            continue;
        }
        report.effects += 1;
        ctx.messages
            .push(turn, LOG_INFECTION_EFFECT, Some(actor.id), level.i18n_key());
        match level {
            InfectionLevel::Healthy => {}
            InfectionLevel::Weak => spend_stamina(actor, INFECTION_WEAK_STAMINA_LOSS),
            InfectionLevel::Tired => {
                spend_stamina(actor, INFECTION_TIRED_STAMINA_LOSS);
                spend_sleep(actor, INFECTION_TIRED_SLEEP_LOSS);
            }
            InfectionLevel::Vomit => {
                actor.is_sleeping = false;
                spend_food(actor, VOMIT_FOOD_LOSS);
                spend_stamina(actor, INFECTION_VOMIT_STAMINA_LOSS);
                vomit_at.push(actor.position);
            }
            InfectionLevel::Bleed => {
                actor.is_sleeping = false;
                if take_damage(actor, INFECTION_BLEED_HP_LOSS) {
                    bled.push(actor.id);
                }
            }
            InfectionLevel::Death => turning.push(actor.id),
        }
    }
    for pos in vomit_at {
        map.add_decoration(pos, Decoration::Vomit, BLOOD_DECORATION_TURNS);
    }
    for id in bled {
        kill_actor_with(ctx, map, None, id, "infection", Remains::ByMode)?;
        report.bled_out += 1;
    }
    for id in turning {
        let was_player = map.actor(id).is_some_and(Actor::is_player);
        kill_actor_with(ctx, map, None, id, "infection", Remains::Zombify)?;
        ctx.messages.push(turn, LOG_INFECTION_TURNED, Some(id), "");
        if was_player {
            debug!("player {id} turned from infection at turn {turn}");
        }
        report.turned += 1;
    }
    Ok(report)
}

/// Turn a dead actor into its model's undead form at its position, with HP
/// scaled by `hp_num / hp_den`. Returns `None` when the model does not
/// zombify or the tile is taken.
///
/// # Errors
///
/// Returns `SimError::MissingModel` when the zombified model is not in the
/// catalog.
pub fn zombify(
    ctx: &mut TurnContext,
    map: &mut Map,
    dead: Actor,
    hp_num: i32,
    hp_den: i32,
) -> Result<Option<ActorId>, SimError> {
    let Some(target) = dead.model.zombifies_into else {
        return Ok(None);
    };
    let pos = dead.position;
    if map.actor_at(pos).is_some() {
        return Ok(None);
    }
    let model = ctx.models.require(target)?.clone();
    let controller = ctx.controllers.controller_for(&model, SpawnRole::Zombified);
    let id = ctx.ids.next_id();
    let mut undead = Actor::new(id, model, pos).with_controller(controller);
    undead.name = format!("{} (zombified)", dead.name);
    undead.skills = dead.skills.undead_only();
    let max_hp = undead.max_hp();
    undead.hit_points = scale_ratio(max_hp, hp_num, hp_den.max(1)).clamp(1, max_hp);
    undead.action_points = 0;
    map.place_actor(undead)?;
    if dead.is_player() {
        ctx.messages
            .push(map.local_time.turn, LOG_PLAYER_ZOMBIFIED, Some(dead.id), id.to_string());
    }
    debug!("{} rose as {id} at ({}, {})", dead.id, pos.x, pos.y);
    Ok(Some(id))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpseReport {
    pub risen: usize,
    pub rotted: usize,
}

/// Per-mille rise chance for a corpse this turn, zero while the rise delay
/// runs or when the mode leaves the dead in peace.
fn rise_chance_permil(ctx: &TurnContext, map: &Map, dead_guy: &Actor, died_at: i32) -> i32 {
    let tuning = ctx.config.corpses;
    let mode = ctx.config.mode;
    if dead_guy.model.zombifies_into.is_none()
        || map.local_time.turn - died_at < tuning.rise_delay_turns
        || (mode.has_infection() && dead_guy.infection <= 0)
    {
        return 0;
    }
    let factor = if map.local_time.is_night() {
        tuning.night_factor_pct
    } else {
        tuning.day_factor_pct
    };
    scale_pct(tuning.rise_chance_permil, factor)
}

/// Roll rise against decay for every corpse on the map.
///
/// # Errors
///
/// Propagates catalog errors from zombification.
pub fn update_corpses(ctx: &mut TurnContext, map: &mut Map) -> Result<CorpseReport, SimError> {
    let mut report = CorpseReport::default();
    let turn = map.local_time.turn;
    let mut idx = 0;
    while idx < map.corpses.len() {
        let corpse = &map.corpses[idx];
        let chance = rise_chance_permil(ctx, map, &corpse.dead_guy, corpse.turn);
        let free = map.actor_at(corpse.position).is_none();
        if chance > 0 && free && ctx.dice.roll_permil(chance) {
            let corpse = map.corpses.remove(idx);
            let dead_id = corpse.dead_guy.id;
            if let Some(dragger) = corpse.dragged_by.and_then(|id| map.actor_mut(id)) {
                dragger.dragged_corpse = None;
            }
            if let Some(risen) = zombify(
                ctx,
                map,
                corpse.dead_guy,
                corpse.hit_points,
                corpse.max_hit_points,
            )? {
                ctx.messages.push(turn, LOG_CORPSE_RISE, Some(risen), dead_id.to_string());
                report.risen += 1;
            }
            continue;
        }
        let corpse = &mut map.corpses[idx];
        corpse.hit_points -= ctx.config.corpses.decay_per_turn;
        if corpse.hit_points <= 0 {
            let corpse = map.corpses.remove(idx);
            if let Some(dragger) = corpse.dragged_by.and_then(|id| map.actor_mut(id)) {
                dragger.dragged_corpse = None;
            }
            ctx.messages
                .push(turn, LOG_CORPSE_ROT, None, corpse.dead_guy.id.to_string());
            report.rotted += 1;
            continue;
        }
        idx += 1;
    }
    Ok(report)
}
