//! End-of-turn housekeeping for one map.
//!
//! A full turn runs the steps in a fixed order: corpses and infection,
//! scents, AP/stamina regen, tired runners, gauges, batteries, explosives,
//! fires. A low-detail turn only runs the tail: timers, the clock tick and
//! the dawn/dusk NPC upgrades.
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::actor::ActorId;
use crate::combat::{do_blast, kill_actor};
use crate::constants::{
    LOG_BATTERY_DEAD, LOG_BOND_REASSURE, LOG_EXHAUSTION_COLLAPSE, LOG_FIRE_OUT, LOG_NIGHTMARE,
    LOG_TOO_TIRED_TO_RUN, LOG_WAKE_UP, ROT_STARVING_HP_CHANCE, SANITY_BOND_RECOVER,
    SANITY_BOND_RECOVER_CHANCE, SANITY_NIGHTMARE_CHANCE, SANITY_NIGHTMARE_LOSS,
    SKILL_AWAKE_SLEEP_REGEN_BONUS, SKILL_HARDY_HEAL_CHANCE_BONUS, SLEEP_EXHAUSTION_COLLAPSE_CHANCE,
    SLEEP_HEAL_CHANCE, SLEEP_REGEN_PER_TURN, STAMINA_REGEN_PER_TURN, STARVING_DEATH_CHANCE,
    TRUST_BOND_THRESHOLD, TRUST_MAX, TRUST_PER_TURN,
};
use crate::context::TurnContext;
use crate::economy::{
    heal, regen_action_points, regen_sanity, regen_sleep, regen_stamina, spend_food, spend_sanity,
    spend_sleep, take_damage,
};
use crate::error::SimError;
use crate::geometry::Point;
use crate::infection::{CorpseReport, InfectionReport, update_corpses, update_infection};
use crate::items::{Item, ItemKind};
use crate::map::{Map, TaskKind};
use crate::progression::{Skill, upgrade_npcs};
use crate::scent::{OdorKind, OdorScent};

/// Fidelity of a maintenance pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detail {
    Full,
    Low,
}

/// What one maintenance pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Local turn after the tick.
    pub turn: i32,
    pub corpses: CorpseReport,
    pub infection: InfectionReport,
    pub stopped_running: usize,
    pub starved: usize,
    pub detonations: usize,
    pub fires_out: usize,
    pub timers_completed: usize,
    pub living_upgrades: usize,
    pub undead_upgrades: usize,
}

/// Close the map's current local turn.
///
/// # Errors
///
/// Propagates invariant violations raised by deaths during the pass.
pub fn end_turn(ctx: &mut TurnContext, map: &mut Map, detail: Detail) -> Result<TurnReport, SimError> {
    let mut report = TurnReport::default();
    let was_night = map.local_time.is_night();

    if detail == Detail::Full {
        report.corpses = update_corpses(ctx, map)?;
        report.infection = update_infection(ctx, map)?;
        update_scents(ctx, map);
        regen_actors(map);
        report.stopped_running = stop_tired_runners(ctx, map);
        report.starved = update_gauges(ctx, map)?;
        drain_batteries(ctx, map);
        report.detonations = update_explosives(ctx, map)?;
        report.fires_out = extinguish_fires(ctx, map);
    }

    report.timers_completed = run_timers(map);
    map.local_time.advance();
    let is_night = map.local_time.is_night();
    let upgrades = ctx.config.npc_upgrades;
    if was_night && !is_night && upgrades.living {
        report.living_upgrades = upgrade_npcs(ctx, map, false);
    }
    if !was_night
        && is_night
        && upgrades.undead
        && upgrades.undead_cadence.fires_on_day(map.local_time.day())
    {
        report.undead_upgrades = upgrade_npcs(ctx, map, true);
    }
    map.killed.clear();
    report.turn = map.local_time.turn;
    debug!("{} closed turn {} ({detail:?})", map.name, report.turn);
    Ok(report)
}

fn update_scents(ctx: &TurnContext, map: &mut Map) {
    map.scents.apply_perfumes();
    map.decay_scents(ctx.weather);
    for actor in &map.actors {
        let odor = if actor.model.abilities.is_undead_master {
            OdorKind::UndeadMaster
        } else if actor.is_undead() {
            continue;
        } else {
            OdorKind::Living
        };
        map.scents
            .refresh_at(actor.position, odor, OdorScent::MAX_STRENGTH);
    }
}

fn regen_actors(map: &mut Map) {
    for actor in map.actors.iter_mut().filter(|a| !a.is_sleeping) {
        regen_action_points(actor);
        regen_stamina(actor, STAMINA_REGEN_PER_TURN);
    }
    map.check_next_actor_index = 0;
}

fn stop_tired_runners(ctx: &mut TurnContext, map: &mut Map) -> usize {
    let turn = map.local_time.turn;
    let mut stopped = 0;
    for actor in map.actors.iter_mut().filter(|a| a.is_running && a.is_tired()) {
        actor.is_running = false;
        stopped += 1;
        if actor.is_player() {
            ctx.messages.push(turn, LOG_TOO_TIRED_TO_RUN, Some(actor.id), "");
        }
    }
    stopped
}

/// Actors with a bonded leader or follower on the same map.
fn bonded_actors(map: &Map) -> BTreeSet<ActorId> {
    let mut bonded = BTreeSet::new();
    for actor in &map.actors {
        if let Some(leader) = actor.leader
            && actor.trust_in_leader >= TRUST_BOND_THRESHOLD
            && map.actor(leader).is_some()
        {
            bonded.insert(actor.id);
            bonded.insert(leader);
        }
    }
    bonded
}

fn update_gauges(ctx: &mut TurnContext, map: &mut Map) -> Result<usize, SimError> {
    let turn = map.local_time.turn;
    let night = map.local_time.is_night();
    let bonded = bonded_actors(map);
    let mut starved = Vec::new();

    for actor in &mut map.actors {
        let abilities = actor.model.abilities;
        if abilities.has_to_eat {
            spend_food(actor, 1);
            if actor.is_starving() && ctx.dice.roll_chance(STARVING_DEATH_CHANCE) {
                starved.push(actor.id);
            }
        } else if abilities.is_rotting {
            spend_food(actor, 1);
            if actor.is_starving()
                && ctx.dice.roll_chance(ROT_STARVING_HP_CHANCE)
                && take_damage(actor, 1)
            {
                starved.push(actor.id);
            }
        }

        if abilities.has_to_sleep {
            if actor.is_sleeping {
                if actor.is_disturbed() && ctx.dice.roll_chance(SANITY_NIGHTMARE_CHANCE) {
                    actor.is_sleeping = false;
                    spend_sanity(actor, SANITY_NIGHTMARE_LOSS);
                    ctx.messages.push(turn, LOG_NIGHTMARE, Some(actor.id), "");
                } else {
                    let awake = actor.skills.level(Skill::Awake);
                    regen_sleep(actor, SLEEP_REGEN_PER_TURN + SKILL_AWAKE_SLEEP_REGEN_BONUS * awake);
                    let hardy = actor.skills.level(Skill::Hardy);
                    if ctx
                        .dice
                        .roll_chance(SLEEP_HEAL_CHANCE + SKILL_HARDY_HEAL_CHANCE_BONUS * hardy)
                    {
                        heal(actor, 1);
                    }
                    if actor.is_hungry() || actor.sleep >= actor.model.max_sleep {
                        actor.is_sleeping = false;
                        ctx.messages.push(turn, LOG_WAKE_UP, Some(actor.id), "");
                    }
                }
            } else {
                spend_sleep(actor, if night { 2 } else { 1 });
                if actor.is_exhausted() && ctx.dice.roll_chance(SLEEP_EXHAUSTION_COLLAPSE_CHANCE) {
                    actor.is_sleeping = true;
                    actor.is_running = false;
                    ctx.messages
                        .push(turn, LOG_EXHAUSTION_COLLAPSE, Some(actor.id), "");
                }
            }
        }

        spend_sanity(actor, 1);
        if actor.leader.is_some() {
            actor.trust_in_leader = (actor.trust_in_leader + TRUST_PER_TURN).min(TRUST_MAX);
        }
        if bonded.contains(&actor.id)
            && abilities.has_sanity
            && ctx.dice.roll_chance(SANITY_BOND_RECOVER_CHANCE)
        {
            regen_sanity(actor, SANITY_BOND_RECOVER);
            ctx.messages.push(turn, LOG_BOND_REASSURE, Some(actor.id), "");
        }
    }

    let count = starved.len();
    for id in starved {
        kill_actor(ctx, map, None, id, "starvation")?;
    }
    Ok(count)
}

fn drain_batteries(ctx: &mut TurnContext, map: &mut Map) {
    let turn = map.local_time.turn;
    for actor in &mut map.actors {
        for item in actor.inventory.items.iter_mut().filter(|i| i.equipped) {
            let (ItemKind::Light { batteries, .. } | ItemKind::Tracker { batteries, .. }) = &mut item.kind
            else {
                continue;
            };
            if *batteries <= 0 {
                continue;
            }
            *batteries -= 1;
            if *batteries == 0 {
                ctx.messages
                    .push(turn, LOG_BATTERY_DEAD, Some(actor.id), item.name.clone());
            }
        }
    }
}

/// Tick every primed fuse, then detonate expired explosives one at a time,
/// ground stacks before carried items, until none is left.
fn update_explosives(ctx: &mut TurnContext, map: &mut Map) -> Result<usize, SimError> {
    for stack in map.ground.values_mut() {
        stack.tick_fuses();
    }
    for actor in &mut map.actors {
        actor.inventory.tick_fuses();
    }

    let mut detonations = 0;
    loop {
        let on_ground = map
            .ground
            .iter()
            .find_map(|(pos, stack)| stack.expired_explosive_index().map(|idx| (*pos, idx)));
        if let Some((pos, idx)) = on_ground {
            let item = map.take_ground_item(pos, idx)?;
            detonate(ctx, map, pos, &item)?;
            detonations += 1;
            continue;
        }

        let carried = map.actors.iter().find_map(|a| {
            a.inventory
                .expired_explosive_index()
                .map(|idx| (a.id, a.position, idx))
        });
        if let Some((id, pos, idx)) = carried {
            let item = map
                .actor_mut(id)
                .and_then(|a| a.inventory.remove_at(idx))
                .ok_or(SimError::UnknownActor(id))?;
            detonate(ctx, map, pos, &item)?;
            detonations += 1;
            continue;
        }
        break;
    }
    Ok(detonations)
}

fn detonate(ctx: &mut TurnContext, map: &mut Map, pos: Point, item: &Item) -> Result<(), SimError> {
    if let ItemKind::PrimedExplosive { blast, .. } = &item.kind {
        do_blast(ctx, map, pos, blast, None)?;
    }
    Ok(())
}

/// Rain puts out fires on outside tiles. Uses the global weather.
fn extinguish_fires(ctx: &mut TurnContext, map: &mut Map) -> usize {
    let chance = ctx.weather.extinguish_chance();
    if chance <= 0 {
        return 0;
    }
    let turn = map.local_time.turn;
    let burning: Vec<_> = map
        .objects
        .iter()
        .filter(|(pos, object)| object.on_fire && map.is_outside(**pos))
        .map(|(pos, _)| *pos)
        .collect();
    let mut out = 0;
    for pos in burning {
        if !ctx.dice.roll_chance(chance) {
            continue;
        }
        if let Some(object) = map.objects.get_mut(&pos) {
            object.on_fire = false;
            ctx.messages.push(turn, LOG_FIRE_OUT, None, object.name.clone());
            out += 1;
        }
    }
    out
}

fn run_timers(map: &mut Map) -> usize {
    let mut due = Vec::new();
    map.timers.retain_mut(|task| {
        if task.tick() {
            due.push(task.kind.clone());
            false
        } else {
            true
        }
    });
    let completed = due.len();
    for kind in due {
        match kind {
            TaskKind::RemoveDecoration { pos, decoration } => map.remove_decoration(pos, decoration),
            TaskKind::ReleaseScent { pos, odor, strength } => {
                map.scents.refresh_at(pos, odor, strength);
            }
        }
    }
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::config::{GameMode, SimConfig};
    use crate::constants::{TURNS_PER_HOUR, TURNS_PER_DAY};
    use crate::map::{Decoration, MapKind, MapObject};
    use crate::models::{ModelCatalog, ModelId};
    use crate::rng::ScriptedDice;
    use crate::weather::Weather;
    use crate::world::DistrictPos;
    use std::sync::Arc;

    fn ctx_with(dice: ScriptedDice) -> TurnContext {
        let config = SimConfig {
            mode: GameMode::Vintage,
            ..SimConfig::default()
        };
        TurnContext::new(
            Arc::new(config),
            Arc::new(ModelCatalog::default_catalog().clone()),
            Box::new(dice),
        )
    }

    fn spawn(map: &mut Map, id: u64, model: ModelId, pos: Point) -> ActorId {
        let model = ModelCatalog::default_catalog()
            .require(model)
            .expect("model")
            .clone();
        map.place_actor(Actor::new(ActorId(id), model, pos))
            .expect("placed");
        ActorId(id)
    }

    fn map() -> Map {
        Map::new("t", MapKind::Entry, DistrictPos::new(0, 0), 10, 10)
    }

    #[test]
    fn low_detail_only_runs_the_tail() {
        let mut ctx = ctx_with(ScriptedDice::new());
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(1, 1));
        map.actor_mut(id).expect("a").action_points = 0;
        map.add_decoration(Point::new(2, 2), Decoration::Blood, 1);
        let report = end_turn(&mut ctx, &mut map, Detail::Low).expect("tick");
        assert_eq!(report.turn, 1);
        assert_eq!(report.timers_completed, 1);
        let actor = map.actor(id).expect("a");
        assert_eq!(actor.action_points, 0);
        assert_eq!(actor.food, actor.model.max_food);
        assert!(map.scents.is_empty());
        assert_eq!(map.tile(Point::new(2, 2)).map(|t| t.decorations.len()), Some(0));
    }

    #[test]
    fn closing_a_turn_forgets_its_kills() {
        let mut ctx = ctx_with(ScriptedDice::new());
        let mut map = map();
        let victim = spawn(&mut map, 1, ModelId::Civilian, Point::new(1, 1));
        kill_actor(&mut ctx, &mut map, None, victim, "test").expect("killed");
        assert_eq!(
            kill_actor(&mut ctx, &mut map, None, victim, "again").unwrap_err(),
            SimError::AlreadyDead(victim)
        );
        end_turn(&mut ctx, &mut map, Detail::Low).expect("tick");
        assert!(map.killed.is_empty());
        assert_eq!(
            kill_actor(&mut ctx, &mut map, None, victim, "later").unwrap_err(),
            SimError::UnknownActor(victim)
        );
    }

    #[test]
    fn full_turn_regens_and_leaves_scent() {
        let mut ctx = ctx_with(ScriptedDice::new());
        let mut map = map();
        let living = spawn(&mut map, 1, ModelId::Civilian, Point::new(1, 1));
        spawn(&mut map, 2, ModelId::Zombie, Point::new(5, 5));
        spawn(&mut map, 3, ModelId::ZombieMaster, Point::new(7, 7));
        map.actor_mut(living).expect("a").action_points = 0;
        map.check_next_actor_index = 3;
        end_turn(&mut ctx, &mut map, Detail::Full).expect("tick");
        assert_eq!(map.check_next_actor_index, 0);
        assert_eq!(map.actor(living).expect("a").action_points, 100);
        assert_eq!(map.scents.scent_at(Point::new(1, 1), OdorKind::Living), OdorScent::MAX_STRENGTH);
        assert_eq!(map.scents.scent_at(Point::new(5, 5), OdorKind::Living), 0);
        assert_eq!(
            map.scents.scent_at(Point::new(7, 7), OdorKind::UndeadMaster),
            OdorScent::MAX_STRENGTH
        );
        assert_eq!(map.scents.len(), 2);
    }

    #[test]
    fn sleepers_skip_regen_and_wake_when_rested() {
        let mut ctx = ctx_with(ScriptedDice::new());
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(1, 1));
        let sleeper = map.actor_mut(id).expect("a");
        sleeper.is_sleeping = true;
        sleeper.action_points = 0;
        sleeper.sleep = sleeper.model.max_sleep - 1;
        end_turn(&mut ctx, &mut map, Detail::Full).expect("tick");
        let sleeper = map.actor(id).expect("a");
        assert_eq!(sleeper.action_points, 0);
        assert!(!sleeper.is_sleeping);
        assert!(ctx.messages.contains_key(LOG_WAKE_UP));
    }

    #[test]
    fn awake_actors_lose_double_sleep_at_night() {
        let mut ctx = ctx_with(ScriptedDice::new());
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(1, 1));
        let max = map.actor(id).expect("a").model.max_sleep;
        end_turn(&mut ctx, &mut map, Detail::Full).expect("night tick");
        assert_eq!(map.actor(id).expect("a").sleep, max - 2);
        map.local_time.turn = 12 * TURNS_PER_HOUR;
        end_turn(&mut ctx, &mut map, Detail::Full).expect("day tick");
        assert_eq!(map.actor(id).expect("a").sleep, max - 3);
    }

    #[test]
    fn starving_roll_kills() {
        let mut ctx = ctx_with(ScriptedDice::new().with_rolls([0]));
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(1, 1));
        map.actor_mut(id).expect("a").food = 1;
        let report = end_turn(&mut ctx, &mut map, Detail::Full).expect("tick");
        assert_eq!(report.starved, 1);
        assert!(map.actor(id).is_none());
    }

    #[test]
    fn batteries_drain_and_report_depletion() {
        let mut ctx = ctx_with(ScriptedDice::new());
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(1, 1));
        let mut light = Item::flashlight().equip();
        if let ItemKind::Light { batteries, .. } = &mut light.kind {
            *batteries = 1;
        }
        map.actor_mut(id)
            .expect("a")
            .inventory
            .add(light)
            .expect("room");
        end_turn(&mut ctx, &mut map, Detail::Full).expect("tick");
        assert!(ctx.messages.contains_key(LOG_BATTERY_DEAD));
        end_turn(&mut ctx, &mut map, Detail::Full).expect("tick");
        assert_eq!(ctx.messages.count_key(LOG_BATTERY_DEAD), 1);
    }

    #[test]
    fn chained_explosives_all_go_off_in_one_pass() {
        let mut ctx = ctx_with(ScriptedDice::new());
        let mut map = map();
        map.drop_item(Point::new(4, 4), Item::grenade().primed(Some(1)))
            .expect("dropped");
        map.drop_item(Point::new(5, 4), Item::grenade()).expect("dropped");
        let carrier = spawn(&mut map, 1, ModelId::Soldier, Point::new(6, 4));
        map.actor_mut(carrier)
            .expect("a")
            .inventory
            .add(Item::grenade())
            .expect("room");
        let report = end_turn(&mut ctx, &mut map, Detail::Full).expect("tick");
        assert_eq!(report.detonations, 3);
        assert!(map.ground.values().all(|s| s.expired_explosive_index().is_none()));
        assert!(map.actor(carrier).is_none());
    }

    #[test]
    fn rain_puts_out_outside_fires() {
        let mut ctx = ctx_with(ScriptedDice::new().with_rolls([0]));
        ctx.weather = Weather::HeavyRain;
        let mut map = map();
        let mut car = MapObject::car();
        car.on_fire = true;
        map.objects.insert(Point::new(3, 3), car);
        let report = end_turn(&mut ctx, &mut map, Detail::Full).expect("tick");
        assert_eq!(report.fires_out, 1);
        assert!(!map.objects[&Point::new(3, 3)].on_fire);
    }

    #[test]
    fn dawn_upgrades_living_and_dusk_upgrades_undead() {
        let mut ctx = ctx_with(ScriptedDice::new());
        let mut map = map();
        spawn(&mut map, 1, ModelId::Civilian, Point::new(1, 1));
        spawn(&mut map, 2, ModelId::Zombie, Point::new(5, 5));
        map.local_time.turn = 6 * TURNS_PER_HOUR - 1;
        let dawn = end_turn(&mut ctx, &mut map, Detail::Low).expect("dawn");
        assert_eq!((dawn.living_upgrades, dawn.undead_upgrades), (1, 0));
        map.local_time.turn = 18 * TURNS_PER_HOUR - 1;
        let dusk = end_turn(&mut ctx, &mut map, Detail::Low).expect("dusk");
        assert_eq!((dusk.living_upgrades, dusk.undead_upgrades), (0, 1));
        map.local_time.turn = TURNS_PER_DAY + 100;
        let plain = end_turn(&mut ctx, &mut map, Detail::Low).expect("plain");
        assert_eq!((plain.living_upgrades, plain.undead_upgrades), (0, 0));
    }
}
