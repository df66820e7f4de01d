//! Actions actors can attempt, their legality checks and execution.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::combat::{do_melee_attack, do_ranged_attack};
use crate::constants::{
    BASE_ACTION_COST, LOG_FALL_ASLEEP, LOG_SHOUT, LOG_SPRAY, LOG_THROW, STAMINA_COST_RUNNING,
    THROW_RANGE, TURNS_PER_HOUR,
};
use crate::context::TurnContext;
use crate::economy::{move_cost, spend_action_points, spend_stamina};
use crate::error::{Refusal, SimError};
use crate::geometry::{Direction, Point, grid_distance, is_adjacent, trace_line};
use crate::items::ItemKind;
use crate::map::{Map, TaskKind, TimedTask};
use crate::rng::Dice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    /// One shot at full accuracy.
    #[default]
    Default,
    /// Two shots at reduced accuracy.
    Rapid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Wait,
    Step(Direction),
    ToggleRunning,
    StartSleeping,
    MeleeAttack(ActorId),
    RangedAttack { target: ActorId, mode: FireMode },
    ThrowExplosive { target: Point },
    UseSpray,
    Shout,
}

/// Result of a player action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Performed,
    /// Refused with a message; no AP was spent.
    Refused(Refusal),
}

/// Check whether `actor` may attempt `action` right now.
///
/// # Errors
///
/// Returns the gameplay `Refusal` explaining why the action is not allowed.
pub fn check_legality(map: &Map, actor: ActorId, action: Action) -> Result<(), Refusal> {
    let Some(me) = map.actor(actor) else {
        return Err(Refusal::NoTarget);
    };
    match action {
        Action::Wait | Action::Shout => Ok(()),
        Action::Step(dir) => {
            if map.is_free(me.position.offset(dir)) {
                Ok(())
            } else {
                Err(Refusal::Blocked)
            }
        }
        Action::ToggleRunning => {
            if !me.model.abilities.can_run {
                Err(Refusal::CannotRun)
            } else if !me.is_running && me.is_tired() {
                Err(Refusal::TooTiredToRun)
            } else {
                Ok(())
            }
        }
        Action::StartSleeping => {
            if !me.model.abilities.has_to_sleep {
                Err(Refusal::CannotSleep)
            } else if me.is_sleeping {
                Err(Refusal::AlreadySleeping)
            } else if !me.is_sleepy() {
                Err(Refusal::NotSleepy)
            } else {
                Ok(())
            }
        }
        Action::MeleeAttack(target) => {
            let other = map
                .actor(target)
                .filter(|t| t.id != actor)
                .ok_or(Refusal::NoTarget)?;
            if !is_adjacent(me.position, other.position) {
                Err(Refusal::TargetNotAdjacent)
            } else if me.is_tired() {
                Err(Refusal::TooTiredToAttack)
            } else {
                Ok(())
            }
        }
        Action::RangedAttack { target, .. } => {
            let idx = me
                .inventory
                .equipped_ranged_index()
                .ok_or(Refusal::NoRangedWeapon)?;
            let ItemKind::RangedWeapon { range, ammo, .. } = me.inventory.items[idx].kind else {
                return Err(Refusal::NoRangedWeapon);
            };
            if ammo <= 0 {
                return Err(Refusal::OutOfAmmo);
            }
            let other = map
                .actor(target)
                .filter(|t| t.id != actor)
                .ok_or(Refusal::NoTarget)?;
            if grid_distance(me.position, other.position) > range {
                return Err(Refusal::TargetOutOfRange);
            }
            if has_line_of_fire(map, me.position, other.position) {
                Ok(())
            } else {
                Err(Refusal::NoLineOfFire)
            }
        }
        Action::ThrowExplosive { target } => {
            if me.inventory.explosive_index().is_none() {
                return Err(Refusal::NoExplosive);
            }
            if !map.in_bounds(target) || grid_distance(me.position, target) > THROW_RANGE {
                return Err(Refusal::TargetOutOfRange);
            }
            if !map.has_line_of_effect(me.position, target) || !map.is_walkable(target) {
                return Err(Refusal::NoLineOfFire);
            }
            if map.ground.get(&target).is_some_and(|stack| stack.is_full()) {
                return Err(Refusal::Blocked);
            }
            Ok(())
        }
        Action::UseSpray => {
            let idx = me
                .inventory
                .equipped_index(|kind| matches!(kind, ItemKind::Spray { .. }))
                .ok_or(Refusal::NoSpray)?;
            match me.inventory.items[idx].kind {
                ItemKind::Spray { sprays_left, .. } if sprays_left > 0 => Ok(()),
                _ => Err(Refusal::SprayEmpty),
            }
        }
    }
}

/// Tiles between shooter and target let a shot through: they are
/// see-through and unoccupied. Breakable objects that shatter are allowed
/// here and intercept the shot when it is fired.
#[must_use]
pub fn has_line_of_fire(map: &Map, from: Point, to: Point) -> bool {
    let line = trace_line(from, to);
    line.iter()
        .take(line.len().saturating_sub(1))
        .all(|&p| map.is_transparent(p) && map.actor_at(p).is_none())
}

/// Carry out a legal action.
///
/// # Errors
///
/// Propagates invariant violations from movement and combat.
pub fn execute_action(
    ctx: &mut TurnContext,
    map: &mut Map,
    actor: ActorId,
    action: Action,
) -> Result<(), SimError> {
    let turn = map.local_time.turn;
    match action {
        Action::Wait => {
            let me = map.actor_mut(actor).ok_or(SimError::UnknownActor(actor))?;
            spend_action_points(me, BASE_ACTION_COST);
        }
        Action::Shout => {
            let me = map.actor_mut(actor).ok_or(SimError::UnknownActor(actor))?;
            spend_action_points(me, BASE_ACTION_COST);
            ctx.messages.push(turn, LOG_SHOUT, Some(actor), "");
        }
        Action::Step(dir) => {
            let from = map
                .actor(actor)
                .ok_or(SimError::UnknownActor(actor))?
                .position;
            map.move_actor(actor, from.offset(dir))?;
            if let Some(corpse) = map.corpses.iter_mut().find(|c| c.dragged_by == Some(actor)) {
                corpse.position = from;
            }
            let me = map.actor_mut(actor).ok_or(SimError::UnknownActor(actor))?;
            let cost = move_cost(me);
            spend_action_points(me, cost);
            if me.is_running {
                spend_stamina(me, STAMINA_COST_RUNNING);
            }
        }
        Action::ToggleRunning => {
            let me = map.actor_mut(actor).ok_or(SimError::UnknownActor(actor))?;
            me.is_running = !me.is_running;
        }
        Action::StartSleeping => {
            let me = map.actor_mut(actor).ok_or(SimError::UnknownActor(actor))?;
            me.is_sleeping = true;
            me.is_running = false;
            spend_action_points(me, BASE_ACTION_COST);
            ctx.messages.push(turn, LOG_FALL_ASLEEP, Some(actor), "");
        }
        Action::MeleeAttack(target) => {
            do_melee_attack(ctx, map, actor, target)?;
        }
        Action::RangedAttack { target, mode } => {
            do_ranged_attack(ctx, map, actor, target, mode)?;
        }
        Action::ThrowExplosive { target } => throw_explosive(ctx, map, actor, target)?,
        Action::UseSpray => use_spray(ctx, map, actor)?,
    }
    Ok(())
}

fn throw_explosive(
    ctx: &mut TurnContext,
    map: &mut Map,
    actor: ActorId,
    target: Point,
) -> Result<(), SimError> {
    let turn = map.local_time.turn;
    let me = map.actor_mut(actor).ok_or(SimError::UnknownActor(actor))?;
    let Some(idx) = me.inventory.explosive_index() else {
        return Ok(());
    };
    let Some(item) = me.inventory.remove_at(idx) else {
        return Ok(());
    };
    spend_action_points(me, BASE_ACTION_COST);
    let primed = item.primed(None);
    let name = primed.name.clone();
    if map.drop_item(target, primed).is_err() {
        return Err(SimError::MissingGroundInventory(target));
    }
    debug!("actor {actor} threw {name} at ({}, {})", target.x, target.y);
    ctx.messages.push(turn, LOG_THROW, Some(actor), name);
    Ok(())
}

fn use_spray(ctx: &mut TurnContext, map: &mut Map, actor: ActorId) -> Result<(), SimError> {
    let turn = map.local_time.turn;
    let me = map.actor_mut(actor).ok_or(SimError::UnknownActor(actor))?;
    let pos = me.position;
    let Some(idx) = me
        .inventory
        .equipped_index(|kind| matches!(kind, ItemKind::Spray { .. }))
    else {
        return Ok(());
    };
    let ItemKind::Spray {
        odor,
        strength,
        sprays_left,
    } = &mut me.inventory.items[idx].kind
    else {
        return Ok(());
    };
    *sprays_left -= 1;
    let (odor, strength) = (*odor, *strength);
    spend_action_points(me, BASE_ACTION_COST);
    map.scents.refresh_at(pos, odor, strength);
    map.timers.push(TimedTask::new(
        TURNS_PER_HOUR,
        TaskKind::ReleaseScent {
            pos,
            odor,
            strength: strength / 2,
        },
    ));
    ctx.messages.push(turn, LOG_SPRAY, Some(actor), "");
    Ok(())
}

/// Attempt a player action: refusals become a message and cost nothing.
///
/// # Errors
///
/// Propagates invariant violations raised while executing a legal action.
pub fn perform_player_action(
    ctx: &mut TurnContext,
    map: &mut Map,
    player: ActorId,
    action: Action,
) -> Result<ActionOutcome, SimError> {
    if map.actor(player).is_none() {
        return Err(SimError::UnknownActor(player));
    }
    if let Err(refusal) = check_legality(map, player, action) {
        ctx.messages.push(
            map.local_time.turn,
            refusal.i18n_key(),
            Some(player),
            refusal.to_string(),
        );
        return Ok(ActionOutcome::Refused(refusal));
    }
    execute_action(ctx, map, player, action)?;
    Ok(ActionOutcome::Performed)
}

/// Action chosen by an insane actor in place of its intent: a random legal
/// step, otherwise a blow at a random neighbour, otherwise a shout.
#[must_use]
pub fn random_insane_action(map: &Map, actor: ActorId, dice: &mut dyn Dice) -> Action {
    let Some(me) = map.actor(actor) else {
        return Action::Shout;
    };
    let steps: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|dir| map.is_free(me.position.offset(*dir)))
        .collect();
    if let Some(idx) = dice.pick_index(steps.len()) {
        return Action::Step(steps[idx]);
    }
    let neighbours: Vec<ActorId> = map
        .actors
        .iter()
        .filter(|a| a.id != actor && is_adjacent(a.position, me.position))
        .map(|a| a.id)
        .collect();
    if let Some(idx) = dice.pick_index(neighbours.len())
        && check_legality(map, actor, Action::MeleeAttack(neighbours[idx])).is_ok()
    {
        return Action::MeleeAttack(neighbours[idx]);
    }
    Action::Shout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::config::SimConfig;
    use crate::controller::Controller;
    use crate::items::Item;
    use crate::map::MapKind;
    use crate::models::{ModelCatalog, ModelId};
    use crate::rng::ScriptedDice;
    use crate::scent::OdorKind;
    use crate::world::DistrictPos;
    use std::sync::Arc;

    fn ctx() -> TurnContext {
        TurnContext::new(
            Arc::new(SimConfig::default()),
            Arc::new(ModelCatalog::default_catalog().clone()),
            Box::new(ScriptedDice::new()),
        )
    }

    fn spawn(map: &mut Map, id: u64, model: ModelId, pos: Point) -> ActorId {
        let model = ModelCatalog::default_catalog()
            .require(model)
            .expect("model")
            .clone();
        let actor = Actor::new(ActorId(id), model, pos);
        map.place_actor(actor).expect("placed");
        ActorId(id)
    }

    fn map() -> Map {
        Map::new("t", MapKind::Entry, DistrictPos::new(0, 0), 10, 10)
    }

    #[test]
    fn refused_player_action_spends_nothing() {
        let mut ctx = ctx();
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(2, 2));
        if let Some(p) = map.actor_mut(id) {
            p.controller = Controller::Player;
            p.stamina = 0;
        }
        let outcome = perform_player_action(&mut ctx, &mut map, id, Action::ToggleRunning)
            .expect("no invariant broken");
        assert_eq!(outcome, ActionOutcome::Refused(Refusal::TooTiredToRun));
        assert_eq!(map.actor(id).map(|a| a.action_points), Some(100));
        assert!(ctx.messages.contains_key("log.actor.too-tired-to-run"));
    }

    #[test]
    fn steps_are_blocked_by_actors_and_walls() {
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(2, 2));
        spawn(&mut map, 2, ModelId::Zombie, Point::new(3, 2));
        assert_eq!(
            check_legality(&map, id, Action::Step(Direction::E)),
            Err(Refusal::Blocked)
        );
        assert_eq!(check_legality(&map, id, Action::Step(Direction::W)), Ok(()));
        let corner = spawn(&mut map, 3, ModelId::Rat, Point::new(0, 0));
        assert_eq!(
            check_legality(&map, corner, Action::Step(Direction::N)),
            Err(Refusal::Blocked)
        );
    }

    #[test]
    fn running_step_costs_half_and_tires() {
        let mut ctx = ctx();
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(2, 2));
        execute_action(&mut ctx, &mut map, id, Action::ToggleRunning).expect("toggle");
        execute_action(&mut ctx, &mut map, id, Action::Step(Direction::S)).expect("step");
        let me = map.actor(id).expect("actor");
        assert_eq!(me.position, Point::new(2, 3));
        assert_eq!(me.action_points, 50);
        assert_eq!(me.stamina, me.max_stamina() - STAMINA_COST_RUNNING);
    }

    #[test]
    fn ranged_needs_weapon_ammo_and_range() {
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Soldier, Point::new(0, 0));
        let target = spawn(&mut map, 2, ModelId::Zombie, Point::new(8, 0));
        let shoot = Action::RangedAttack {
            target,
            mode: FireMode::Default,
        };
        assert_eq!(check_legality(&map, id, shoot), Err(Refusal::NoRangedWeapon));
        let me = map.actor_mut(id).expect("actor");
        me.inventory.add(Item::pistol().equip()).expect("room");
        assert_eq!(check_legality(&map, id, shoot), Err(Refusal::TargetOutOfRange));
        map.move_actor(target, Point::new(4, 0)).expect("moved");
        assert_eq!(check_legality(&map, id, shoot), Ok(()));
        spawn(&mut map, 3, ModelId::Rat, Point::new(2, 0));
        assert_eq!(check_legality(&map, id, shoot), Err(Refusal::NoLineOfFire));
    }

    #[test]
    fn throwing_primes_and_drops() {
        let mut ctx = ctx();
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Soldier, Point::new(1, 1));
        map.actor_mut(id)
            .expect("actor")
            .inventory
            .add(Item::grenade())
            .expect("room");
        let throw = Action::ThrowExplosive {
            target: Point::new(4, 1),
        };
        assert_eq!(check_legality(&map, id, throw), Ok(()));
        execute_action(&mut ctx, &mut map, id, throw).expect("thrown");
        let stack = map.ground.get(&Point::new(4, 1)).expect("grenade on ground");
        assert_eq!(stack.items[0].fuse_left(), Some(2));
        assert_eq!(check_legality(&map, id, throw), Err(Refusal::NoExplosive));
    }

    #[test]
    fn spray_marks_the_tile_and_schedules_a_release() {
        let mut ctx = ctx();
        let mut map = map();
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(5, 5));
        assert_eq!(check_legality(&map, id, Action::UseSpray), Err(Refusal::NoSpray));
        map.actor_mut(id)
            .expect("actor")
            .inventory
            .add(Item::stench_killer().equip())
            .expect("room");
        execute_action(&mut ctx, &mut map, id, Action::UseSpray).expect("sprayed");
        assert!(
            map.scents
                .scent_at(Point::new(5, 5), OdorKind::PerfumeLivingSuppressor)
                > 0
        );
        assert_eq!(map.timers.len(), 1);
    }

    #[test]
    fn insane_fallbacks() {
        let mut map = Map::new("t", MapKind::Entry, DistrictPos::new(0, 0), 1, 2);
        let id = spawn(&mut map, 1, ModelId::Civilian, Point::new(0, 0));
        let mut dice = ScriptedDice::new().with_rolls([0]);
        assert_eq!(
            random_insane_action(&map, id, &mut dice),
            Action::Step(Direction::S)
        );
        let other = spawn(&mut map, 2, ModelId::Civilian, Point::new(0, 1));
        let mut dice = ScriptedDice::new().with_rolls([0]);
        assert_eq!(
            random_insane_action(&map, id, &mut dice),
            Action::MeleeAttack(other)
        );
        map.actor_mut(id).expect("actor").stamina = 0;
        let mut dice = ScriptedDice::new().with_rolls([0]);
        assert_eq!(random_insane_action(&map, id, &mut dice), Action::Shout);
    }
}
