//! Picks who acts next on a map and drives one local turn to completion.
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::action::{check_legality, execute_action, random_insane_action};
use crate::actor::ActorId;
use crate::constants::{BASE_ACTION_COST, LOG_INSANE_ACTION};
use crate::context::TurnContext;
use crate::controller::{ActorView, Controller};
use crate::economy::spend_action_points;
use crate::error::SimError;
use crate::maintenance::{Detail, TurnReport, end_turn};
use crate::map::Map;
use crate::world::District;

/// How a map is being advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimFlags {
    /// Advanced off-screen rather than by the foreground play loop.
    pub simulating: bool,
    pub detail: Detail,
}

impl SimFlags {
    /// Foreground play: full detail, the player decides.
    pub const NOT_SIMULATING: Self = Self {
        simulating: false,
        detail: Detail::Full,
    };

    #[must_use]
    pub const fn simulated(detail: Detail) -> Self {
        Self {
            simulating: true,
            detail,
        }
    }
}

impl Default for SimFlags {
    fn default() -> Self {
        Self::NOT_SIMULATING
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapAdvance {
    /// The player may act; call again once its action has been performed.
    AwaitingPlayer(ActorId),
    TurnEnded(TurnReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistrictAdvance {
    AwaitingPlayer(ActorId),
    /// Reports of the maps that closed a turn.
    Advanced(Vec<TurnReport>),
}

/// The next actor allowed to act this local turn: at or after the scan
/// index, awake, with at least a base action's worth of AP.
#[must_use]
pub fn next_actor_to_act(map: &Map) -> Option<ActorId> {
    map.actors
        .iter()
        .skip(map.check_next_actor_index)
        .find(|a| !a.is_sleeping && a.action_points >= BASE_ACTION_COST)
        .map(|a| a.id)
}

/// Let actors act until none can, then close the turn. Returns early when
/// the player is up during foreground play.
///
/// Low-detail turns skip the actors entirely and only run the maintenance
/// tail.
///
/// # Errors
///
/// Returns `SimError::IllegalAiAction` or `SimError::NoAiAction` for a
/// misbehaving brain, and propagates invariant violations from actions and
/// maintenance.
pub fn advance_map(ctx: &mut TurnContext, map: &mut Map, flags: SimFlags) -> Result<MapAdvance, SimError> {
    if flags.detail == Detail::Low {
        return end_turn(ctx, map, Detail::Low).map(MapAdvance::TurnEnded);
    }
    while let Some(id) = next_actor_to_act(map) {
        if let Some(idx) = map.actor_index(id) {
            map.check_next_actor_index = idx;
        }
        let is_player = map.actor(id).is_some_and(|a| a.is_player());
        if is_player && !flags.simulating {
            return Ok(MapAdvance::AwaitingPlayer(id));
        }
        act_once(ctx, map, id)?;
    }
    end_turn(ctx, map, Detail::Full).map(MapAdvance::TurnEnded)
}

/// One decision for a non-player actor. Anything that leaves the actor's AP
/// untouched is charged a base action.
fn act_once(ctx: &mut TurnContext, map: &mut Map, id: ActorId) -> Result<(), SimError> {
    let actor = map.actor_mut(id).ok_or(SimError::UnknownActor(id))?;
    let ap_before = actor.action_points;
    let mut controller = std::mem::take(&mut actor.controller);

    let decision = match &mut controller {
        Controller::None | Controller::Player => Ok(None),
        Controller::Ai(brain) => match map.actor(id) {
            Some(me) => {
                let view = ActorView {
                    map,
                    actor: me,
                    turn: map.local_time.turn,
                };
                brain
                    .get_action(&view, &mut *ctx.dice)
                    .map(Some)
                    .ok_or(SimError::NoAiAction(id))
            }
            None => Err(SimError::UnknownActor(id)),
        },
    };
    if let Some(actor) = map.actor_mut(id) {
        actor.controller = controller;
    }
    let decision = decision?;

    if let Some(mut action) = decision {
        let insane = map.actor(id).is_some_and(|a| a.is_insane());
        if insane && ctx.dice.roll_chance(ctx.config.insane_action_chance) {
            action = random_insane_action(map, id, &mut *ctx.dice);
            ctx.messages
                .push(map.local_time.turn, LOG_INSANE_ACTION, Some(id), format!("{action:?}"));
        }
        check_legality(map, id, action).map_err(|reason| {
            warn!("actor {id} proposed illegal {action:?}: {reason}");
            SimError::IllegalAiAction {
                actor: id,
                action: format!("{action:?}"),
                reason,
            }
        })?;
        execute_action(ctx, map, id, action)?;
    }

    if let Some(actor) = map.actor_mut(id)
        && actor.action_points >= ap_before
    {
        spend_action_points(actor, BASE_ACTION_COST);
    }
    Ok(())
}

/// Advance every map of the district that sits at the district's earliest
/// local turn by one turn.
///
/// # Errors
///
/// Same as [`advance_map`].
pub fn advance_district(
    ctx: &mut TurnContext,
    district: &mut District,
    flags: SimFlags,
) -> Result<DistrictAdvance, SimError> {
    let target = district.min_local_turn() + 1;
    let mut reports = Vec::new();
    for map in district.maps_mut() {
        while map.local_time.turn < target {
            match advance_map(ctx, map, flags)? {
                MapAdvance::AwaitingPlayer(id) => return Ok(DistrictAdvance::AwaitingPlayer(id)),
                MapAdvance::TurnEnded(report) => reports.push(report),
            }
        }
    }
    debug!(
        "district ({}, {}) advanced to turn {target}",
        district.pos.x, district.pos.y
    );
    Ok(DistrictAdvance::Advanced(reports))
}
