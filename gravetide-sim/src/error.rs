//! Error taxonomy for the engine.
//!
//! [`SimError`] covers invariant violations: they abort the current
//! turn-processing call and propagate with `?`. [`Refusal`] covers gameplay
//! refusals of player actions: they are reported to the player as a message
//! and never propagate past the action attempt.
use thiserror::Error;

use crate::actor::ActorId;
use crate::geometry::Point;
use crate::world::DistrictPos;

/// Fatal invariant violations.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("AI of actor {actor} proposed an illegal action {action}: {reason}")]
    IllegalAiAction {
        actor: ActorId,
        action: String,
        reason: Refusal,
    },
    #[error("AI of actor {0} returned no action")]
    NoAiAction(ActorId),
    #[error("actor {0} is already dead")]
    AlreadyDead(ActorId),
    #[error("actor {0} is not on this map")]
    UnknownActor(ActorId),
    #[error("no ground inventory at ({}, {})", .0.x, .0.y)]
    MissingGroundInventory(Point),
    #[error("tile ({}, {}) is already occupied", .0.x, .0.y)]
    TileOccupied(Point),
    #[error("position ({}, {}) is outside the map", .0.x, .0.y)]
    OutOfBounds(Point),
    #[error("district ({}, {}) does not exist", .0.x, .0.y)]
    UnknownDistrict(DistrictPos),
    #[error("actor model `{0}` is missing from the catalog")]
    MissingModel(String),
    #[error("no player actor in the world")]
    NoPlayer,
    #[error("background simulation tried to advance the player's district ({}, {})", .0.x, .0.y)]
    PlayerInSimulatedDistrict(DistrictPos),
    #[error("world lock poisoned by a panicking thread")]
    WorldLockPoisoned,
    #[error("background simulation thread panicked")]
    BackgroundPanicked,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Expected refusals of an attempted action. The display text is user-facing.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Refusal {
    #[error("too tired to run")]
    TooTiredToRun,
    #[error("cannot run")]
    CannotRun,
    #[error("the way is blocked")]
    Blocked,
    #[error("no such target")]
    NoTarget,
    #[error("target is not adjacent")]
    TargetNotAdjacent,
    #[error("target is out of range")]
    TargetOutOfRange,
    #[error("no clear line of fire")]
    NoLineOfFire,
    #[error("no ranged weapon equipped")]
    NoRangedWeapon,
    #[error("out of ammo")]
    OutOfAmmo,
    #[error("no explosive to throw")]
    NoExplosive,
    #[error("no spray equipped")]
    NoSpray,
    #[error("the spray is empty")]
    SprayEmpty,
    #[error("already sleeping")]
    AlreadySleeping,
    #[error("not sleepy enough")]
    NotSleepy,
    #[error("cannot sleep")]
    CannotSleep,
    #[error("too tired to attack")]
    TooTiredToAttack,
}

impl Refusal {
    /// Stable message key for the player-facing log.
    #[must_use]
    pub const fn i18n_key(self) -> &'static str {
        match self {
            Self::TooTiredToRun => crate::constants::LOG_TOO_TIRED_TO_RUN,
            _ => crate::constants::LOG_ACTION_REFUSED,
        }
    }
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("configuration could not be parsed: {0}")]
    Parse(String),
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    #[error("{field} day window invalid (min {min} > max {max})")]
    DayWindow {
        field: &'static str,
        min: i32,
        max: i32,
    },
    #[error("catch-up fidelity invalid ({full_turns} full of every {cycle} turns)")]
    CatchupFidelity { full_turns: u32, cycle: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusal_keys_are_stable() {
        assert_eq!(Refusal::TooTiredToRun.i18n_key(), "log.actor.too-tired-to-run");
        assert_eq!(Refusal::Blocked.i18n_key(), "log.action.refused");
        assert_eq!(Refusal::OutOfAmmo.to_string(), "out of ammo");
    }

    #[test]
    fn config_errors_convert_into_sim_errors() {
        let err: SimError = ConfigError::Parse("eof".into()).into();
        assert_eq!(err.to_string(), "configuration could not be parsed: eof");
    }
}
