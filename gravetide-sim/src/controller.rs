//! Who decides an actor's actions.
//!
//! The scheduler only needs [`ActorBrain::get_action`]. Raid notifications
//! reach brains that opt into the [`Orderable`] capability.
use std::fmt;

use crate::action::Action;
use crate::actor::Actor;
use crate::events::RaidType;
use crate::geometry::Point;
use crate::map::Map;
use crate::rng::Dice;

/// Read-only view handed to a brain when it is asked to act.
#[derive(Clone, Copy)]
pub struct ActorView<'a> {
    pub map: &'a Map,
    pub actor: &'a Actor,
    pub turn: i32,
}

/// Decision-making for AI actors.
pub trait ActorBrain: Send {
    /// Short label for logs and debug output.
    fn name(&self) -> &'static str;

    /// Pick the next action, or `None` if the brain has nothing to propose.
    fn get_action(&mut self, view: &ActorView<'_>, dice: &mut dyn Dice) -> Option<Action>;

    /// Raid-notification capability, absent by default.
    fn as_orderable(&mut self) -> Option<&mut dyn Orderable> {
        None
    }
}

/// Capability of brains that react to world events.
pub trait Orderable {
    fn on_raid(&mut self, raid: RaidType, location: Point, turn: i32);
}

#[derive(Default)]
pub enum Controller {
    /// Inanimate or static actor: charged a base cost with no decision.
    #[default]
    None,
    Player,
    Ai(Box<dyn ActorBrain>),
}

impl Controller {
    #[must_use]
    pub fn ai(brain: impl ActorBrain + 'static) -> Self {
        Self::Ai(Box::new(brain))
    }

    #[must_use]
    pub const fn is_ai(&self) -> bool {
        matches!(self, Self::Ai(_))
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Player => f.write_str("Player"),
            Self::Ai(brain) => f.debug_tuple("Ai").field(&brain.name()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl ActorBrain for Idle {
        fn name(&self) -> &'static str {
            "idle"
        }

        fn get_action(&mut self, _view: &ActorView<'_>, _dice: &mut dyn Dice) -> Option<Action> {
            Some(Action::Wait)
        }
    }

    #[test]
    fn debug_names_the_brain() {
        assert_eq!(format!("{:?}", Controller::ai(Idle)), "Ai(\"idle\")");
        assert_eq!(format!("{:?}", Controller::default()), "None");
        assert!(Controller::ai(Idle).is_ai());
    }

    #[test]
    fn brains_are_not_orderable_by_default() {
        let mut brain = Idle;
        assert!(brain.as_orderable().is_none());
    }
}
