//! Turn-based clock shared by maps and the world.
use serde::{Deserialize, Serialize};

use crate::constants::{HOURS_PER_DAY, TURNS_PER_DAY, TURNS_PER_HOUR};

const NIGHT_ENDS_HOUR: i32 = 6;
const NIGHT_STARTS_HOUR: i32 = 18;
const MIDDAY_HOUR: i32 = 12;

/// Coarse phase of the day, derived from the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayPhase {
    Midnight,
    DeepNight,
    Sunrise,
    Morning,
    Midday,
    Afternoon,
    Sunset,
    Evening,
}

impl DayPhase {
    #[must_use]
    pub const fn from_hour(hour: i32) -> Self {
        match hour {
            0 => Self::Midnight,
            1..=5 => Self::DeepNight,
            6 => Self::Sunrise,
            7..=11 => Self::Morning,
            12 => Self::Midday,
            13..=17 => Self::Afternoon,
            18 => Self::Sunset,
            _ => Self::Evening,
        }
    }

    /// Get i18n key for the phase name
    #[must_use]
    pub const fn i18n_key(self) -> &'static str {
        match self {
            Self::Midnight => "time.phase.midnight",
            Self::DeepNight => "time.phase.deep-night",
            Self::Sunrise => "time.phase.sunrise",
            Self::Morning => "time.phase.morning",
            Self::Midday => "time.phase.midday",
            Self::Afternoon => "time.phase.afternoon",
            Self::Sunset => "time.phase.sunset",
            Self::Evening => "time.phase.evening",
        }
    }
}

/// A point in game time, counted in turns since the start of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldTime {
    pub turn: i32,
}

impl WorldTime {
    #[must_use]
    pub const fn new(turn: i32) -> Self {
        Self { turn }
    }

    #[must_use]
    pub const fn day(self) -> i32 {
        self.turn / TURNS_PER_DAY
    }

    #[must_use]
    pub const fn hour(self) -> i32 {
        (self.turn / TURNS_PER_HOUR) % HOURS_PER_DAY
    }

    #[must_use]
    pub const fn is_night(self) -> bool {
        let hour = self.hour();
        hour < NIGHT_ENDS_HOUR || hour >= NIGHT_STARTS_HOUR
    }

    #[must_use]
    pub const fn phase(self) -> DayPhase {
        DayPhase::from_hour(self.hour())
    }

    /// True on the first turn of a new day (never on turn 0).
    #[must_use]
    pub const fn is_strike_of_midnight(self) -> bool {
        self.turn > 0 && self.turn % TURNS_PER_DAY == 0
    }

    #[must_use]
    pub const fn is_strike_of_midday(self) -> bool {
        self.turn % TURNS_PER_DAY == MIDDAY_HOUR * TURNS_PER_HOUR
    }

    #[must_use]
    pub const fn is_strike_of_hour(self) -> bool {
        self.turn > 0 && self.turn % TURNS_PER_HOUR == 0
    }

    /// Move forward by one turn.
    pub const fn advance(&mut self) {
        self.turn += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_and_hour_derive_from_turns() {
        let time = WorldTime::new(TURNS_PER_DAY + 7 * TURNS_PER_HOUR + 3);
        assert_eq!(time.day(), 1);
        assert_eq!(time.hour(), 7);
        assert!(!time.is_night());
        assert_eq!(time.phase(), DayPhase::Morning);
    }

    #[test]
    fn night_wraps_midnight() {
        assert!(WorldTime::new(0).is_night());
        assert!(WorldTime::new(5 * TURNS_PER_HOUR).is_night());
        assert!(!WorldTime::new(6 * TURNS_PER_HOUR).is_night());
        assert!(WorldTime::new(18 * TURNS_PER_HOUR).is_night());
    }

    #[test]
    fn strikes_fire_on_boundaries_only() {
        assert!(!WorldTime::new(0).is_strike_of_midnight());
        assert!(WorldTime::new(TURNS_PER_DAY).is_strike_of_midnight());
        assert!(WorldTime::new(12 * TURNS_PER_HOUR).is_strike_of_midday());
        assert!(!WorldTime::new(12 * TURNS_PER_HOUR + 1).is_strike_of_midday());
        assert!(WorldTime::new(TURNS_PER_HOUR).is_strike_of_hour());
        let mut time = WorldTime::new(TURNS_PER_HOUR - 1);
        time.advance();
        assert!(time.is_strike_of_hour());
    }
}
