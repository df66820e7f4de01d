//! Global weather and the effects it has on scents, firearms and fires.
use serde::{Deserialize, Serialize};

use crate::rng::Dice;

/// Weather conditions shared by every map of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Weather {
    #[default]
    Clear,
    Cloudy,
    Rain,
    HeavyRain,
}

impl Weather {
    #[must_use]
    pub const fn is_raining(self) -> bool {
        matches!(self, Self::Rain | Self::HeavyRain)
    }

    /// Extra scent decay on outside tiles.
    #[must_use]
    pub const fn scent_decay_bonus(self) -> i32 {
        match self {
            Self::Clear | Self::Cloudy => 0,
            Self::Rain => 1,
            Self::HeavyRain => 2,
        }
    }

    /// Percent chance that a firearm jams when fired.
    #[must_use]
    pub const fn firearm_jam_chance(self) -> i32 {
        if self.is_raining() { 3 } else { 1 }
    }

    /// Percent chance per turn that a fire on an outside tile goes out.
    #[must_use]
    pub const fn extinguish_chance(self) -> i32 {
        match self {
            Self::Clear | Self::Cloudy => 0,
            Self::Rain => 10,
            Self::HeavyRain => 20,
        }
    }

    /// Get i18n key for weather state name
    #[must_use]
    pub const fn i18n_key(self) -> &'static str {
        match self {
            Self::Clear => "weather.states.Clear",
            Self::Cloudy => "weather.states.Cloudy",
            Self::Rain => "weather.states.Rain",
            Self::HeavyRain => "weather.states.HeavyRain",
        }
    }
}

/// Roll the hourly weather transition. Weather only drifts one step at a time.
pub fn roll_weather_change(current: Weather, change_chance: i32, dice: &mut dyn Dice) -> Weather {
    if !dice.roll_chance(change_chance) {
        return current;
    }
    let worsen = dice.roll_chance(50);
    match (current, worsen) {
        (Weather::Clear, _) => Weather::Cloudy,
        (Weather::Cloudy, true) => Weather::Rain,
        (Weather::Cloudy, false) => Weather::Clear,
        (Weather::Rain, true) => Weather::HeavyRain,
        (Weather::Rain, false) => Weather::Cloudy,
        (Weather::HeavyRain, _) => Weather::Rain,
    }
}
