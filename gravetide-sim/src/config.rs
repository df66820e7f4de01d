//! Session configuration for the simulation.
//!
//! Everything an operator may tune between sessions lives here. Every field
//! has a serde default, so a partial JSON document overlays the defaults.
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rule set the session was started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Corpses rise over time; victims of zombifying undead turn at once.
    #[default]
    Standard,
    /// Corpses rise over time and undead bites infect instead of turning.
    CorpsesInfection,
    /// No corpses, no infection, no undead evolution.
    Vintage,
}

impl GameMode {
    #[must_use]
    pub const fn has_corpses(self) -> bool {
        !matches!(self, Self::Vintage)
    }

    #[must_use]
    pub const fn has_infection(self) -> bool {
        matches!(self, Self::CorpsesInfection)
    }

    #[must_use]
    pub const fn zombifies_immediately(self) -> bool {
        !matches!(self, Self::CorpsesInfection)
    }

    #[must_use]
    pub const fn allows_evolution(self) -> bool {
        !matches!(self, Self::Vintage)
    }
}

/// When during the day an event check is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTiming {
    Midnight,
    Midday,
    Hourly,
    EveryTurn,
}

/// Gate for a single world event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRule {
    pub timing: EventTiming,
    #[serde(default)]
    pub min_day: i32,
    #[serde(default)]
    pub max_day: Option<i32>,
    pub chance_permil: i32,
    #[serde(default = "EventRule::default_group_size")]
    pub group_size: u32,
}

impl EventRule {
    const fn default_group_size() -> u32 {
        1
    }

    #[must_use]
    pub const fn new(timing: EventTiming, min_day: i32, chance_permil: i32, group_size: u32) -> Self {
        Self {
            timing,
            min_day,
            max_day: None,
            chance_permil,
            group_size,
        }
    }

    #[must_use]
    pub const fn until_day(mut self, max_day: i32) -> Self {
        self.max_day = Some(max_day);
        self
    }

    /// Whether `day` falls inside this rule's window.
    #[must_use]
    pub const fn day_in_window(&self, day: i32) -> bool {
        if day < self.min_day {
            return false;
        }
        match self.max_day {
            Some(max) => day <= max,
            None => true,
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !(0..=1000).contains(&self.chance_permil) {
            return Err(ConfigError::RangeViolation {
                field,
                min: 0,
                max: 1000,
                value: i64::from(self.chance_permil),
            });
        }
        if self.min_day < 0 {
            return Err(ConfigError::MinViolation {
                field,
                min: 0,
                value: i64::from(self.min_day),
            });
        }
        if let Some(max) = self.max_day
            && max < self.min_day
        {
            return Err(ConfigError::DayWindow {
                field,
                min: self.min_day,
                max,
            });
        }
        if self.group_size == 0 {
            return Err(ConfigError::MinViolation {
                field,
                min: 1,
                value: 0,
            });
        }
        Ok(())
    }
}

/// Per-event gates for the player's district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRules {
    #[serde(default = "EventRules::default_zombie_invasion")]
    pub zombie_invasion: EventRule,
    #[serde(default = "EventRules::default_refugees")]
    pub refugees: EventRule,
    #[serde(default = "EventRules::default_national_guard")]
    pub national_guard: EventRule,
    #[serde(default = "EventRules::default_army_supplies")]
    pub army_supplies: EventRule,
    #[serde(default = "EventRules::default_bikers")]
    pub bikers: EventRule,
    #[serde(default = "EventRules::default_gangstas")]
    pub gangstas: EventRule,
    #[serde(default = "EventRules::default_blackops")]
    pub blackops: EventRule,
    #[serde(default = "EventRules::default_survivors")]
    pub survivors: EventRule,
    #[serde(default = "EventRules::default_sewers_invasion")]
    pub sewers_invasion: EventRule,
}

impl EventRules {
    const fn default_zombie_invasion() -> EventRule {
        EventRule::new(EventTiming::Hourly, 0, 300, 5)
    }

    const fn default_refugees() -> EventRule {
        EventRule::new(EventTiming::Midday, 1, 200, 5)
    }

    const fn default_national_guard() -> EventRule {
        EventRule::new(EventTiming::Midnight, 3, 500, 4)
    }

    const fn default_army_supplies() -> EventRule {
        EventRule::new(EventTiming::Midday, 4, 300, 6)
    }

    const fn default_bikers() -> EventRule {
        EventRule::new(EventTiming::Midnight, 2, 300, 4).until_day(14)
    }

    const fn default_gangstas() -> EventRule {
        EventRule::new(EventTiming::Midnight, 7, 300, 4).until_day(21)
    }

    const fn default_blackops() -> EventRule {
        EventRule::new(EventTiming::Midnight, 14, 200, 3)
    }

    const fn default_survivors() -> EventRule {
        EventRule::new(EventTiming::Midnight, 21, 300, 5)
    }

    const fn default_sewers_invasion() -> EventRule {
        EventRule::new(EventTiming::Hourly, 0, 100, 3)
    }

    /// Every gate kept but with a zero chance, for quiet test worlds.
    #[must_use]
    pub fn disabled() -> Self {
        let mut rules = Self::default();
        for rule in [
            &mut rules.zombie_invasion,
            &mut rules.refugees,
            &mut rules.national_guard,
            &mut rules.army_supplies,
            &mut rules.bikers,
            &mut rules.gangstas,
            &mut rules.blackops,
            &mut rules.survivors,
            &mut rules.sewers_invasion,
        ] {
            rule.chance_permil = 0;
        }
        rules
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.zombie_invasion.validate("events.zombie_invasion")?;
        self.refugees.validate("events.refugees")?;
        self.national_guard.validate("events.national_guard")?;
        self.army_supplies.validate("events.army_supplies")?;
        self.bikers.validate("events.bikers")?;
        self.gangstas.validate("events.gangstas")?;
        self.blackops.validate("events.blackops")?;
        self.survivors.validate("events.survivors")?;
        self.sewers_invasion.validate("events.sewers_invasion")?;
        Ok(())
    }
}

impl Default for EventRules {
    fn default() -> Self {
        Self {
            zombie_invasion: Self::default_zombie_invasion(),
            refugees: Self::default_refugees(),
            national_guard: Self::default_national_guard(),
            army_supplies: Self::default_army_supplies(),
            bikers: Self::default_bikers(),
            gangstas: Self::default_gangstas(),
            blackops: Self::default_blackops(),
            survivors: Self::default_survivors(),
            sewers_invasion: Self::default_sewers_invasion(),
        }
    }
}

/// Population caps checked before spawning event groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationCaps {
    #[serde(default = "PopulationCaps::default_max_undeads")]
    pub max_undeads: usize,
    #[serde(default = "PopulationCaps::default_max_living")]
    pub max_living: usize,
}

impl PopulationCaps {
    const fn default_max_undeads() -> usize {
        100
    }

    const fn default_max_living() -> usize {
        50
    }
}

impl Default for PopulationCaps {
    fn default() -> Self {
        Self {
            max_undeads: Self::default_max_undeads(),
            max_living: Self::default_max_living(),
        }
    }
}

/// Corpse rise and rot tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpseTuning {
    /// Per-mille rise chance per turn once the delay has passed.
    #[serde(default = "CorpseTuning::default_rise_chance_permil")]
    pub rise_chance_permil: i32,
    /// Turns after death before a corpse may rise.
    #[serde(default = "CorpseTuning::default_rise_delay_turns")]
    pub rise_delay_turns: i32,
    #[serde(default = "CorpseTuning::default_day_factor_pct")]
    pub day_factor_pct: i32,
    #[serde(default = "CorpseTuning::default_night_factor_pct")]
    pub night_factor_pct: i32,
    #[serde(default = "CorpseTuning::default_decay_per_turn")]
    pub decay_per_turn: i32,
}

impl CorpseTuning {
    const fn default_rise_chance_permil() -> i32 {
        5
    }

    const fn default_rise_delay_turns() -> i32 {
        crate::constants::TURNS_PER_HOUR
    }

    const fn default_day_factor_pct() -> i32 {
        50
    }

    const fn default_night_factor_pct() -> i32 {
        200
    }

    const fn default_decay_per_turn() -> i32 {
        1
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=1000).contains(&self.rise_chance_permil) {
            return Err(ConfigError::RangeViolation {
                field: "corpses.rise_chance_permil",
                min: 0,
                max: 1000,
                value: i64::from(self.rise_chance_permil),
            });
        }
        if self.decay_per_turn < 1 {
            return Err(ConfigError::MinViolation {
                field: "corpses.decay_per_turn",
                min: 1,
                value: i64::from(self.decay_per_turn),
            });
        }
        if self.rise_delay_turns < 0 {
            return Err(ConfigError::MinViolation {
                field: "corpses.rise_delay_turns",
                min: 0,
                value: i64::from(self.rise_delay_turns),
            });
        }
        Ok(())
    }
}

impl Default for CorpseTuning {
    fn default() -> Self {
        Self {
            rise_chance_permil: Self::default_rise_chance_permil(),
            rise_delay_turns: Self::default_rise_delay_turns(),
            day_factor_pct: Self::default_day_factor_pct(),
            night_factor_pct: Self::default_night_factor_pct(),
            decay_per_turn: Self::default_decay_per_turn(),
        }
    }
}

/// How often undead NPCs gain a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UndeadUpgradeCadence {
    Never,
    #[default]
    EveryNight,
    EveryDays(u32),
}

impl UndeadUpgradeCadence {
    /// Whether the dusk of `day` is an upgrade dusk.
    #[must_use]
    pub fn fires_on_day(self, day: i32) -> bool {
        match self {
            Self::Never | Self::EveryDays(0) => false,
            Self::EveryNight => true,
            Self::EveryDays(n) => day > 0 && i64::from(day) % i64::from(n) == 0,
        }
    }
}

/// NPC skill progression switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcUpgrades {
    #[serde(default = "NpcUpgrades::default_enabled")]
    pub living: bool,
    #[serde(default = "NpcUpgrades::default_enabled")]
    pub undead: bool,
    #[serde(default)]
    pub undead_cadence: UndeadUpgradeCadence,
}

impl NpcUpgrades {
    const fn default_enabled() -> bool {
        true
    }
}

impl Default for NpcUpgrades {
    fn default() -> Self {
        Self {
            living: true,
            undead: true,
            undead_cadence: UndeadUpgradeCadence::default(),
        }
    }
}

/// Ratio of full-detail turns during catch-up: `full_turns` of every `cycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchupFidelity {
    pub full_turns: u32,
    pub cycle: u32,
}

impl CatchupFidelity {
    /// Whether the `index`-th catch-up turn runs at full detail.
    #[must_use]
    pub const fn is_full_turn(self, index: u32) -> bool {
        if self.cycle == 0 {
            return true;
        }
        index % self.cycle < self.full_turns
    }

    fn validate(self) -> Result<(), ConfigError> {
        if self.cycle == 0 || self.full_turns > self.cycle {
            return Err(ConfigError::CatchupFidelity {
                full_turns: self.full_turns,
                cycle: self.cycle,
            });
        }
        Ok(())
    }
}

impl Default for CatchupFidelity {
    fn default() -> Self {
        Self {
            full_turns: 2,
            cycle: 3,
        }
    }
}

/// Background simulation switches and pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Only advance neighbours while the player sleeps.
    #[serde(default)]
    pub simulate_when_sleeping: bool,
    /// Pause between background passes.
    #[serde(default = "BackgroundConfig::default_pause_ms")]
    pub pause_ms: u64,
}

impl BackgroundConfig {
    const fn default_pause_ms() -> u64 {
        10
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            simulate_when_sleeping: false,
            pause_ms: Self::default_pause_ms(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default)]
    pub population: PopulationCaps,
    #[serde(default)]
    pub events: EventRules,
    #[serde(default = "SimConfig::default_min_spawn_distance")]
    pub min_spawn_distance_to_player: i32,
    #[serde(default)]
    pub corpses: CorpseTuning,
    #[serde(default = "SimConfig::default_infection_growth")]
    pub infection_growth_per_turn: i32,
    #[serde(default = "SimConfig::default_insane_action_chance")]
    pub insane_action_chance: i32,
    #[serde(default = "SimConfig::default_weather_change_chance")]
    pub weather_change_chance: i32,
    #[serde(default)]
    pub npc_upgrades: NpcUpgrades,
    #[serde(default = "SimConfig::default_undead_evolution")]
    pub undead_evolution: bool,
    #[serde(default = "SimConfig::default_undead_evolution_day")]
    pub undead_evolution_day: i32,
    #[serde(default)]
    pub catchup: CatchupFidelity,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default = "SimConfig::default_message_capacity")]
    pub message_capacity: usize,
}

impl SimConfig {
    const fn default_min_spawn_distance() -> i32 {
        10
    }

    const fn default_infection_growth() -> i32 {
        1
    }

    const fn default_insane_action_chance() -> i32 {
        5
    }

    const fn default_weather_change_chance() -> i32 {
        10
    }

    const fn default_undead_evolution() -> bool {
        true
    }

    const fn default_undead_evolution_day() -> i32 {
        1
    }

    const fn default_message_capacity() -> usize {
        256
    }

    /// Parse a JSON document over the defaults and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and the matching
    /// violation when a field is out of bounds.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.events.validate()?;
        self.corpses.validate()?;
        self.catchup.validate()?;
        Self::validate_percent("insane_action_chance", self.insane_action_chance)?;
        Self::validate_percent("weather_change_chance", self.weather_change_chance)?;
        if self.min_spawn_distance_to_player < 0 {
            return Err(ConfigError::MinViolation {
                field: "min_spawn_distance_to_player",
                min: 0,
                value: i64::from(self.min_spawn_distance_to_player),
            });
        }
        if self.infection_growth_per_turn < 0 {
            return Err(ConfigError::MinViolation {
                field: "infection_growth_per_turn",
                min: 0,
                value: i64::from(self.infection_growth_per_turn),
            });
        }
        if self.message_capacity == 0 {
            return Err(ConfigError::MinViolation {
                field: "message_capacity",
                min: 1,
                value: 0,
            });
        }
        Ok(())
    }

    fn validate_percent(field: &'static str, value: i32) -> Result<(), ConfigError> {
        if !(0..=100).contains(&value) {
            return Err(ConfigError::RangeViolation {
                field,
                min: 0,
                max: 100,
                value: i64::from(value),
            });
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            population: PopulationCaps::default(),
            events: EventRules::default(),
            min_spawn_distance_to_player: Self::default_min_spawn_distance(),
            corpses: CorpseTuning::default(),
            infection_growth_per_turn: Self::default_infection_growth(),
            insane_action_chance: Self::default_insane_action_chance(),
            weather_change_chance: Self::default_weather_change_chance(),
            npc_upgrades: NpcUpgrades::default(),
            undead_evolution: Self::default_undead_evolution(),
            undead_evolution_day: Self::default_undead_evolution_day(),
            catchup: CatchupFidelity::default(),
            background: BackgroundConfig::default(),
            message_capacity: Self::default_message_capacity(),
        }
    }
}
