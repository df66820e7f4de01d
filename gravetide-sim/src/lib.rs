//! Gravetide Simulation Engine
//!
//! Turn scheduling and world maintenance for a persistent, multi-map zombie
//! survival world. This crate decides who acts next, runs the end-of-turn
//! housekeeping, rolls world events, resolves combat and keeps off-screen
//! districts in step with the player's clock. It has no UI and no I/O.

pub mod action;
pub mod actor;
pub mod catchup;
pub mod clock;
pub mod combat;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod economy;
pub mod error;
pub mod events;
pub mod geometry;
pub mod infection;
pub mod items;
pub mod maintenance;
pub mod map;
pub mod messages;
pub mod models;
pub mod numbers;
pub mod progression;
pub mod rng;
pub mod scent;
pub mod scheduler;
pub mod simulation;
pub mod weather;
pub mod world;

// Re-export commonly used types
pub use action::{
    Action, ActionOutcome, FireMode, check_legality, execute_action, perform_player_action,
};
pub use actor::{Actor, ActorId};
pub use catchup::{
    BackgroundSimulator, BackgroundStats, CatchupReport, PassReport, catch_up_district,
    force_district_time, simulate_nearby_districts,
};
pub use clock::{DayPhase, WorldTime};
pub use combat::{
    BlastReport, KillReport, MeleeOutcome, ShotOutcome, do_blast, do_melee_attack,
    do_ranged_attack, do_single_ranged_attack, kill_actor,
};
pub use config::{
    BackgroundConfig, CatchupFidelity, CorpseTuning, EventRule, EventRules, EventTiming, GameMode,
    NpcUpgrades, PopulationCaps, SimConfig, UndeadUpgradeCadence,
};
pub use context::{ActorIdSource, ControllerFactory, InertControllers, SpawnRole, TurnContext};
pub use controller::{ActorBrain, ActorView, Controller, Orderable};
pub use error::{ConfigError, Refusal, SimError};
pub use events::{EventReport, RaidType, WorldEvent, check_district_events};
pub use geometry::{Direction, Point};
pub use infection::{InfectionLevel, infection_level};
pub use items::{Inventory, Item, ItemKind};
pub use maintenance::{Detail, TurnReport, end_turn};
pub use map::{Corpse, Map, MapKind, MapObject, Tile};
pub use messages::{Message, MessageLog};
pub use models::{ActorModel, Faction, ModelCatalog, ModelId};
pub use progression::{Skill, SkillSet};
pub use rng::{Dice, DiceRoller, ScriptedDice, StreamId};
pub use scent::{OdorKind, ScentField};
pub use scheduler::{DistrictAdvance, MapAdvance, SimFlags, advance_district, advance_map, next_actor_to_act};
pub use simulation::{PlayAdvance, PlayTurn, Simulation};
pub use weather::Weather;
pub use world::{District, DistrictPos, World};
