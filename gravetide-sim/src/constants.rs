//! Centralized balance and tuning constants for the Gravetide engine.
//!
//! These values define the deterministic math for the core simulation.
//! Anything a server operator is expected to tune lives in `SimConfig`
//! instead; what stays here only changes through reviewed code.

// Logging keys -------------------------------------------------------------
pub const LOG_TOO_TIRED_TO_RUN: &str = "log.actor.too-tired-to-run";
pub const LOG_ACTION_REFUSED: &str = "log.action.refused";
pub const LOG_SHOUT: &str = "log.actor.shout";
pub const LOG_INSANE_ACTION: &str = "log.actor.insane";
pub const LOG_FALL_ASLEEP: &str = "log.actor.sleep.start";
pub const LOG_WAKE_UP: &str = "log.actor.sleep.wake";
pub const LOG_NIGHTMARE: &str = "log.actor.sleep.nightmare";
pub const LOG_EXHAUSTION_COLLAPSE: &str = "log.actor.sleep.collapse";
pub const LOG_BOND_REASSURE: &str = "log.actor.bond.reassure";
pub const LOG_BOND_GRIEF: &str = "log.actor.bond.grief";
pub const LOG_BATTERY_DEAD: &str = "log.item.battery-dead";
pub const LOG_SPRAY: &str = "log.item.spray";
pub const LOG_THROW: &str = "log.item.throw";
pub const LOG_MELEE_HIT: &str = "log.combat.melee.hit";
pub const LOG_MELEE_MISS: &str = "log.combat.melee.miss";
pub const LOG_WEAPON_BROKE: &str = "log.combat.weapon-broke";
pub const LOG_SHOT_HIT: &str = "log.combat.shot.hit";
pub const LOG_SHOT_MISS: &str = "log.combat.shot.miss";
pub const LOG_SHOT_JAMMED: &str = "log.combat.shot.jammed";
pub const LOG_SHOT_INTERCEPTED: &str = "log.combat.shot.intercepted";
pub const LOG_EXPLOSION: &str = "log.combat.explosion";
pub const LOG_OBJECT_DESTROYED: &str = "log.map.object-destroyed";
pub const LOG_FIRE_OUT: &str = "log.map.fire-out";
pub const LOG_ACTOR_KILLED: &str = "log.actor.killed";
pub const LOG_UNDEAD_EVOLVED: &str = "log.actor.evolved";
pub const LOG_SKILL_UPGRADE: &str = "log.actor.skill-upgrade";
pub const LOG_INFECTION_EFFECT: &str = "log.infection.effect";
pub const LOG_INFECTION_TURNED: &str = "log.infection.turned";
pub const LOG_CORPSE_RISE: &str = "log.corpse.rise";
pub const LOG_CORPSE_ROT: &str = "log.corpse.rot";
pub const LOG_PLAYER_ZOMBIFIED: &str = "log.player.zombified";
pub const LOG_EVENT_FIRED: &str = "log.event.fired";
pub const LOG_WEATHER_CHANGE: &str = "log.weather.change";

// Time ---------------------------------------------------------------------
pub const TURNS_PER_HOUR: i32 = 30;
pub const HOURS_PER_DAY: i32 = 24;
pub const TURNS_PER_DAY: i32 = TURNS_PER_HOUR * HOURS_PER_DAY;

// Action economy -----------------------------------------------------------
pub const BASE_ACTION_COST: i32 = 100;
pub const RUN_MOVE_COST: i32 = BASE_ACTION_COST / 2;
/// AP kept past one turn of regen, so slow actors can bank a full action.
pub const AP_CARRY_OVER_CAP: i32 = BASE_ACTION_COST;
/// Stamina value for models that never tire.
pub const STAMINA_INFINITE: i32 = 99;
pub const STAMINA_REGEN_PER_TURN: i32 = 2;
pub const STAMINA_MIN_FOR_ACTIVITY: i32 = 10;
pub const STAMINA_COST_RUNNING: i32 = 4;
pub const STAMINA_COST_MELEE_ATTACK: i32 = 8;

// Food ---------------------------------------------------------------------
pub const FOOD_HUNGRY_LEVEL: i32 = TURNS_PER_DAY;
pub const ROT_HUNGRY_LEVEL: i32 = 2 * TURNS_PER_DAY;
pub const STARVING_DEATH_CHANCE: i32 = 5;
pub const ROT_STARVING_HP_CHANCE: i32 = 5;
pub const VOMIT_FOOD_LOSS: i32 = 2 * TURNS_PER_HOUR;

// Sleep --------------------------------------------------------------------
pub const SLEEP_SLEEPY_LEVEL: i32 = 30 * TURNS_PER_HOUR;
pub const SLEEP_EXHAUSTION_LEVEL: i32 = 10 * TURNS_PER_HOUR;
pub const SLEEP_REGEN_PER_TURN: i32 = 4;
pub const SLEEP_HEAL_CHANCE: i32 = 5;
pub const SLEEP_EXHAUSTION_COLLAPSE_CHANCE: i32 = 5;

// Sanity -------------------------------------------------------------------
pub const SANITY_DISTURBED_LEVEL: i32 = 3 * TURNS_PER_DAY;
pub const SANITY_NIGHTMARE_CHANCE: i32 = 2;
pub const SANITY_NIGHTMARE_LOSS: i32 = 2 * TURNS_PER_HOUR;
pub const SANITY_BOND_RECOVER_CHANCE: i32 = 5;
pub const SANITY_BOND_RECOVER: i32 = TURNS_PER_HOUR;
pub const SANITY_HIT_BOND_DEATH: i32 = 8 * TURNS_PER_HOUR;

// Trust --------------------------------------------------------------------
pub const TRUST_MAX: i32 = 2 * TURNS_PER_DAY;
pub const TRUST_BOND_THRESHOLD: i32 = TURNS_PER_DAY;
pub const TRUST_PER_TURN: i32 = 1;
pub const TRUST_NEW_FOLLOWER: i32 = 0;

// Combat -------------------------------------------------------------------
pub const MELEE_WEAPON_BREAK_CHANCE: i32 = 1;
pub const MELEE_WEAPON_FRAGILE_BREAK_CHANCE: i32 = 3;
pub const RAPID_FIRE_FIRST_SHOT_ACCURACY: i32 = 50;
pub const RAPID_FIRE_SECOND_SHOT_ACCURACY: i32 = 30;
pub const FIRE_DISTANCE_PENALTY: i32 = 5;
pub const THROW_RANGE: i32 = 5;
pub const ITEM_DROP_ON_DEATH_CHANCE: i32 = 50;
pub const BLOOD_DECORATION_TURNS: i32 = TURNS_PER_DAY;
pub const SCORCH_DECORATION_TURNS: i32 = 2 * TURNS_PER_DAY;

// Corpses ------------------------------------------------------------------
/// Corpse condition points per hit point of the dead actor.
pub const CORPSE_CONDITION_PER_HP: i32 = 100;

// Skills -------------------------------------------------------------------
pub const SKILL_MAX_LEVEL: u8 = 5;
pub const SKILL_AGILE_ATK_BONUS: i32 = 2;
pub const SKILL_AGILE_DEF_BONUS: i32 = 2;
pub const SKILL_STRONG_DMG_BONUS: i32 = 2;
pub const SKILL_TOUGHNESS_HP_BONUS: i32 = 3;
pub const SKILL_FIREARMS_ATK_BONUS: i32 = 5;
pub const SKILL_AWAKE_SLEEP_REGEN_BONUS: i32 = 1;
pub const SKILL_HARDY_HEAL_CHANCE_BONUS: i32 = 2;

// Scents -------------------------------------------------------------------
pub const SCENT_BASE_DECAY: i32 = 1;
pub const SCENT_SEWERS_EXTRA_DECAY: i32 = 2;

// Infection ----------------------------------------------------------------
pub const INFECTION_LEVEL_1_WEAK: i32 = 10;
pub const INFECTION_LEVEL_2_TIRED: i32 = 30;
pub const INFECTION_LEVEL_3_VOMIT: i32 = 50;
pub const INFECTION_LEVEL_4_BLEED: i32 = 75;
pub const INFECTION_LEVEL_5_DEATH: i32 = 100;
pub const INFECTION_EFFECT_TRIGGER_CHANCE_1000: i32 = 2;
pub const INFECTION_WEAK_STAMINA_LOSS: i32 = 10;
pub const INFECTION_TIRED_STAMINA_LOSS: i32 = 20;
pub const INFECTION_TIRED_SLEEP_LOSS: i32 = 2 * TURNS_PER_HOUR;
pub const INFECTION_VOMIT_STAMINA_LOSS: i32 = 30;
pub const INFECTION_BLEED_HP_LOSS: i32 = 1;

// Map objects --------------------------------------------------------------
pub const BLAST_IGNITE_CHANCE_CAP: i32 = 50;
