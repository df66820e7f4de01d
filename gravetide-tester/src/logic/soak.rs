//! Headless soak runs: the player policy drives a [`Simulation`] for a fixed
//! number of turns while invariant sweeps watch every map.
use anyhow::{Context, Result, bail};
use gravetide_sim::scent::OdorScent;
use gravetide_sim::{
    Action, ActionOutcome, Actor, BackgroundConfig, BackgroundStats, CatchupReport, District,
    GameMode, Map, ModelCatalog, PlayAdvance, SimConfig, SimError, Simulation, World,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hasher;
use std::sync::Arc;
use twox_hash::XxHash64;

use super::brains::TesterControllers;
use super::policy::PlayerStrategy;
use super::world_builder::{WorldShape, build_world};

/// Everything needed to reproduce a soak run besides the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoakPlan {
    pub mode: GameMode,
    pub strategy: PlayerStrategy,
    pub turns: u32,
    pub shape: WorldShape,
    /// Run the background simulator alongside play.
    pub background: bool,
    /// Catch every other district up to the world clock at the end.
    pub entry_checks: bool,
    /// Give up each entry catch-up after this many district turns.
    pub abort_entry_after: Option<u32>,
}

impl SoakPlan {
    #[must_use]
    pub fn new(mode: GameMode, strategy: PlayerStrategy) -> Self {
        Self {
            mode,
            strategy,
            turns: 200,
            shape: WorldShape::default(),
            background: false,
            entry_checks: false,
            abort_entry_after: None,
        }
    }

    #[must_use]
    pub const fn with_turns(mut self, turns: u32) -> Self {
        self.turns = turns;
        self
    }

    #[must_use]
    pub const fn with_background(mut self) -> Self {
        self.background = true;
        self
    }

    #[must_use]
    pub const fn with_entry_checks(mut self, abort_after: Option<u32>) -> Self {
        self.entry_checks = true;
        self.abort_entry_after = abort_after;
        self
    }

    /// Only runs without a background thread replay exactly.
    #[must_use]
    pub const fn is_reproducible(&self) -> bool {
        !self.background
    }

    fn config(&self) -> SimConfig {
        SimConfig {
            mode: self.mode,
            background: BackgroundConfig {
                enabled: self.background,
                pause_ms: 1,
                ..BackgroundConfig::default()
            },
            ..SimConfig::default()
        }
    }
}

/// What happened during one soak run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoakSummary {
    pub seed: u64,
    pub turns_played: u32,
    pub world_turn: i32,
    pub player_alive: bool,
    pub player_actions: u32,
    pub refusals: u32,
    /// Raid notices heard by roaming NPCs.
    pub raids_heard: u32,
    pub events_fired: BTreeMap<String, u32>,
    pub detonations: usize,
    pub corpses_risen: usize,
    pub corpses_rotted: usize,
    pub turned: usize,
    pub actors_left: usize,
    pub messages: u64,
    pub background: Option<BackgroundStats>,
    pub catchups: Vec<CatchupReport>,
    /// Invariant violations, empty on a clean run.
    pub violations: Vec<String>,
    pub state_digest: u64,
    /// Digest of every message key in order.
    pub trace_digest: u64,
}

/// Run `plan` for `seed`.
///
/// # Errors
///
/// Fails when the world cannot be built or the engine reports an invariant
/// violation other than the player's death.
pub fn run_soak(plan: &SoakPlan, seed: u64) -> Result<SoakSummary> {
    let controllers = Arc::new(TesterControllers::default());
    let world = build_world(plan.shape, seed, &controllers).context("building the soak world")?;
    let mut sim = Simulation::with_parts(
        world,
        plan.config(),
        ModelCatalog::default_catalog().clone(),
        controllers.clone(),
        seed,
    )
    .context("starting the simulation")?;
    if plan.background {
        sim.start_background();
    }

    let mut policy = plan.strategy.create_policy(seed);
    let mut summary = SoakSummary {
        seed,
        player_alive: true,
        ..SoakSummary::default()
    };
    let mut trace = XxHash64::with_seed(seed);

    while summary.turns_played < plan.turns {
        let advance = match sim.advance_play() {
            Ok(advance) => advance,
            Err(SimError::NoPlayer) => {
                summary.player_alive = false;
                break;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("seed {seed} turn {}", summary.turns_played)
                });
            }
        };
        match advance {
            PlayAdvance::AwaitingPlayer(_) => {
                let action = sim
                    .with_world(|w| {
                        player_map(w).and_then(|map| {
                            map.player().map(|player| policy.pick_action(map, player))
                        })
                    })?
                    .unwrap_or(Action::Wait);
                summary.player_actions += 1;
                if let ActionOutcome::Refused(refusal) = sim.perform_player_action(action)? {
                    log::debug!("player {} refused: {refusal:?}", policy.name());
                    summary.refusals += 1;
                    sim.perform_player_action(Action::Wait)?;
                }
            }
            PlayAdvance::Advanced(turn) => {
                summary.turns_played += 1;
                for report in &turn.turns {
                    summary.detonations += report.detonations;
                    summary.corpses_risen += report.corpses.risen;
                    summary.corpses_rotted += report.corpses.rotted;
                    summary.turned += report.infection.turned;
                }
                if let Some(events) = &turn.events {
                    for event in events.fired() {
                        *summary.events_fired.entry(format!("{event:?}")).or_default() += 1;
                    }
                }
                let violations = sim.with_world(|w| sweep_invariants(w, !plan.background))?;
                for violation in violations {
                    summary
                        .violations
                        .push(format!("turn {}: {violation}", turn.world_turn));
                }
            }
        }
        for message in sim.drain_messages() {
            summary.messages += 1;
            trace.write(message.key.as_bytes());
        }
    }

    summary.background = sim.stop_background()?;
    if plan.entry_checks {
        run_entry_checks(&mut sim, plan, &mut summary)?;
    }

    let (world_turn, actors_left) = sim.with_world(|w| {
        (
            w.time.turn,
            w.districts
                .iter()
                .flat_map(District::maps)
                .map(|m| m.actors.len())
                .sum::<usize>(),
        )
    })?;
    summary.world_turn = world_turn;
    summary.actors_left = actors_left;
    summary.state_digest = sim.state_digest()?;
    summary.trace_digest = trace.finish();
    summary.raids_heard = controllers.raids_heard();
    Ok(summary)
}

fn run_entry_checks(sim: &mut Simulation, plan: &SoakPlan, summary: &mut SoakSummary) -> Result<()> {
    let others: Vec<_> = sim.with_world(|w| {
        let home = w.player_district();
        w.districts
            .iter()
            .map(|d| d.pos)
            .filter(|pos| Some(*pos) != home)
            .collect()
    })?;
    for pos in others {
        let mut steps = 0;
        let limit = plan.abort_entry_after;
        let report = sim.prepare_district_entry(pos, &mut || {
            steps += 1;
            limit.is_some_and(|limit| steps > limit)
        })?;
        let (world_turn, min, max) = sim.with_world(|w| {
            let district = w.district(pos);
            (
                w.time.turn,
                district.map_or(0, District::min_local_turn),
                district.map_or(0, District::max_local_turn),
            )
        })?;
        if min != world_turn || max != world_turn {
            summary.violations.push(format!(
                "district {pos:?} left at turns {min}..={max} after entry, world at {world_turn}"
            ));
        }
        if report.aborted && limit.is_none() {
            bail!("catch-up of {pos:?} aborted without being asked to");
        }
        summary.catchups.push(report);
    }
    Ok(())
}

fn player_map(world: &World) -> Option<&Map> {
    world
        .districts
        .iter()
        .flat_map(District::maps)
        .find(|m| m.player().is_some())
}

fn actor_gauges(actor: &Actor) -> Vec<String> {
    let mut out = Vec::new();
    let mut check = |name: &str, value: i32, max: i32| {
        if !(0..=max).contains(&value) {
            out.push(format!("{} {name} {value} outside 0..={max}", actor.id.0));
        }
    };
    check("action points", actor.action_points, i32::MAX);
    check("stamina", actor.stamina, actor.max_stamina());
    check("hit points", actor.hit_points, actor.max_hp());
    check("sanity", actor.sanity, actor.model.max_sanity);
    check("infection", actor.infection, actor.model.max_infection);
    out
}

fn map_violations(map: &Map) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen_tiles = BTreeSet::new();
    for actor in &map.actors {
        out.extend(actor_gauges(actor).into_iter().map(|v| format!("{}: {v}", map.name)));
        if !map.in_bounds(actor.position) || !map.is_walkable(actor.position) {
            out.push(format!("{}: {} stands on {:?}", map.name, actor.id.0, actor.position));
        }
        if !seen_tiles.insert(actor.position) {
            out.push(format!("{}: two actors on {:?}", map.name, actor.position));
        }
        if map.killed.contains(&actor.id) {
            out.push(format!("{}: killed actor {} still on the map", map.name, actor.id.0));
        }
        if actor.is_dead {
            out.push(format!("{}: dead actor {} still scheduled", map.name, actor.id.0));
        }
    }
    for scent in map.scents.iter() {
        if !(OdorScent::MIN_STRENGTH..=OdorScent::MAX_STRENGTH).contains(&scent.strength) {
            out.push(format!("{}: scent {scent:?} out of bounds", map.name));
        }
    }
    if map.check_next_actor_index != 0 {
        out.push(format!(
            "{}: scan index {} left set between turns",
            map.name, map.check_next_actor_index
        ));
    }
    out
}

/// Check the world between two player turns. `strict_clock` also requires
/// districts away from the player to stay frozen.
#[must_use]
pub fn sweep_invariants(world: &World, strict_clock: bool) -> Vec<String> {
    let mut out = Vec::new();
    let home = world.player_district();
    for district in &world.districts {
        out.extend(district.maps().flat_map(map_violations));
        let (min, max) = (district.min_local_turn(), district.max_local_turn());
        if Some(district.pos) == home {
            if min != world.time.turn || max != world.time.turn {
                out.push(format!(
                    "home district at turns {min}..={max}, world at {}",
                    world.time.turn
                ));
            }
        } else if max > world.time.turn {
            out.push(format!(
                "district {:?} ahead of the world clock ({max} > {})",
                district.pos, world.time.turn
            ));
        } else if strict_clock && max != 0 {
            out.push(format!("district {:?} moved without a simulator", district.pos));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(mode: GameMode, strategy: PlayerStrategy) -> SoakPlan {
        let mut plan = SoakPlan::new(mode, strategy).with_turns(40);
        plan.shape = WorldShape {
            size: 3,
            map_size: 16,
            npcs_per_district: 6,
        };
        plan
    }

    #[test]
    fn clean_run_has_no_violations() {
        let summary = run_soak(&small(GameMode::Standard, PlayerStrategy::Turtle), 3).expect("soak");
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert!(summary.turns_played == 40 || !summary.player_alive);
    }

    #[test]
    fn replays_match() {
        let plan = small(GameMode::CorpsesInfection, PlayerStrategy::Drifter);
        let a = run_soak(&plan, 8).expect("soak");
        let b = run_soak(&plan, 8).expect("soak");
        assert_eq!(a.state_digest, b.state_digest);
        assert_eq!(a.trace_digest, b.trace_digest);
    }

    #[test]
    fn entry_checks_bring_every_district_to_the_clock() {
        let plan = small(GameMode::Vintage, PlayerStrategy::Turtle).with_entry_checks(None);
        let summary = run_soak(&plan, 5).expect("soak");
        let expected = if summary.player_alive { 8 } else { 9 };
        assert_eq!(summary.catchups.len(), expected);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert!(summary.catchups.iter().all(|c| !c.aborted));
    }

    #[test]
    fn background_plans_are_not_replayable() {
        let plan = small(GameMode::Standard, PlayerStrategy::Hunter);
        assert!(plan.is_reproducible());
        assert!(!plan.with_background().is_reproducible());
    }
}
