//! Keeping off-screen districts in step with the world clock.
//!
//! Two executors share the same per-district step: [`catch_up_district`]
//! runs synchronously until a district reaches the world turn (or the caller
//! aborts), and [`BackgroundSimulator`] owns a thread that nudges the
//! player's neighbours forward one turn at a time while play goes on.
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::clock::WorldTime;
use crate::config::CatchupFidelity;
use crate::context::TurnContext;
use crate::error::SimError;
use crate::maintenance::Detail;
use crate::scheduler::{DistrictAdvance, SimFlags, advance_district};
use crate::world::{District, DistrictPos, World};

/// Outcome of a synchronous catch-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatchupReport {
    pub district: DistrictPos,
    pub start_turn: i32,
    pub end_turn: i32,
    pub full_turns: u32,
    pub low_turns: u32,
    /// The caller gave up and the district was jumped to the world turn.
    pub aborted: bool,
}

/// Fidelity of the district step that brings a district to `turn + 1`.
#[must_use]
pub fn detail_for_turn(fidelity: CatchupFidelity, turn: i32) -> Detail {
    let index = u32::try_from(turn.max(0)).unwrap_or(0);
    if fidelity.is_full_turn(index) {
        Detail::Full
    } else {
        Detail::Low
    }
}

/// Jump every map of the district that lags behind `turn` straight to it.
pub fn force_district_time(district: &mut District, turn: i32) {
    for map in district.maps_mut() {
        if map.local_time.turn < turn {
            map.local_time = WorldTime::new(turn);
            map.check_next_actor_index = 0;
        }
    }
}

fn step_district(ctx: &mut TurnContext, district: &mut District, detail: Detail) -> Result<(), SimError> {
    match advance_district(ctx, district, SimFlags::simulated(detail))? {
        DistrictAdvance::Advanced(_) => Ok(()),
        DistrictAdvance::AwaitingPlayer(_) => Err(SimError::PlayerInSimulatedDistrict(district.pos)),
    }
}

/// Advance `district` until every map reaches `world_turn`.
///
/// Steps alternate between full and low detail following `fidelity`.
/// `abort` is polled before each step; once it answers `true` the remaining
/// deficit is skipped with [`force_district_time`].
///
/// # Errors
///
/// Propagates scheduler and maintenance errors from the simulated turns.
pub fn catch_up_district(
    ctx: &mut TurnContext,
    district: &mut District,
    world_turn: i32,
    fidelity: CatchupFidelity,
    abort: &mut dyn FnMut() -> bool,
) -> Result<CatchupReport, SimError> {
    let mut report = CatchupReport {
        district: district.pos,
        start_turn: district.min_local_turn(),
        ..CatchupReport::default()
    };
    if report.start_turn < world_turn {
        info!(
            "catching up district ({}, {}) from turn {} to {world_turn}",
            district.pos.x, district.pos.y, report.start_turn
        );
    }
    while district.min_local_turn() < world_turn {
        if abort() {
            warn!(
                "catch-up of district ({}, {}) aborted at turn {}",
                district.pos.x,
                district.pos.y,
                district.min_local_turn()
            );
            force_district_time(district, world_turn);
            report.aborted = true;
            break;
        }
        let detail = detail_for_turn(fidelity, district.min_local_turn());
        step_district(ctx, district, detail)?;
        match detail {
            Detail::Full => report.full_turns += 1,
            Detail::Low => report.low_turns += 1,
        }
    }
    report.end_turn = district.min_local_turn();
    Ok(report)
}

/// What one background pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PassReport {
    pub district_turns: u32,
    /// Nothing was attempted because the player is awake and the
    /// background only runs while they sleep.
    pub gated: bool,
}

fn lock_world(world: &Mutex<World>) -> Result<MutexGuard<'_, World>, SimError> {
    world.lock().map_err(|_| SimError::WorldLockPoisoned)
}

fn player_is_sleeping(world: &World) -> bool {
    world
        .districts
        .iter()
        .flat_map(District::maps)
        .find_map(|m| m.player())
        .is_some_and(|p| p.is_sleeping)
}

/// Advance each lagging neighbour of the player's district by one turn.
///
/// The world lock is taken once per district, so the foreground can run
/// between two district steps. `keep_running` is checked before each one.
/// The player's own district is never touched.
///
/// # Errors
///
/// Returns `SimError::WorldLockPoisoned` if another thread panicked while
/// holding the world, and propagates simulated-turn errors.
pub fn simulate_nearby_districts(
    ctx: &mut TurnContext,
    world: &Mutex<World>,
    keep_running: &AtomicBool,
) -> Result<PassReport, SimError> {
    let mut report = PassReport::default();
    let targets = {
        let world = lock_world(world)?;
        let Some(player_district) = world.player_district() else {
            return Ok(report);
        };
        if ctx.config.background.simulate_when_sleeping && !player_is_sleeping(&world) {
            report.gated = true;
            return Ok(report);
        }
        world.neighbours(player_district)
    };

    for pos in targets {
        if !keep_running.load(Ordering::SeqCst) {
            break;
        }
        let mut world = lock_world(world)?;
        let world_turn = world.time.turn;
        ctx.weather = world.weather;
        let district = world.require_district_mut(pos)?;
        if district.has_player() || district.min_local_turn() >= world_turn {
            continue;
        }
        let detail = detail_for_turn(ctx.config.catchup, district.min_local_turn());
        step_district(ctx, district, detail)?;
        debug!("background advanced district ({}, {})", pos.x, pos.y);
        report.district_turns += 1;
    }
    Ok(report)
}

/// Totals returned when the background thread stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackgroundStats {
    pub passes: u64,
    pub district_turns: u64,
}

/// Handle on the background simulation thread.
pub struct BackgroundSimulator {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<BackgroundStats, SimError>>>,
}

impl BackgroundSimulator {
    /// Spawn the thread. `ctx` should carry its own RNG sub-stream.
    #[must_use]
    pub fn start(world: Arc<Mutex<World>>, ctx: TurnContext) -> Self {
        let keep_running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&keep_running);
        let thread = thread::spawn(move || run_background(ctx, &world, &flag));
        Self {
            keep_running,
            thread: Some(thread),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the thread to stop and wait for it.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the thread early, or
    /// `SimError::BackgroundPanicked`.
    pub fn stop(mut self) -> Result<BackgroundStats, SimError> {
        self.keep_running.store(false, Ordering::SeqCst);
        match self.thread.take() {
            Some(handle) => handle.join().map_err(|_| SimError::BackgroundPanicked)?,
            None => Ok(BackgroundStats::default()),
        }
    }
}

impl Drop for BackgroundSimulator {
    fn drop(&mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            warn!("background simulator panicked before shutdown");
        }
    }
}

fn run_background(
    mut ctx: TurnContext,
    world: &Mutex<World>,
    keep_running: &AtomicBool,
) -> Result<BackgroundStats, SimError> {
    let pause = Duration::from_millis(ctx.config.background.pause_ms);
    let mut stats = BackgroundStats::default();
    while keep_running.load(Ordering::SeqCst) {
        let pass = simulate_nearby_districts(&mut ctx, world, keep_running).inspect_err(|e| {
            warn!("background simulation stopped: {e}");
        })?;
        stats.passes += 1;
        stats.district_turns += u64::from(pass.district_turns);
        thread::sleep(pause);
    }
    info!(
        "background simulation stopped after {} passes, {} district turns",
        stats.passes, stats.district_turns
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, ActorId};
    use crate::config::SimConfig;
    use crate::controller::Controller;
    use crate::geometry::Point;
    use crate::models::{ModelCatalog, ModelId};
    use crate::rng::ScriptedDice;
    use std::time::Instant;

    fn ctx_with(config: SimConfig) -> TurnContext {
        TurnContext::new(
            Arc::new(config),
            Arc::new(ModelCatalog::default_catalog().clone()),
            Box::new(ScriptedDice::new()),
        )
    }

    fn world_with_player(turn: i32, sleeping: bool) -> World {
        let mut world = World::new(3, 1, 6, 6);
        world.time = WorldTime::new(turn);
        let model = ModelCatalog::default_catalog()
            .require(ModelId::Civilian)
            .expect("model")
            .clone();
        let mut player = Actor::new(ActorId(1), model, Point::new(2, 2)).with_controller(Controller::Player);
        player.is_sleeping = sleeping;
        let home = world.district_mut(DistrictPos::new(1, 0)).expect("district");
        home.entry.place_actor(player).expect("placed");
        world
    }

    #[test]
    fn fidelity_alternates_by_turn() {
        let fidelity = CatchupFidelity {
            full_turns: 2,
            cycle: 3,
        };
        let details: Vec<_> = (0..6).map(|t| detail_for_turn(fidelity, t)).collect();
        assert_eq!(
            details,
            vec![Detail::Full, Detail::Full, Detail::Low, Detail::Full, Detail::Full, Detail::Low]
        );
    }

    #[test]
    fn catch_up_reaches_the_world_turn() {
        let mut ctx = ctx_with(SimConfig::default());
        let mut district = District::new(DistrictPos::new(0, 0), 6, 6, true);
        let report = catch_up_district(
            &mut ctx,
            &mut district,
            5,
            CatchupFidelity::default(),
            &mut || false,
        )
        .expect("caught up");
        assert!(!report.aborted);
        assert_eq!((report.start_turn, report.end_turn), (0, 5));
        assert_eq!((report.full_turns, report.low_turns), (4, 1));
        assert!(district.maps().all(|m| m.local_time.turn == 5));
    }

    #[test]
    fn abort_jumps_to_the_world_turn() {
        let mut ctx = ctx_with(SimConfig::default());
        let mut district = District::new(DistrictPos::new(0, 0), 6, 6, false);
        let mut polls = 0;
        let report = catch_up_district(
            &mut ctx,
            &mut district,
            40,
            CatchupFidelity::default(),
            &mut || {
                polls += 1;
                polls > 2
            },
        )
        .expect("caught up");
        assert!(report.aborted);
        assert_eq!(report.full_turns + report.low_turns, 2);
        assert_eq!(report.end_turn, 40);
        assert!(district.maps().all(|m| m.local_time.turn == 40));
    }

    #[test]
    fn pass_skips_the_player_district() {
        let mut ctx = ctx_with(SimConfig::default());
        let world = Mutex::new(world_with_player(3, false));
        let keep_running = AtomicBool::new(true);
        let pass = simulate_nearby_districts(&mut ctx, &world, &keep_running).expect("pass");
        assert_eq!(pass.district_turns, 2);
        let world = world.lock().expect("lock");
        assert_eq!(world.district(DistrictPos::new(0, 0)).expect("d").min_local_turn(), 1);
        assert_eq!(world.district(DistrictPos::new(2, 0)).expect("d").min_local_turn(), 1);
        assert_eq!(world.district(DistrictPos::new(1, 0)).expect("d").max_local_turn(), 0);
    }

    #[test]
    fn pass_waits_for_the_player_to_sleep_when_asked() {
        let mut config = SimConfig::default();
        config.background.simulate_when_sleeping = true;
        let mut ctx = ctx_with(config);
        let keep_running = AtomicBool::new(true);

        let awake = Mutex::new(world_with_player(3, false));
        let pass = simulate_nearby_districts(&mut ctx, &awake, &keep_running).expect("pass");
        assert!(pass.gated);
        assert_eq!(pass.district_turns, 0);

        let asleep = Mutex::new(world_with_player(3, true));
        let pass = simulate_nearby_districts(&mut ctx, &asleep, &keep_running).expect("pass");
        assert_eq!(pass.district_turns, 2);
    }

    #[test]
    fn background_thread_syncs_neighbours_and_stops() {
        let mut config = SimConfig::default();
        config.background.pause_ms = 1;
        let world = Arc::new(Mutex::new(world_with_player(4, false)));
        let sim = BackgroundSimulator::start(Arc::clone(&world), ctx_with(config));

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let synced = {
                let w = world.lock().expect("lock");
                w.districts
                    .iter()
                    .filter(|d| !d.has_player())
                    .all(|d| d.min_local_turn() == 4)
            };
            if synced || Instant::now() > deadline {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }

        let stats = sim.stop().expect("stopped cleanly");
        assert_eq!(stats.district_turns, 8);
        let w = world.lock().expect("lock");
        assert_eq!(w.district(DistrictPos::new(1, 0)).expect("d").max_local_turn(), 0);
    }
}
