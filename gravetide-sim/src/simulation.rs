//! Session wrapper binding the shared world to its executors.
use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::action::{Action, ActionOutcome, perform_player_action};
use crate::actor::ActorId;
use crate::catchup::{BackgroundSimulator, BackgroundStats, CatchupReport, catch_up_district};
use crate::clock::WorldTime;
use crate::config::SimConfig;
use crate::constants::LOG_WEATHER_CHANGE;
use crate::context::{ActorIdSource, ControllerFactory, InertControllers, TurnContext};
use crate::error::SimError;
use crate::events::{EventReport, check_district_events};
use crate::maintenance::TurnReport;
use crate::messages::{Message, MessageLog};
use crate::models::ModelCatalog;
use crate::rng::StreamId;
use crate::scheduler::{DistrictAdvance, SimFlags, advance_district};
use crate::weather::roll_weather_change;
use crate::world::{DistrictPos, World};

/// What one call to [`Simulation::advance_play`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayAdvance {
    /// The player is up. Perform an action, then advance again.
    AwaitingPlayer(ActorId),
    Advanced(PlayTurn),
}

/// Reports gathered while the player's district closed a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayTurn {
    pub turns: Vec<TurnReport>,
    pub events: Option<EventReport>,
    pub world_turn: i32,
}

/// A running game: the shared world, the foreground executor and the
/// optional background thread.
pub struct Simulation {
    world: Arc<Mutex<World>>,
    config: Arc<SimConfig>,
    models: Arc<ModelCatalog>,
    session_seed: u64,
    ids: ActorIdSource,
    controllers: Arc<dyn ControllerFactory>,
    foreground: TurnContext,
    background: Option<BackgroundSimulator>,
    background_starts: u64,
    /// Entry-map turn of the player's district whose events were rolled last.
    events_rolled_through: i32,
    /// Events rolled while the player's map was still mid-turn.
    pending_events: Option<EventReport>,
}

impl Simulation {
    /// Wrap a generated world.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` when `config` fails validation.
    pub fn new(world: World, config: SimConfig, session_seed: u64) -> Result<Self, SimError> {
        Self::with_parts(
            world,
            config,
            ModelCatalog::default_catalog().clone(),
            Arc::new(InertControllers),
            session_seed,
        )
    }

    /// Wrap a generated world with a custom catalog and controller factory.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` when `config` fails validation.
    pub fn with_parts(
        world: World,
        config: SimConfig,
        models: ModelCatalog,
        controllers: Arc<dyn ControllerFactory>,
        session_seed: u64,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let config = Arc::new(config);
        let models = Arc::new(models);
        let ids = ActorIdSource::starting_at(1);
        if let Some(max) = world.max_actor_id() {
            ids.reserve_through(max);
        }
        let events_rolled_through = world.time.turn;
        let foreground = TurnContext::for_stream(
            Arc::clone(&config),
            Arc::clone(&models),
            session_seed,
            StreamId::Foreground,
        )
        .with_ids(ids.clone())
        .with_controllers(Arc::clone(&controllers));
        Ok(Self {
            world: Arc::new(Mutex::new(world)),
            config,
            models,
            session_seed,
            ids,
            controllers,
            foreground,
            background: None,
            background_starts: 0,
            events_rolled_through,
            pending_events: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub const fn session_seed(&self) -> u64 {
        self.session_seed
    }

    /// Foreground message log.
    #[must_use]
    pub const fn messages(&self) -> &MessageLog {
        &self.foreground.messages
    }

    pub fn drain_messages(&mut self) -> Vec<Message> {
        self.foreground.messages.drain()
    }

    fn lock(&self) -> Result<MutexGuard<'_, World>, SimError> {
        self.world.lock().map_err(|_| SimError::WorldLockPoisoned)
    }

    /// Read the world under the lock.
    ///
    /// # Errors
    ///
    /// Returns `SimError::WorldLockPoisoned` if a thread panicked while
    /// holding the world.
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> Result<R, SimError> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    /// Mutate the world under the lock.
    ///
    /// # Errors
    ///
    /// Returns `SimError::WorldLockPoisoned` if a thread panicked while
    /// holding the world.
    pub fn with_world_mut<R>(&mut self, f: impl FnOnce(&mut World) -> R) -> Result<R, SimError> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// Advance the player's district until the player is up or every map
    /// closed a turn. Events are rolled once per entry-map turn and the
    /// world clock follows the district.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NoPlayer` when no map holds the player, and
    /// propagates scheduler, maintenance and event errors.
    pub fn advance_play(&mut self) -> Result<PlayAdvance, SimError> {
        let mut world = self.world.lock().map_err(|_| SimError::WorldLockPoisoned)?;
        let pos = world.player_district().ok_or(SimError::NoPlayer)?;
        let ctx = &mut self.foreground;
        ctx.weather = world.weather;

        let district = world.require_district_mut(pos)?;
        let advance = advance_district(ctx, district, SimFlags::NOT_SIMULATING)?;
        if district.entry.local_time.turn > self.events_rolled_through {
            self.events_rolled_through = district.entry.local_time.turn;
            let rolled = check_district_events(ctx, district)?;
            self.pending_events
                .get_or_insert_with(EventReport::default)
                .checks
                .extend(rolled.checks);
        }
        let district_turn = district.min_local_turn();

        let turns = match advance {
            DistrictAdvance::AwaitingPlayer(id) => return Ok(PlayAdvance::AwaitingPlayer(id)),
            DistrictAdvance::Advanced(turns) => turns,
        };
        let events = self.pending_events.take();
        while world.time.turn < district_turn {
            world.time.advance();
            if world.time.is_strike_of_hour() {
                let next = roll_weather_change(world.weather, self.config.weather_change_chance, &mut *ctx.dice);
                if next != world.weather {
                    info!("weather turns {next:?} at turn {}", world.time.turn);
                    ctx.messages
                        .push(world.time.turn, LOG_WEATHER_CHANGE, None, next.i18n_key());
                    world.weather = next;
                }
            }
        }
        Ok(PlayAdvance::Advanced(PlayTurn {
            turns,
            events,
            world_turn: world.time.turn,
        }))
    }

    /// Perform `action` for the player on the map they stand on.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NoPlayer` when no map holds the player, and
    /// propagates invariant violations from the action.
    pub fn perform_player_action(&mut self, action: Action) -> Result<ActionOutcome, SimError> {
        let mut world = self.world.lock().map_err(|_| SimError::WorldLockPoisoned)?;
        let pos = world.player_district().ok_or(SimError::NoPlayer)?;
        self.foreground.weather = world.weather;
        let district = world.require_district_mut(pos)?;
        let player = district.player_id().ok_or(SimError::NoPlayer)?;
        let map = district.player_map_mut().ok_or(SimError::NoPlayer)?;
        perform_player_action(&mut self.foreground, map, player, action)
    }

    /// Bring a district up to the world turn before the player enters it.
    /// The background thread is paused while this runs.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownDistrict` for a position off the grid and
    /// propagates simulated-turn errors.
    pub fn prepare_district_entry(
        &mut self,
        pos: DistrictPos,
        abort: &mut dyn FnMut() -> bool,
    ) -> Result<CatchupReport, SimError> {
        self.with_background_paused(|sim| {
            let fidelity = sim.config.catchup;
            let mut world = sim.world.lock().map_err(|_| SimError::WorldLockPoisoned)?;
            let world_turn = world.time.turn;
            sim.foreground.weather = world.weather;
            let district = world.require_district_mut(pos)?;
            catch_up_district(&mut sim.foreground, district, world_turn, fidelity, abort)
        })
    }

    /// Run `f` with the background thread stopped, restarting it afterwards
    /// if it was running.
    ///
    /// # Errors
    ///
    /// Returns the background thread's error if it failed, or whatever `f`
    /// returns.
    pub fn with_background_paused<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, SimError>,
    ) -> Result<R, SimError> {
        let was_running = self.background.is_some();
        if was_running {
            self.stop_background()?;
        }
        let out = f(self);
        if was_running {
            self.start_background();
        }
        out
    }

    #[must_use]
    pub fn background_running(&self) -> bool {
        self.background.as_ref().is_some_and(BackgroundSimulator::is_running)
    }

    /// Start the background thread if it is not already running. Each start
    /// gets a fresh RNG sub-stream.
    pub fn start_background(&mut self) {
        if self.background.is_some() {
            return;
        }
        let seed = self.session_seed.wrapping_add(self.background_starts);
        self.background_starts += 1;
        let ctx = TurnContext::for_stream(
            Arc::clone(&self.config),
            Arc::clone(&self.models),
            seed,
            StreamId::Background,
        )
        .with_ids(self.ids.clone())
        .with_controllers(Arc::clone(&self.controllers));
        debug!("starting background simulation");
        self.background = Some(BackgroundSimulator::start(Arc::clone(&self.world), ctx));
    }

    /// Stop the background thread, returning its totals when one was running.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the thread early.
    pub fn stop_background(&mut self) -> Result<Option<BackgroundStats>, SimError> {
        self.background.take().map(BackgroundSimulator::stop).transpose()
    }

    /// Digest of the current world state.
    ///
    /// # Errors
    ///
    /// Returns `SimError::WorldLockPoisoned` if a thread panicked while
    /// holding the world.
    pub fn state_digest(&self) -> Result<u64, SimError> {
        self.with_world(World::state_digest)
    }

    /// Force the world clock to `turn` without simulating anything.
    ///
    /// # Errors
    ///
    /// Returns `SimError::WorldLockPoisoned` if a thread panicked while
    /// holding the world.
    pub fn set_world_turn(&mut self, turn: i32) -> Result<(), SimError> {
        self.with_world_mut(|w| w.time = WorldTime::new(turn))
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("session_seed", &self.session_seed)
            .field("background_running", &self.background_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::controller::Controller;
    use crate::geometry::{Direction, Point};
    use crate::models::ModelId;

    fn world_with_player() -> World {
        let mut world = World::new(3, 1, 8, 8);
        let model = ModelCatalog::default_catalog()
            .require(ModelId::Civilian)
            .expect("model")
            .clone();
        let player = Actor::new(ActorId(7), model, Point::new(3, 3)).with_controller(Controller::Player);
        world
            .district_mut(DistrictPos::new(1, 0))
            .expect("district")
            .entry
            .place_actor(player)
            .expect("placed");
        world
    }

    fn quiet_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.events = crate::config::EventRules::disabled();
        config
    }

    #[test]
    fn play_waits_for_the_player_then_closes_the_turn() {
        let mut sim = Simulation::new(world_with_player(), quiet_config(), 11).expect("sim");
        assert_eq!(sim.advance_play(), Ok(PlayAdvance::AwaitingPlayer(ActorId(7))));
        assert_eq!(
            sim.perform_player_action(Action::Step(Direction::E)),
            Ok(ActionOutcome::Performed)
        );
        let advance = sim.advance_play().expect("advanced");
        let PlayAdvance::Advanced(turn) = advance else {
            panic!("expected the turn to close, got {advance:?}");
        };
        assert_eq!(turn.world_turn, 1);
        assert!(turn.events.is_some());
        let pos = sim
            .with_world(|w| {
                w.district(DistrictPos::new(1, 0))
                    .and_then(|d| d.entry.actor(ActorId(7)))
                    .map(|a| a.position)
            })
            .expect("world");
        assert_eq!(pos, Some(Point::new(4, 3)));
    }

    #[test]
    fn refused_player_actions_cost_nothing() {
        let mut sim = Simulation::new(world_with_player(), quiet_config(), 11).expect("sim");
        let outcome = sim.perform_player_action(Action::StartSleeping).expect("attempted");
        assert!(matches!(outcome, ActionOutcome::Refused(_)));
        assert_eq!(sim.advance_play(), Ok(PlayAdvance::AwaitingPlayer(ActorId(7))));
        assert_eq!(sim.messages().len(), 1);
    }

    #[test]
    fn entering_a_district_catches_it_up() {
        let mut sim = Simulation::new(world_with_player(), quiet_config(), 3).expect("sim");
        sim.set_world_turn(12).expect("set");
        let report = sim
            .prepare_district_entry(DistrictPos::new(2, 0), &mut || false)
            .expect("caught up");
        assert_eq!(report.end_turn, 12);
        assert!(!report.aborted);
    }

    #[test]
    fn missing_player_is_an_error() {
        let mut sim = Simulation::new(World::new(1, 1, 4, 4), quiet_config(), 1).expect("sim");
        assert_eq!(sim.advance_play(), Err(SimError::NoPlayer));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimConfig::default();
        config.weather_change_chance = 400;
        assert!(matches!(
            Simulation::new(World::new(1, 1, 4, 4), config, 1),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn background_pauses_around_catch_up() {
        let mut sim = Simulation::new(world_with_player(), quiet_config(), 5).expect("sim");
        sim.start_background();
        assert!(sim.background_running());
        sim.set_world_turn(6).expect("set");
        let report = sim
            .prepare_district_entry(DistrictPos::new(0, 0), &mut || false)
            .expect("caught up");
        assert_eq!(report.end_turn, 6);
        assert!(sim.background_running());
        assert!(sim.stop_background().expect("stopped").is_some());
        assert!(!sim.background_running());
    }
}
