//! Per-executor simulation context threaded through every turn call.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::actor::ActorId;
use crate::config::SimConfig;
use crate::controller::Controller;
use crate::messages::MessageLog;
use crate::models::{ActorModel, ModelCatalog};
use crate::rng::{Dice, DiceRoller, StreamId};
use crate::weather::Weather;

/// Why an actor is being created by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnRole {
    /// Arrives with a world event.
    EventArrival,
    /// Leads an arriving group.
    GroupLeader,
    /// Follows a group leader.
    GroupFollower,
    /// Rises from a corpse or turns on death.
    Zombified,
}

/// Supplies controllers for actors the engine spawns.
pub trait ControllerFactory: Send + Sync {
    fn controller_for(&self, model: &ActorModel, role: SpawnRole) -> Controller;
}

/// Factory that leaves spawned actors without a brain.
#[derive(Debug, Default, Clone, Copy)]
pub struct InertControllers;

impl ControllerFactory for InertControllers {
    fn controller_for(&self, _model: &ActorModel, _role: SpawnRole) -> Controller {
        Controller::None
    }
}

/// Session-wide source of unique actor ids, shared between executors.
#[derive(Debug, Clone, Default)]
pub struct ActorIdSource(Arc<AtomicU64>);

impl ActorIdSource {
    /// Source whose first id is `next`.
    #[must_use]
    pub fn starting_at(next: u64) -> Self {
        Self(Arc::new(AtomicU64::new(next)))
    }

    pub fn next_id(&self) -> ActorId {
        ActorId(self.0.fetch_add(1, Ordering::Relaxed))
    }

    /// Move the counter past `id` so it is never handed out again.
    pub fn reserve_through(&self, id: ActorId) {
        self.0.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }
}

/// Everything a turn needs besides the map itself.
pub struct TurnContext {
    pub config: Arc<SimConfig>,
    pub models: Arc<ModelCatalog>,
    pub dice: Box<dyn Dice>,
    pub messages: MessageLog,
    pub ids: ActorIdSource,
    pub controllers: Arc<dyn ControllerFactory>,
    /// Current global weather, copied in before each advance.
    pub weather: Weather,
}

impl TurnContext {
    #[must_use]
    pub fn new(config: Arc<SimConfig>, models: Arc<ModelCatalog>, dice: Box<dyn Dice>) -> Self {
        let messages = MessageLog::new(config.message_capacity);
        Self {
            config,
            models,
            dice,
            messages,
            ids: ActorIdSource::starting_at(1),
            controllers: Arc::new(InertControllers),
            weather: Weather::default(),
        }
    }

    /// Context for one executor, with its own RNG sub-stream.
    #[must_use]
    pub fn for_stream(
        config: Arc<SimConfig>,
        models: Arc<ModelCatalog>,
        session_seed: u64,
        stream: StreamId,
    ) -> Self {
        Self::new(
            config,
            models,
            Box::new(DiceRoller::for_stream(session_seed, stream)),
        )
    }

    #[must_use]
    pub fn with_ids(mut self, ids: ActorIdSource) -> Self {
        self.ids = ids;
        self
    }

    #[must_use]
    pub fn with_controllers(mut self, controllers: Arc<dyn ControllerFactory>) -> Self {
        self.controllers = controllers;
        self
    }
}

impl std::fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("config", &self.config)
            .field("messages", &self.messages.len())
            .field("ids", &self.ids)
            .field("weather", &self.weather)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_across_clones() {
        let ids = ActorIdSource::starting_at(5);
        let other = ids.clone();
        assert_eq!(ids.next_id(), ActorId(5));
        assert_eq!(other.next_id(), ActorId(6));
        other.reserve_through(ActorId(20));
        assert_eq!(ids.next_id(), ActorId(21));
        ids.reserve_through(ActorId(3));
        assert_eq!(ids.next_id(), ActorId(22));
    }
}
