//! Player-facing message channel.
//!
//! Messages are deterministic game output keyed by stable `log.*` ids, kept
//! apart from the diagnostic `log` facade.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::actor::ActorId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub turn: i32,
    pub key: String,
    pub actor: Option<ActorId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

/// Bounded ring of the most recent messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    entries: VecDeque<Message>,
    capacity: usize,
    total: u64,
}

impl MessageLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    pub fn push(&mut self, turn: i32, key: &str, actor: Option<ActorId>, detail: impl Into<String>) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Message {
            turn,
            key: key.to_string(),
            actor,
            detail: detail.into(),
        });
        self.total += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages pushed since creation, including evicted ones.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|m| m.key == key)
    }

    #[must_use]
    pub fn count_key(&self, key: &str) -> usize {
        self.entries.iter().filter(|m| m.key == key).count()
    }

    /// Take every buffered message, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Message> {
        self.entries.drain(..).collect()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(256)
    }
}
