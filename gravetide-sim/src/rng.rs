//! Seeded dice service and per-thread RNG sub-streams.
//!
//! Every chance roll in the engine goes through the [`Dice`] trait, and every
//! executor (foreground play, background catch-up, world generation) owns its
//! own [`DiceRoller`] whose seed is derived from the session seed with a
//! domain tag. Two threads therefore never interleave draws on one stream.
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::VecDeque;

use crate::numbers::{i32_to_index, len_to_i32};

/// The dice/roll service consumed by scheduling, maintenance and combat.
pub trait Dice: Send {
    /// Uniform roll in `[min, max)`. Returns `min` when the range is empty.
    fn roll(&mut self, min: i32, max: i32) -> i32;

    /// Percent chance gate.
    fn roll_chance(&mut self, percent: i32) -> bool {
        self.roll(0, 100) < percent
    }

    /// Per-mille chance gate.
    fn roll_permil(&mut self, permil: i32) -> bool {
        self.roll(0, 1000) < permil
    }

    /// Skill roll: average of two uniform draws in `[0, value]`.
    fn roll_skill(&mut self, value: i32) -> i32 {
        if value <= 0 {
            return 0;
        }
        (self.roll(0, value + 1) + self.roll(0, value + 1)) / 2
    }

    /// Damage roll in `[value / 2, value]`.
    fn roll_damage(&mut self, value: i32) -> i32 {
        if value <= 0 {
            return 0;
        }
        self.roll(value / 2, value + 1)
    }

    /// Uniform index into a collection of `len` elements.
    fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(i32_to_index(self.roll(0, len_to_i32(len))))
    }
}

/// Named sub-streams derived from one session seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamId {
    Foreground,
    Background,
    Generator,
}

impl StreamId {
    #[must_use]
    pub const fn domain_tag(self) -> &'static [u8] {
        match self {
            Self::Foreground => b"foreground",
            Self::Background => b"background",
            Self::Generator => b"generator",
        }
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Deterministic dice backed by a ChaCha20 stream.
#[derive(Debug, Clone)]
pub struct DiceRoller {
    rng: CountingRng<ChaCha20Rng>,
}

impl DiceRoller {
    /// Dice seeded directly from a raw stream seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: CountingRng {
                rng: ChaCha20Rng::seed_from_u64(seed),
                draws: 0,
            },
        }
    }

    /// Dice for one executor, derived from the session seed.
    #[must_use]
    pub fn for_stream(session_seed: u64, stream: StreamId) -> Self {
        Self::from_seed(derive_stream_seed(session_seed, stream.domain_tag()))
    }

    /// Number of draws consumed so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.rng.draws()
    }
}

impl Dice for DiceRoller {
    fn roll(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }
}

/// Derive an independent stream seed from the user seed and a domain tag.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Dice that replay queued results, for deterministic scenario tests and
/// replays. Empty queues fall back to the highest value of the requested
/// range, which makes every non-certain chance gate fail.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<i32>,
    skills: VecDeque<i32>,
    damages: VecDeque<i32>,
}

impl ScriptedDice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw `roll` results (clamped into the requested range when used).
    #[must_use]
    pub fn with_rolls(mut self, rolls: impl IntoIterator<Item = i32>) -> Self {
        self.rolls.extend(rolls);
        self
    }

    /// Queue `roll_skill` results.
    #[must_use]
    pub fn with_skill_rolls(mut self, skills: impl IntoIterator<Item = i32>) -> Self {
        self.skills.extend(skills);
        self
    }

    /// Queue `roll_damage` results.
    #[must_use]
    pub fn with_damage_rolls(mut self, damages: impl IntoIterator<Item = i32>) -> Self {
        self.damages.extend(damages);
        self
    }

    /// Results still waiting to be consumed, across all queues.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rolls.len() + self.skills.len() + self.damages.len()
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rolls
            .pop_front()
            .map_or(max - 1, |value| value.clamp(min, max - 1))
    }

    fn roll_skill(&mut self, value: i32) -> i32 {
        match self.skills.pop_front() {
            Some(scripted) => scripted,
            None if value <= 0 => 0,
            None => value,
        }
    }

    fn roll_damage(&mut self, value: i32) -> i32 {
        match self.damages.pop_front() {
            Some(scripted) => scripted,
            None => value.max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_seed_stable_and_distinct() {
        let mut a = DiceRoller::for_stream(42, StreamId::Foreground);
        let mut b = DiceRoller::for_stream(42, StreamId::Foreground);
        let mut c = DiceRoller::for_stream(42, StreamId::Background);
        let seq_a: Vec<i32> = (0..16).map(|_| a.roll(0, 1000)).collect();
        let seq_b: Vec<i32> = (0..16).map(|_| b.roll(0, 1000)).collect();
        let seq_c: Vec<i32> = (0..16).map(|_| c.roll(0, 1000)).collect();
        assert_eq!(seq_a, seq_b);
        assert_ne!(seq_a, seq_c);
        assert_eq!(a.draws(), 16);
    }

    #[test]
    fn empty_ranges_return_min() {
        let mut dice = DiceRoller::from_seed(1);
        assert_eq!(dice.roll(5, 5), 5);
        assert_eq!(dice.roll(7, 3), 7);
        assert_eq!(dice.pick_index(0), None);
    }

    #[test]
    fn skill_and_damage_rolls_stay_in_range() {
        let mut dice = DiceRoller::from_seed(9);
        for _ in 0..200 {
            let skill = dice.roll_skill(10);
            assert!((0..=10).contains(&skill));
            let dmg = dice.roll_damage(8);
            assert!((4..=8).contains(&dmg));
        }
        assert_eq!(dice.roll_skill(0), 0);
        assert_eq!(dice.roll_damage(-3), 0);
    }

    #[test]
    fn scripted_dice_replays_then_fails_chances() {
        let mut dice = ScriptedDice::new()
            .with_rolls([3, 250])
            .with_skill_rolls([10])
            .with_damage_rolls([6]);
        assert_eq!(dice.roll(0, 10), 3);
        assert_eq!(dice.roll(0, 100), 99);
        assert_eq!(dice.roll_skill(4), 10);
        assert_eq!(dice.roll_damage(8), 6);
        assert!(!dice.roll_chance(50));
        assert!(dice.roll_chance(100));
        assert_eq!(dice.pending(), 0);
    }
}
