//! Per-map odor field used by AI tracking.
//!
//! Each tile carries independent integer strengths per [`OdorKind`]. The
//! field stores only present scents; a strength that drops under
//! [`OdorScent::MIN_STRENGTH`] is removed on the next prune.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{SCENT_BASE_DECAY, SCENT_SEWERS_EXTRA_DECAY, TURNS_PER_HOUR};
use crate::geometry::{Direction, Point};
use crate::map::MapKind;
use crate::weather::Weather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OdorKind {
    Living,
    UndeadMaster,
    PerfumeLivingSuppressor,
    PerfumeLivingGenerator,
}

impl OdorKind {
    #[must_use]
    pub const fn is_perfume(self) -> bool {
        matches!(
            self,
            Self::PerfumeLivingSuppressor | Self::PerfumeLivingGenerator
        )
    }
}

/// One scent reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdorScent {
    pub odor: OdorKind,
    pub strength: i32,
    pub position: Point,
}

impl OdorScent {
    pub const MIN_STRENGTH: i32 = 1;
    pub const MAX_STRENGTH: i32 = 9 * TURNS_PER_HOUR;
}

/// Scent decay for a tile: sewers decay faster, and rain washes outside tiles.
#[must_use]
pub const fn scent_decay_rate(kind: MapKind, outside: bool, weather: Weather) -> i32 {
    if matches!(kind, MapKind::Sewers) {
        return SCENT_BASE_DECAY + SCENT_SEWERS_EXTRA_DECAY;
    }
    if outside {
        SCENT_BASE_DECAY + weather.scent_decay_bonus()
    } else {
        SCENT_BASE_DECAY
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScentField {
    #[serde(with = "scent_entries")]
    scents: BTreeMap<(Point, OdorKind), i32>,
}

impl ScentField {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scents.is_empty()
    }

    /// Strength of `odor` at `pos`, 0 when absent.
    #[must_use]
    pub fn scent_at(&self, pos: Point, odor: OdorKind) -> i32 {
        self.scents.get(&(pos, odor)).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = OdorScent> + '_ {
        self.scents
            .iter()
            .map(|(&(position, odor), &strength)| OdorScent {
                odor,
                strength,
                position,
            })
    }

    /// Raise the scent at `pos` to at least `strength`.
    pub fn refresh_at(&mut self, pos: Point, odor: OdorKind, strength: i32) {
        let strength = strength.min(OdorScent::MAX_STRENGTH);
        if strength < OdorScent::MIN_STRENGTH {
            return;
        }
        let entry = self.scents.entry((pos, odor)).or_insert(strength);
        *entry = (*entry).max(strength);
    }

    /// Add `delta` to the scent at `pos`; drops it when it falls under the minimum.
    pub fn modify_at(&mut self, pos: Point, odor: OdorKind, delta: i32) {
        let current = self.scent_at(pos, odor);
        let next = current.saturating_add(delta).min(OdorScent::MAX_STRENGTH);
        if next < OdorScent::MIN_STRENGTH {
            self.scents.remove(&(pos, odor));
        } else {
            self.scents.insert((pos, odor), next);
        }
    }

    /// Apply perfume modifiers to the living scent at their tiles. Modifiers
    /// are read from a snapshot so the order of entries does not matter.
    pub fn apply_perfumes(&mut self) {
        let modifiers: Vec<(Point, i32)> = self
            .scents
            .iter()
            .filter_map(|(&(pos, odor), &strength)| match odor {
                OdorKind::PerfumeLivingSuppressor => Some((pos, -strength)),
                OdorKind::PerfumeLivingGenerator => Some((pos, strength)),
                OdorKind::Living | OdorKind::UndeadMaster => None,
            })
            .collect();
        for (pos, delta) in modifiers {
            self.modify_at(pos, OdorKind::Living, delta);
        }
    }

    /// Decay every scent by the per-tile rate.
    pub fn decay(&mut self, rate_at: impl Fn(Point) -> i32) {
        for (&(pos, _), strength) in &mut self.scents {
            *strength -= rate_at(pos);
        }
    }

    /// Remove every scent under the minimum strength.
    pub fn prune(&mut self) {
        self.scents
            .retain(|_, strength| *strength >= OdorScent::MIN_STRENGTH);
    }

    /// Neighbour with the strongest trace of `odor`, ties resolved by direction order.
    #[must_use]
    pub fn strongest_adjacent(&self, pos: Point, odor: OdorKind) -> Option<(Point, i32)> {
        Direction::ALL
            .into_iter()
            .map(|dir| pos.offset(dir))
            .map(|p| (p, self.scent_at(p, odor)))
            .filter(|&(_, strength)| strength > 0)
            .fold(None, |best, candidate| match best {
                Some((_, best_strength)) if best_strength >= candidate.1 => best,
                _ => Some(candidate),
            })
    }
}

mod scent_entries {
    use super::{OdorKind, OdorScent, Point};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        scents: &BTreeMap<(Point, OdorKind), i32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<OdorScent> = scents
            .iter()
            .map(|(&(position, odor), &strength)| OdorScent {
                odor,
                strength,
                position,
            })
            .collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<(Point, OdorKind), i32>, D::Error> {
        let list = Vec::<OdorScent>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|scent| ((scent.position, scent.odor), scent.strength))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: Point = Point::new(3, 3);

    #[test]
    fn refresh_keeps_the_stronger_value_and_clamps() {
        let mut field = ScentField::new();
        field.refresh_at(P, OdorKind::Living, 50);
        field.refresh_at(P, OdorKind::Living, 20);
        assert_eq!(field.scent_at(P, OdorKind::Living), 50);
        field.refresh_at(P, OdorKind::Living, 10_000);
        assert_eq!(field.scent_at(P, OdorKind::Living), OdorScent::MAX_STRENGTH);
        field.refresh_at(P, OdorKind::UndeadMaster, 0);
        assert_eq!(field.scent_at(P, OdorKind::UndeadMaster), 0);
    }

    #[test]
    fn suppressor_and_generator_use_a_snapshot() {
        let mut field = ScentField::new();
        let q = Point::new(4, 4);
        field.refresh_at(P, OdorKind::Living, 30);
        field.refresh_at(P, OdorKind::PerfumeLivingSuppressor, 100);
        field.refresh_at(q, OdorKind::PerfumeLivingGenerator, 40);
        field.apply_perfumes();
        assert_eq!(field.scent_at(P, OdorKind::Living), 0);
        assert_eq!(field.scent_at(q, OdorKind::Living), 40);
        assert_eq!(field.scent_at(P, OdorKind::PerfumeLivingSuppressor), 100);
    }

    #[test]
    fn decay_then_prune_removes_weak_scents() {
        let mut field = ScentField::new();
        field.refresh_at(P, OdorKind::Living, 2);
        field.refresh_at(Point::new(0, 0), OdorKind::Living, 9);
        field.decay(|_| 3);
        field.prune();
        assert_eq!(field.len(), 1);
        assert!(
            field
                .iter()
                .all(|s| (OdorScent::MIN_STRENGTH..=OdorScent::MAX_STRENGTH).contains(&s.strength))
        );
    }

    #[test]
    fn decay_rate_depends_on_place_and_weather() {
        assert_eq!(scent_decay_rate(MapKind::Sewers, false, Weather::HeavyRain), 3);
        assert_eq!(scent_decay_rate(MapKind::Entry, true, Weather::HeavyRain), 3);
        assert_eq!(scent_decay_rate(MapKind::Entry, true, Weather::Rain), 2);
        assert_eq!(scent_decay_rate(MapKind::Entry, false, Weather::Rain), 1);
        assert_eq!(scent_decay_rate(MapKind::Subway, true, Weather::Clear), 1);
    }

    #[test]
    fn strongest_adjacent_tracks_the_trail() {
        let mut field = ScentField::new();
        field.refresh_at(Point::new(4, 3), OdorKind::Living, 10);
        field.refresh_at(Point::new(2, 2), OdorKind::Living, 25);
        assert_eq!(
            field.strongest_adjacent(P, OdorKind::Living),
            Some((Point::new(2, 2), 25))
        );
        assert_eq!(field.strongest_adjacent(P, OdorKind::UndeadMaster), None);
    }
}
