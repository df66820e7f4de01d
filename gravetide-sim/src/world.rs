//! Districts and the world grid.
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::actor::ActorId;
use crate::clock::WorldTime;
use crate::error::SimError;
use crate::map::{Map, MapKind};
use crate::weather::Weather;

/// Coordinate of a district in the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct DistrictPos {
    pub x: i32,
    pub y: i32,
}

impl DistrictPos {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Districts sharing an edge or a corner with this one.
    #[must_use]
    pub const fn is_neighbour_of(self, other: Self) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dx <= 1 && dy <= 1 && (dx + dy) > 0
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct District {
    pub pos: DistrictPos,
    pub entry: Map,
    pub sewers: Map,
    pub subway: Option<Map>,
}

impl District {
    /// Empty district with blank maps of the given size.
    #[must_use]
    pub fn new(pos: DistrictPos, width: i32, height: i32, with_subway: bool) -> Self {
        let label = format!("{}-{}", pos.x, pos.y);
        Self {
            pos,
            entry: Map::new(format!("{label} entry"), MapKind::Entry, pos, width, height),
            sewers: Map::new(format!("{label} sewers"), MapKind::Sewers, pos, width, height),
            subway: with_subway
                .then(|| Map::new(format!("{label} subway"), MapKind::Subway, pos, width, height)),
        }
    }

    pub fn maps(&self) -> impl Iterator<Item = &Map> {
        [&self.entry, &self.sewers]
            .into_iter()
            .chain(self.subway.as_ref())
    }

    pub fn maps_mut(&mut self) -> impl Iterator<Item = &mut Map> {
        [&mut self.entry, &mut self.sewers]
            .into_iter()
            .chain(self.subway.as_mut())
    }

    /// Latest local turn among the district's maps.
    #[must_use]
    pub fn max_local_turn(&self) -> i32 {
        self.maps().map(|m| m.local_time.turn).max().unwrap_or(0)
    }

    /// Earliest local turn among the district's maps.
    #[must_use]
    pub fn min_local_turn(&self) -> i32 {
        self.maps().map(|m| m.local_time.turn).min().unwrap_or(0)
    }

    #[must_use]
    pub fn has_player(&self) -> bool {
        self.maps().any(|m| m.player().is_some())
    }

    #[must_use]
    pub fn player_id(&self) -> Option<ActorId> {
        self.maps().find_map(|m| m.player().map(|p| p.id))
    }

    /// The map the player stands on.
    pub fn player_map_mut(&mut self) -> Option<&mut Map> {
        self.maps_mut().find(|m| m.player().is_some())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct World {
    pub width: i32,
    pub height: i32,
    /// Row-major district grid.
    pub districts: Vec<District>,
    pub weather: Weather,
    pub time: WorldTime,
}

impl World {
    /// A grid of empty districts.
    #[must_use]
    pub fn new(width: i32, height: i32, map_width: i32, map_height: i32) -> Self {
        let mut districts = Vec::new();
        for y in 0..height.max(0) {
            for x in 0..width.max(0) {
                let with_subway = y == height / 2;
                districts.push(District::new(
                    DistrictPos::new(x, y),
                    map_width,
                    map_height,
                    with_subway,
                ));
            }
        }
        Self {
            width: width.max(0),
            height: height.max(0),
            districts,
            weather: Weather::default(),
            time: WorldTime::default(),
        }
    }

    #[must_use]
    pub fn district(&self, pos: DistrictPos) -> Option<&District> {
        self.districts.iter().find(|d| d.pos == pos)
    }

    pub fn district_mut(&mut self, pos: DistrictPos) -> Option<&mut District> {
        self.districts.iter_mut().find(|d| d.pos == pos)
    }

    /// # Errors
    ///
    /// Returns `SimError::UnknownDistrict` when `pos` is off the grid.
    pub fn require_district_mut(&mut self, pos: DistrictPos) -> Result<&mut District, SimError> {
        self.district_mut(pos).ok_or(SimError::UnknownDistrict(pos))
    }

    /// District currently holding the player, if any.
    #[must_use]
    pub fn player_district(&self) -> Option<DistrictPos> {
        self.districts.iter().find(|d| d.has_player()).map(|d| d.pos)
    }

    #[must_use]
    pub fn neighbours(&self, pos: DistrictPos) -> Vec<DistrictPos> {
        self.districts
            .iter()
            .map(|d| d.pos)
            .filter(|p| p.is_neighbour_of(pos))
            .collect()
    }

    /// Highest actor id anywhere in the world.
    #[must_use]
    pub fn max_actor_id(&self) -> Option<ActorId> {
        self.districts
            .iter()
            .flat_map(District::maps)
            .flat_map(|m| m.actors.iter().map(|a| a.id).chain(m.corpses.iter().map(|c| c.dead_guy.id)))
            .max()
    }

    /// Stable digest of the serialized world, for determinism checks.
    #[must_use]
    pub fn state_digest(&self) -> u64 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&bytes);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_neighbours() {
        let world = World::new(3, 3, 4, 4);
        assert_eq!(world.districts.len(), 9);
        assert_eq!(world.neighbours(DistrictPos::new(1, 1)).len(), 8);
        assert_eq!(world.neighbours(DistrictPos::new(0, 0)).len(), 3);
        assert!(world.district(DistrictPos::new(5, 5)).is_none());
    }

    #[test]
    fn subway_only_on_the_middle_row() {
        let world = World::new(2, 3, 4, 4);
        let with_subway: Vec<_> = world
            .districts
            .iter()
            .filter(|d| d.subway.is_some())
            .map(|d| d.pos.y)
            .collect();
        assert_eq!(with_subway, vec![1, 1]);
        let district = world.district(DistrictPos::new(0, 1)).expect("district");
        assert_eq!(district.maps().count(), 3);
    }

    #[test]
    fn digest_tracks_state() {
        let mut world = World::new(1, 1, 4, 4);
        let before = world.state_digest();
        assert_eq!(before, World::new(1, 1, 4, 4).state_digest());
        world.time.advance();
        assert_ne!(before, world.state_digest());
    }
}
