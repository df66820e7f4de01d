//! A single map: tiles, actors, ground items, objects, corpses, scents and
//! timers, with its own local clock.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

use crate::actor::{Actor, ActorId};
use crate::clock::WorldTime;
use crate::constants::CORPSE_CONDITION_PER_HP;
use crate::error::SimError;
use crate::geometry::{Point, trace_line};
use crate::items::{Inventory, Item};
use crate::numbers::i32_to_index;
use crate::scent::{OdorKind, ScentField, scent_decay_rate};
use crate::weather::Weather;
use crate::world::DistrictPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    Entry,
    Sewers,
    Subway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lighting {
    /// Follows the day/night cycle.
    Outside,
    Darkness,
    Lit,
}

impl MapKind {
    #[must_use]
    pub const fn default_lighting(self) -> Lighting {
        match self {
            Self::Entry => Lighting::Outside,
            Self::Sewers => Lighting::Darkness,
            Self::Subway => Lighting::Lit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decoration {
    Blood,
    Scorch,
    Vomit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub walkable: bool,
    pub transparent: bool,
    pub outside: bool,
    #[serde(default)]
    pub decorations: SmallVec<[Decoration; 2]>,
}

impl Tile {
    #[must_use]
    pub fn floor(outside: bool) -> Self {
        Self {
            walkable: true,
            transparent: true,
            outside,
            decorations: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn wall() -> Self {
        Self {
            walkable: false,
            transparent: false,
            outside: false,
            decorations: SmallVec::new(),
        }
    }
}

/// Furniture, doors, cars and the like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct MapObject {
    pub name: String,
    pub walkable: bool,
    pub transparent: bool,
    /// Hit points for breakable objects, `None` for indestructible ones.
    pub hit_points: Option<i32>,
    #[serde(default)]
    pub breaks_when_fired_through: bool,
    #[serde(default)]
    pub barricade: i32,
    #[serde(default)]
    pub burnable: bool,
    #[serde(default)]
    pub on_fire: bool,
}

impl MapObject {
    #[must_use]
    pub fn window() -> Self {
        Self {
            name: "window".into(),
            walkable: false,
            transparent: true,
            hit_points: Some(2),
            breaks_when_fired_through: true,
            barricade: 0,
            burnable: false,
            on_fire: false,
        }
    }

    #[must_use]
    pub fn wooden_door() -> Self {
        Self {
            name: "wooden door".into(),
            walkable: false,
            transparent: false,
            hit_points: Some(20),
            breaks_when_fired_through: false,
            barricade: 0,
            burnable: true,
            on_fire: false,
        }
    }

    #[must_use]
    pub fn car() -> Self {
        Self {
            name: "wrecked car".into(),
            walkable: false,
            transparent: true,
            hit_points: None,
            breaks_when_fired_through: false,
            barricade: 0,
            burnable: true,
            on_fire: false,
        }
    }

    #[must_use]
    pub const fn is_breakable(&self) -> bool {
        self.hit_points.is_some()
    }

    /// Damage the object; true when it is destroyed. Barricades absorb first.
    pub fn damage(&mut self, amount: i32) -> bool {
        let mut left = amount.max(0);
        if self.barricade > 0 {
            let absorbed = left.min(self.barricade);
            self.barricade -= absorbed;
            left -= absorbed;
        }
        match &mut self.hit_points {
            Some(hp) => {
                *hp -= left;
                *hp <= 0
            }
            None => false,
        }
    }
}

/// Remains of a dead actor.
#[derive(Debug, Serialize, Deserialize)]
pub struct Corpse {
    pub dead_guy: Actor,
    pub hit_points: i32,
    pub max_hit_points: i32,
    pub turn: i32,
    pub position: Point,
    pub dragged_by: Option<ActorId>,
}

impl Corpse {
    #[must_use]
    pub fn new(dead_guy: Actor, turn: i32) -> Self {
        let max_hit_points = dead_guy.max_hp().max(1) * CORPSE_CONDITION_PER_HP;
        let position = dead_guy.position;
        Self {
            dead_guy,
            hit_points: max_hit_points,
            max_hit_points,
            turn,
            position,
            dragged_by: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    RemoveDecoration {
        pos: Point,
        decoration: Decoration,
    },
    ReleaseScent {
        pos: Point,
        odor: OdorKind,
        strength: i32,
    },
}

/// Work scheduled to run when its countdown completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedTask {
    pub turns_left: i32,
    pub kind: TaskKind,
}

impl TimedTask {
    #[must_use]
    pub const fn new(turns_left: i32, kind: TaskKind) -> Self {
        Self { turns_left, kind }
    }

    /// Count down one turn; true once the task is due.
    pub const fn tick(&mut self) -> bool {
        self.turns_left -= 1;
        self.turns_left <= 0
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Map {
    pub name: String,
    pub kind: MapKind,
    pub district: DistrictPos,
    pub width: i32,
    pub height: i32,
    tiles: Vec<Tile>,
    pub lighting: Lighting,
    pub actors: Vec<Actor>,
    /// Actors before this index have had their chance this local turn.
    pub check_next_actor_index: usize,
    #[serde(with = "point_map")]
    pub ground: BTreeMap<Point, Inventory>,
    #[serde(with = "point_map")]
    pub objects: BTreeMap<Point, MapObject>,
    pub corpses: Vec<Corpse>,
    pub scents: ScentField,
    pub timers: Vec<TimedTask>,
    pub local_time: WorldTime,
    /// Ids killed during the current local turn. Cleared when the turn closes.
    pub killed: BTreeSet<ActorId>,
}

impl Map {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MapKind, district: DistrictPos, width: i32, height: i32) -> Self {
        let outside = matches!(kind, MapKind::Entry);
        let count = i32_to_index(width.max(0)) * i32_to_index(height.max(0));
        Self {
            name: name.into(),
            kind,
            district,
            width: width.max(0),
            height: height.max(0),
            tiles: vec![Tile::floor(outside); count],
            lighting: kind.default_lighting(),
            actors: Vec::new(),
            check_next_actor_index: 0,
            ground: BTreeMap::new(),
            objects: BTreeMap::new(),
            corpses: Vec::new(),
            scents: ScentField::new(),
            timers: Vec::new(),
            local_time: WorldTime::default(),
            killed: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }

    fn tile_index(&self, p: Point) -> Option<usize> {
        self.in_bounds(p)
            .then(|| i32_to_index(p.y) * i32_to_index(self.width) + i32_to_index(p.x))
    }

    #[must_use]
    pub fn tile(&self, p: Point) -> Option<&Tile> {
        self.tile_index(p).and_then(|idx| self.tiles.get(idx))
    }

    pub fn tile_mut(&mut self, p: Point) -> Option<&mut Tile> {
        self.tile_index(p).and_then(|idx| self.tiles.get_mut(idx))
    }

    /// # Errors
    ///
    /// Returns `SimError::OutOfBounds` when `p` is not on the map.
    pub fn set_tile(&mut self, p: Point, tile: Tile) -> Result<(), SimError> {
        let slot = self.tile_mut(p).ok_or(SimError::OutOfBounds(p))?;
        *slot = tile;
        Ok(())
    }

    #[must_use]
    pub fn is_outside(&self, p: Point) -> bool {
        self.tile(p).is_some_and(|t| t.outside)
    }

    /// Tile can be stood on, ignoring actors.
    #[must_use]
    pub fn is_walkable(&self, p: Point) -> bool {
        self.tile(p).is_some_and(|t| t.walkable)
            && self.objects.get(&p).is_none_or(|o| o.walkable)
    }

    #[must_use]
    pub fn is_transparent(&self, p: Point) -> bool {
        self.tile(p).is_some_and(|t| t.transparent)
            && self.objects.get(&p).is_none_or(|o| o.transparent)
    }

    /// Walkable and unoccupied.
    #[must_use]
    pub fn is_free(&self, p: Point) -> bool {
        self.is_walkable(p) && self.actor_at(p).is_none()
    }

    /// Every tile between the ends is see-through.
    #[must_use]
    pub fn has_line_of_effect(&self, from: Point, to: Point) -> bool {
        let line = trace_line(from, to);
        line.iter()
            .take(line.len().saturating_sub(1))
            .all(|&p| self.is_transparent(p))
    }

    // Actors ---------------------------------------------------------------

    #[must_use]
    pub fn actor_index(&self, id: ActorId) -> Option<usize> {
        self.actors.iter().position(|a| a.id == id)
    }

    #[must_use]
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| a.id == id)
    }

    #[must_use]
    pub fn actor_at(&self, p: Point) -> Option<&Actor> {
        self.actors.iter().find(|a| a.position == p)
    }

    #[must_use]
    pub fn player(&self) -> Option<&Actor> {
        self.actors.first().filter(|a| a.is_player())
    }

    /// Two distinct actors by id, mutably.
    pub fn actor_pair_mut(&mut self, a: ActorId, b: ActorId) -> Option<(&mut Actor, &mut Actor)> {
        let ia = self.actor_index(a)?;
        let ib = self.actor_index(b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (left, right) = self.actors.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.actors.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    /// Put an actor on the map. The player always goes first in the list.
    ///
    /// # Errors
    ///
    /// Fails when the position is off the map or already occupied.
    pub fn place_actor(&mut self, actor: Actor) -> Result<(), SimError> {
        let pos = actor.position;
        if !self.in_bounds(pos) {
            return Err(SimError::OutOfBounds(pos));
        }
        if self.actor_at(pos).is_some() {
            return Err(SimError::TileOccupied(pos));
        }
        if actor.is_player() {
            self.actors.insert(0, actor);
            if self.check_next_actor_index > 0 {
                self.check_next_actor_index += 1;
            }
        } else {
            self.actors.push(actor);
        }
        Ok(())
    }

    /// Take an actor off the map, keeping the scheduler scan consistent.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownActor` when the id is not on this map.
    pub fn remove_actor(&mut self, id: ActorId) -> Result<Actor, SimError> {
        let idx = self.actor_index(id).ok_or(SimError::UnknownActor(id))?;
        if idx < self.check_next_actor_index {
            self.check_next_actor_index -= 1;
        }
        Ok(self.actors.remove(idx))
    }

    /// # Errors
    ///
    /// Fails when the actor is unknown or the destination is off-map or taken.
    pub fn move_actor(&mut self, id: ActorId, to: Point) -> Result<(), SimError> {
        if !self.in_bounds(to) {
            return Err(SimError::OutOfBounds(to));
        }
        if self.actor_at(to).is_some_and(|a| a.id != id) {
            return Err(SimError::TileOccupied(to));
        }
        let actor = self.actor_mut(id).ok_or(SimError::UnknownActor(id))?;
        actor.position = to;
        Ok(())
    }

    #[must_use]
    pub fn count_undead(&self) -> usize {
        self.actors.iter().filter(|a| a.is_undead()).count()
    }

    #[must_use]
    pub fn count_living(&self) -> usize {
        self.actors.iter().filter(|a| !a.is_undead()).count()
    }

    // Ground items ---------------------------------------------------------

    /// Drop an item; returns it back if the tile is off-map or the stack is full.
    ///
    /// # Errors
    ///
    /// Returns the rejected item.
    pub fn drop_item(&mut self, p: Point, item: Item) -> Result<(), Item> {
        if !self.in_bounds(p) {
            return Err(item);
        }
        self.ground
            .entry(p)
            .or_insert_with(|| Inventory::with_capacity(Inventory::GROUND_CAPACITY))
            .add(item)
    }

    /// # Errors
    ///
    /// Returns `SimError::MissingGroundInventory` when no stack lies at `p`
    /// or the index is past its end.
    pub fn take_ground_item(&mut self, p: Point, index: usize) -> Result<Item, SimError> {
        let stack = self
            .ground
            .get_mut(&p)
            .ok_or(SimError::MissingGroundInventory(p))?;
        let item = stack
            .remove_at(index)
            .ok_or(SimError::MissingGroundInventory(p))?;
        if stack.is_empty() {
            self.ground.remove(&p);
        }
        Ok(item)
    }

    // Decorations and timers -----------------------------------------------

    /// Stain a tile and schedule the stain to fade.
    pub fn add_decoration(&mut self, p: Point, decoration: Decoration, duration: i32) {
        let Some(tile) = self.tile_mut(p) else {
            return;
        };
        if tile.decorations.contains(&decoration) {
            return;
        }
        tile.decorations.push(decoration);
        self.timers.push(TimedTask::new(
            duration,
            TaskKind::RemoveDecoration {
                pos: p,
                decoration,
            },
        ));
    }

    pub fn remove_decoration(&mut self, p: Point, decoration: Decoration) {
        if let Some(tile) = self.tile_mut(p) {
            tile.decorations.retain(|d| *d != decoration);
        }
    }

    // Scents ---------------------------------------------------------------

    /// Decay every scent at its tile's rate, then drop the exhausted ones.
    pub fn decay_scents(&mut self, weather: Weather) {
        let kind = self.kind;
        let width = self.width;
        let height = self.height;
        let tiles = &self.tiles;
        self.scents.decay(|p| {
            let in_bounds = p.x >= 0 && p.y >= 0 && p.x < width && p.y < height;
            let outside = in_bounds
                && tiles
                    .get(i32_to_index(p.y) * i32_to_index(width) + i32_to_index(p.x))
                    .is_some_and(|t| t.outside);
            scent_decay_rate(kind, outside, weather)
        });
        self.scents.prune();
    }

    // Corpses --------------------------------------------------------------

    pub fn add_corpse(&mut self, corpse: Corpse) {
        self.corpses.push(corpse);
    }

    #[must_use]
    pub fn corpse_index_of(&self, dead_guy: ActorId) -> Option<usize> {
        self.corpses.iter().position(|c| c.dead_guy.id == dead_guy)
    }
}

/// Point-keyed maps serialize as pair lists so JSON keys stay strings.
mod point_map {
    use super::Point;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, V>(map: &BTreeMap<Point, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<Point, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        let pairs = Vec::<(Point, V)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::models::{ModelCatalog, ModelId};

    fn map() -> Map {
        Map::new("test", MapKind::Entry, DistrictPos::new(0, 0), 8, 8)
    }

    fn actor(id: u64, model: ModelId, pos: Point) -> Actor {
        let model = ModelCatalog::default_catalog()
            .require(model)
            .expect("model")
            .clone();
        Actor::new(ActorId(id), model, pos)
    }

    #[test]
    fn one_actor_per_tile() {
        let mut map = map();
        map.place_actor(actor(1, ModelId::Civilian, Point::new(1, 1)))
            .expect("placed");
        let err = map
            .place_actor(actor(2, ModelId::Zombie, Point::new(1, 1)))
            .unwrap_err();
        assert_eq!(err, SimError::TileOccupied(Point::new(1, 1)));
        assert_eq!(
            map.place_actor(actor(3, ModelId::Zombie, Point::new(9, 9))),
            Err(SimError::OutOfBounds(Point::new(9, 9)))
        );
    }

    #[test]
    fn player_is_kept_first_and_scan_index_follows() {
        let mut map = map();
        map.place_actor(actor(1, ModelId::Zombie, Point::new(1, 1)))
            .expect("placed");
        map.place_actor(actor(2, ModelId::Zombie, Point::new(2, 1)))
            .expect("placed");
        map.check_next_actor_index = 1;
        let player = actor(3, ModelId::Civilian, Point::new(3, 3)).with_controller(Controller::Player);
        map.place_actor(player).expect("placed");
        assert_eq!(map.player().map(|a| a.id), Some(ActorId(3)));
        assert_eq!(map.check_next_actor_index, 2);
        map.remove_actor(ActorId(3)).expect("removed");
        assert_eq!(map.check_next_actor_index, 1);
        assert!(matches!(
            map.remove_actor(ActorId(3)),
            Err(SimError::UnknownActor(ActorId(3)))
        ));
    }

    #[test]
    fn ground_stacks_are_removed_when_emptied() {
        let mut map = map();
        let p = Point::new(2, 2);
        map.drop_item(p, Item::grenade()).expect("dropped");
        assert!(map.take_ground_item(p, 0).is_ok());
        assert!(!map.ground.contains_key(&p));
        assert_eq!(
            map.take_ground_item(p, 0).map(|i| i.name),
            Err(SimError::MissingGroundInventory(p))
        );
    }

    #[test]
    fn objects_block_and_barricades_absorb() {
        let mut map = map();
        let p = Point::new(4, 4);
        map.objects.insert(p, MapObject::wooden_door());
        assert!(!map.is_walkable(p));
        assert!(!map.has_line_of_effect(Point::new(2, 4), Point::new(6, 4)));
        let door = map.objects.get_mut(&p).expect("door");
        door.barricade = 5;
        assert!(!door.damage(5));
        assert_eq!(door.hit_points, Some(20));
        assert!(door.damage(20));
    }

    #[test]
    fn rain_washes_outside_scents_faster() {
        let mut map = map();
        let outside = Point::new(1, 1);
        let inside = Point::new(2, 2);
        map.set_tile(inside, Tile::floor(false)).expect("tile");
        map.scents.refresh_at(outside, OdorKind::Living, 10);
        map.scents.refresh_at(inside, OdorKind::Living, 10);
        map.decay_scents(Weather::HeavyRain);
        assert_eq!(map.scents.scent_at(outside, OdorKind::Living), 7);
        assert_eq!(map.scents.scent_at(inside, OdorKind::Living), 9);
    }

    #[test]
    fn decorations_schedule_their_removal() {
        let mut map = map();
        let p = Point::new(1, 2);
        map.add_decoration(p, Decoration::Blood, 3);
        map.add_decoration(p, Decoration::Blood, 3);
        assert_eq!(map.timers.len(), 1);
        assert_eq!(map.tile(p).map(|t| t.decorations.len()), Some(1));
    }
}
