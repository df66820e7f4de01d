//! Toy world generator for soak runs.
//!
//! Lays out a grid of districts, drops a few walled blocks and cars on each
//! street level, scatters a seeded mix of living and undead NPCs and puts
//! the player in the middle district.
use anyhow::{Context, Result, anyhow};
use gravetide_sim::{
    Actor, ActorId, Controller, Dice, DiceRoller, District, DistrictPos, Item, Map, MapObject,
    ModelCatalog, ModelId, Point, StreamId, Tile, World,
};

use super::brains::{Idler, TesterControllers};

pub const PLAYER_ID: ActorId = ActorId(1);

const STREET_MIX: [ModelId; 8] = [
    ModelId::Civilian,
    ModelId::Civilian,
    ModelId::Policeman,
    ModelId::Survivor,
    ModelId::Zombie,
    ModelId::Zombie,
    ModelId::Skeleton,
    ModelId::ZombieMaster,
];

/// Shape of the generated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldShape {
    /// Districts per side.
    pub size: i32,
    pub map_size: i32,
    pub npcs_per_district: u32,
}

impl Default for WorldShape {
    fn default() -> Self {
        Self {
            size: 3,
            map_size: 24,
            npcs_per_district: 10,
        }
    }
}

impl WorldShape {
    #[must_use]
    pub const fn home(self) -> DistrictPos {
        DistrictPos::new(self.size / 2, self.size / 2)
    }
}

struct Builder<'a> {
    catalog: &'a ModelCatalog,
    controllers: &'a TesterControllers,
    dice: DiceRoller,
    next_id: u64,
}

impl Builder<'_> {
    fn spawn(&mut self, map: &mut Map, model: ModelId) -> Result<()> {
        let model = self
            .catalog
            .require(model)
            .with_context(|| format!("missing model {model:?}"))?
            .clone();
        for _ in 0..64 {
            let p = Point::new(self.dice.roll(1, map.width - 1), self.dice.roll(1, map.height - 1));
            if !map.is_free(p) {
                continue;
            }
            let controller = if matches!(model.id, ModelId::Rat) {
                Controller::ai(Idler)
            } else {
                Controller::ai(self.controllers.roamer())
            };
            let mut actor = Actor::new(ActorId(self.next_id), model, p).with_controller(controller);
            if matches!(actor.model.id, ModelId::Policeman) {
                actor
                    .inventory
                    .add(Item::pistol().equip())
                    .map_err(|item| anyhow!("no room for {} on a fresh policeman", item.name))?;
            }
            self.next_id += 1;
            map.place_actor(actor)
                .with_context(|| format!("placing actor at {p:?}"))?;
            return Ok(());
        }
        log::debug!("no room left on {} for {:?}", map.name, model.id);
        Ok(())
    }

    fn block(&mut self, map: &mut Map) -> Result<()> {
        let w = self.dice.roll(3, 6);
        let h = self.dice.roll(3, 6);
        let x0 = self.dice.roll(1, (map.width - w - 1).max(2));
        let y0 = self.dice.roll(1, (map.height - h - 1).max(2));
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                let edge = x == x0 || y == y0 || x == x0 + w - 1 || y == y0 + h - 1;
                let p = Point::new(x, y);
                if edge && map.in_bounds(p) && map.actor_at(p).is_none() {
                    map.set_tile(p, Tile::wall())
                        .with_context(|| format!("walling {p:?}"))?;
                }
            }
        }
        let door = Point::new(x0 + w / 2, y0 + h - 1);
        if map.in_bounds(door) && map.actor_at(door).is_none() {
            map.set_tile(door, Tile::floor(false))
                .with_context(|| format!("door at {door:?}"))?;
            map.objects.insert(door, MapObject::wooden_door());
        }
        Ok(())
    }

    fn district(&mut self, district: &mut District, npcs: u32) -> Result<()> {
        for _ in 0..2 {
            self.block(&mut district.entry)?;
        }
        let car = Point::new(self.dice.roll(1, district.entry.width - 1), 1);
        if district.entry.is_free(car) {
            district.entry.objects.insert(car, MapObject::car());
        }
        for _ in 0..npcs {
            let pick = self.dice.pick_index(STREET_MIX.len()).unwrap_or(0);
            self.spawn(&mut district.entry, STREET_MIX[pick])?;
        }
        self.spawn(&mut district.sewers, ModelId::Rat)?;
        self.spawn(&mut district.sewers, ModelId::SewersThing)?;
        if let Some(subway) = district.subway.as_mut() {
            self.spawn(subway, ModelId::Civilian)?;
        }
        Ok(())
    }
}

/// Generate a world for `seed`.
///
/// # Errors
///
/// Fails if a model is missing from the catalog or the player cannot be
/// placed.
pub fn build_world(shape: WorldShape, seed: u64, controllers: &TesterControllers) -> Result<World> {
    let mut world = World::new(shape.size, shape.size, shape.map_size, shape.map_size);
    let mut builder = Builder {
        catalog: ModelCatalog::default_catalog(),
        controllers,
        dice: DiceRoller::for_stream(seed, StreamId::Generator),
        next_id: PLAYER_ID.0 + 1,
    };

    let home = shape.home();
    let player_model = builder
        .catalog
        .require(ModelId::Survivor)
        .context("missing player model")?
        .clone();
    let centre = Point::new(shape.map_size / 2, shape.map_size / 2);
    let mut player = Actor::new(PLAYER_ID, player_model, centre).with_controller(Controller::Player);
    for item in [Item::pistol().equip(), Item::grenade()] {
        player
            .inventory
            .add(item)
            .map_err(|item| anyhow!("no room for {} on the player", item.name))?;
    }
    world
        .district_mut(home)
        .with_context(|| format!("home district {home:?} off the grid"))?
        .entry
        .place_actor(player)
        .context("placing the player")?;

    for district in &mut world.districts {
        builder.district(district, shape.npcs_per_district)?;
    }
    log::info!(
        "generated {}x{} world for seed {seed} with {} actors",
        shape.size,
        shape.size,
        builder.next_id - 1
    );
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_lands_in_the_home_district() {
        let shape = WorldShape::default();
        let world = build_world(shape, 7, &TesterControllers::default()).expect("world");
        assert_eq!(world.player_district(), Some(shape.home()));
        assert_eq!(world.districts.len(), 9);
    }

    #[test]
    fn same_seed_same_world() {
        let shape = WorldShape::default();
        let a = build_world(shape, 11, &TesterControllers::default()).expect("world");
        let b = build_world(shape, 11, &TesterControllers::default()).expect("world");
        assert_eq!(a.state_digest(), b.state_digest());
    }
}
