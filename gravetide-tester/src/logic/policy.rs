use gravetide_sim::geometry::{grid_distance, is_adjacent};
use gravetide_sim::{Action, Actor, Dice, DiceRoller, Direction, FireMode, Map, StreamId};

/// Automated stand-in for the human at the keyboard.
pub trait PlayerPolicy {
    fn name(&self) -> &'static str;

    /// Pick the player's next action. Refused actions are replaced by a wait.
    fn pick_action(&mut self, map: &Map, player: &Actor) -> Action;
}

/// Built-in player strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStrategy {
    /// Stays put, sleeps when sleepy, only fights what is adjacent.
    Turtle,
    /// Hunts the nearest undead with every weapon it has.
    Hunter,
    /// Random walk.
    Drifter,
}

impl PlayerStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Turtle => "turtle",
            Self::Hunter => "hunter",
            Self::Drifter => "drifter",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        let dice = DiceRoller::for_stream(seed ^ 0x504c_4159, StreamId::Generator);
        match self {
            Self::Turtle => Box::new(TurtlePolicy),
            Self::Hunter => Box::new(HunterPolicy),
            Self::Drifter => Box::new(DrifterPolicy { dice }),
        }
    }
}

fn adjacent_enemy<'a>(map: &'a Map, me: &Actor) -> Option<&'a Actor> {
    map.actors
        .iter()
        .find(|other| other.is_enemy_of(me) && is_adjacent(other.position, me.position))
}

struct TurtlePolicy;

impl PlayerPolicy for TurtlePolicy {
    fn name(&self) -> &'static str {
        "turtle"
    }

    fn pick_action(&mut self, map: &Map, player: &Actor) -> Action {
        if let Some(enemy) = adjacent_enemy(map, player) {
            return Action::MeleeAttack(enemy.id);
        }
        if player.is_sleepy() {
            return Action::StartSleeping;
        }
        Action::Wait
    }
}

struct HunterPolicy;

impl PlayerPolicy for HunterPolicy {
    fn name(&self) -> &'static str {
        "hunter"
    }

    fn pick_action(&mut self, map: &Map, player: &Actor) -> Action {
        if let Some(enemy) = adjacent_enemy(map, player) {
            return Action::MeleeAttack(enemy.id);
        }
        let Some(target) = map
            .actors
            .iter()
            .filter(|other| other.is_undead())
            .min_by_key(|other| (grid_distance(other.position, player.position), other.id))
        else {
            return if player.is_sleepy() {
                Action::StartSleeping
            } else {
                Action::Wait
            };
        };
        let crowd = map
            .actors
            .iter()
            .filter(|other| other.is_undead() && grid_distance(other.position, target.position) <= 1)
            .count();
        if crowd >= 3 && grid_distance(player.position, target.position) > 2 {
            return Action::ThrowExplosive {
                target: target.position,
            };
        }
        if player.inventory.equipped_ranged_index().is_some() {
            return Action::RangedAttack {
                target: target.id,
                mode: FireMode::Default,
            };
        }
        Direction::between(player.position, target.position).map_or(Action::Wait, Action::Step)
    }
}

struct DrifterPolicy {
    dice: DiceRoller,
}

impl PlayerPolicy for DrifterPolicy {
    fn name(&self) -> &'static str {
        "drifter"
    }

    fn pick_action(&mut self, map: &Map, player: &Actor) -> Action {
        if self.dice.roll_chance(5) {
            return Action::ToggleRunning;
        }
        let steps: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|dir| map.is_free(player.position.offset(*dir)))
            .collect();
        self.dice
            .pick_index(steps.len())
            .map_or(Action::Shout, |i| Action::Step(steps[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravetide_sim::{ActorId, DistrictPos, MapKind, ModelCatalog, ModelId, Point};

    fn actor(id: u64, model: ModelId, pos: Point) -> Actor {
        let model = ModelCatalog::default_catalog()
            .require(model)
            .expect("model")
            .clone();
        Actor::new(ActorId(id), model, pos)
    }

    #[test]
    fn hunter_walks_towards_the_nearest_undead() {
        let mut map = Map::new("p", MapKind::Entry, DistrictPos::new(0, 0), 10, 10);
        map.place_actor(actor(1, ModelId::Survivor, Point::new(1, 1)))
            .expect("placed");
        map.place_actor(actor(2, ModelId::Zombie, Point::new(5, 5)))
            .expect("placed");
        map.place_actor(actor(3, ModelId::Zombie, Point::new(9, 1)))
            .expect("placed");
        let player = map.actor(ActorId(1)).expect("player");
        let action = PlayerStrategy::Hunter
            .create_policy(1)
            .pick_action(&map, player);
        assert_eq!(action, Action::Step(Direction::SE));
    }

    #[test]
    fn turtle_fights_back_when_cornered() {
        let mut map = Map::new("p", MapKind::Entry, DistrictPos::new(0, 0), 10, 10);
        map.place_actor(actor(1, ModelId::Survivor, Point::new(1, 1)))
            .expect("placed");
        map.place_actor(actor(2, ModelId::Zombie, Point::new(2, 2)))
            .expect("placed");
        let player = map.actor(ActorId(1)).expect("player");
        let action = PlayerStrategy::Turtle
            .create_policy(1)
            .pick_action(&map, player);
        assert_eq!(action, Action::MeleeAttack(ActorId(2)));
    }
}
