use gravetide_sim::geometry::{grid_distance, is_adjacent};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use gravetide_sim::{
    Action, Actor, ActorBrain, ActorModel, ActorView, Controller, ControllerFactory, Dice,
    Direction, FireMode, Map, Orderable, Point, RaidType, SpawnRole, check_legality,
};

/// How far a roamer notices an enemy.
const SIGHT_RANGE: i32 = 8;

/// Only hands the scheduler actions that pass the legality check.
fn first_legal(map: &Map, me: &Actor, candidates: impl IntoIterator<Item = Action>) -> Action {
    candidates
        .into_iter()
        .find(|action| check_legality(map, me.id, *action).is_ok())
        .unwrap_or(Action::Wait)
}

fn nearest_enemy<'a>(map: &'a Map, me: &Actor) -> Option<&'a Actor> {
    map.actors
        .iter()
        .filter(|other| other.is_enemy_of(me))
        .filter(|other| grid_distance(other.position, me.position) <= SIGHT_RANGE)
        .min_by_key(|other| (grid_distance(other.position, me.position), other.id))
}

fn step_towards(map: &Map, from: Point, to: Point) -> Option<Action> {
    let dir = Direction::between(from, to)?;
    map.is_free(from.offset(dir)).then_some(Action::Step(dir))
}

fn random_step(map: &Map, from: Point, dice: &mut dyn Dice) -> Action {
    let steps: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|dir| map.is_free(from.offset(*dir)))
        .collect();
    dice.pick_index(steps.len())
        .map_or(Action::Wait, |i| Action::Step(steps[i]))
}

/// Generic wandering fighter: strikes adjacent enemies, closes in on the
/// ones it sees and otherwise shuffles around. Remembers the last raid it
/// heard about and heads there when idle.
#[derive(Debug, Default)]
pub struct Roamer {
    rally_point: Option<Point>,
    raids_heard: Arc<AtomicU32>,
}

impl Roamer {
    /// Roamer counting the raids it hears into `raids_heard`.
    #[must_use]
    pub const fn reporting_to(raids_heard: Arc<AtomicU32>) -> Self {
        Self {
            rally_point: None,
            raids_heard,
        }
    }
}

impl ActorBrain for Roamer {
    fn name(&self) -> &'static str {
        "roamer"
    }

    fn get_action(&mut self, view: &ActorView<'_>, dice: &mut dyn Dice) -> Option<Action> {
        let me = view.actor;
        let map = view.map;
        if me.is_sleepy() && !me.is_sleeping && nearest_enemy(map, me).is_none() {
            return Some(first_legal(map, me, [Action::StartSleeping]));
        }
        if let Some(enemy) = nearest_enemy(map, me) {
            let mut candidates = Vec::with_capacity(3);
            if is_adjacent(enemy.position, me.position) {
                candidates.push(Action::MeleeAttack(enemy.id));
            } else {
                candidates.push(Action::RangedAttack {
                    target: enemy.id,
                    mode: FireMode::Default,
                });
                candidates.extend(step_towards(map, me.position, enemy.position));
            }
            return Some(first_legal(map, me, candidates));
        }
        if let Some(rally) = self.rally_point {
            if grid_distance(rally, me.position) <= 1 {
                self.rally_point = None;
            } else if let Some(step) = step_towards(map, me.position, rally) {
                return Some(first_legal(map, me, [step]));
            }
        }
        let wander = random_step(map, me.position, dice);
        Some(first_legal(map, me, [wander]))
    }

    fn as_orderable(&mut self) -> Option<&mut dyn Orderable> {
        Some(self)
    }
}

impl Orderable for Roamer {
    fn on_raid(&mut self, _raid: RaidType, location: Point, _turn: i32) {
        self.raids_heard.fetch_add(1, Ordering::Relaxed);
        self.rally_point = Some(location);
    }
}

/// Static actor that only ever waits. Used for the rats of the sewers so
/// they keep a population without crowding the scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct Idler;

impl ActorBrain for Idler {
    fn name(&self) -> &'static str {
        "idler"
    }

    fn get_action(&mut self, _view: &ActorView<'_>, _dice: &mut dyn Dice) -> Option<Action> {
        Some(Action::Wait)
    }
}

/// Gives every engine-spawned actor a [`Roamer`]. All roamers handed out
/// share one raid counter.
#[derive(Debug, Default, Clone)]
pub struct TesterControllers {
    raids_heard: Arc<AtomicU32>,
}

impl TesterControllers {
    #[must_use]
    pub fn roamer(&self) -> Roamer {
        Roamer::reporting_to(Arc::clone(&self.raids_heard))
    }

    /// Raid notices received by every roamer so far.
    #[must_use]
    pub fn raids_heard(&self) -> u32 {
        self.raids_heard.load(Ordering::Relaxed)
    }
}

impl ControllerFactory for TesterControllers {
    fn controller_for(&self, _model: &ActorModel, _role: SpawnRole) -> Controller {
        Controller::ai(self.roamer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravetide_sim::{ActorId, DistrictPos, MapKind, ModelCatalog, ModelId, ScriptedDice};

    fn actor(id: u64, model: ModelId, pos: Point) -> Actor {
        let model = ModelCatalog::default_catalog()
            .require(model)
            .expect("model")
            .clone();
        Actor::new(ActorId(id), model, pos)
    }

    fn map_with(actors: Vec<Actor>) -> Map {
        let mut map = Map::new("t", MapKind::Entry, DistrictPos::new(0, 0), 12, 12);
        for a in actors {
            map.place_actor(a).expect("placed");
        }
        map
    }

    #[test]
    fn roamer_bites_adjacent_enemy() {
        let map = map_with(vec![
            actor(1, ModelId::Zombie, Point::new(3, 3)),
            actor(2, ModelId::Civilian, Point::new(4, 3)),
        ]);
        let me = map.actor(ActorId(1)).expect("zombie");
        let view = ActorView {
            map: &map,
            actor: me,
            turn: 0,
        };
        let action = Roamer::default().get_action(&view, &mut ScriptedDice::new());
        assert_eq!(action, Some(Action::MeleeAttack(ActorId(2))));
    }

    #[test]
    fn roamer_closes_in_when_it_has_no_gun() {
        let map = map_with(vec![
            actor(1, ModelId::Zombie, Point::new(2, 2)),
            actor(2, ModelId::Civilian, Point::new(6, 2)),
        ]);
        let me = map.actor(ActorId(1)).expect("zombie");
        let view = ActorView {
            map: &map,
            actor: me,
            turn: 0,
        };
        let action = Roamer::default().get_action(&view, &mut ScriptedDice::new());
        assert_eq!(action, Some(Action::Step(Direction::E)));
    }

    #[test]
    fn raid_sets_a_rally_point() {
        let map = map_with(vec![actor(1, ModelId::Civilian, Point::new(2, 2))]);
        let me = map.actor(ActorId(1)).expect("civilian");
        let view = ActorView {
            map: &map,
            actor: me,
            turn: 0,
        };
        let controllers = TesterControllers::default();
        let mut brain = controllers.roamer();
        brain
            .as_orderable()
            .expect("orderable")
            .on_raid(RaidType::Bikers, Point::new(2, 9), 0);
        assert_eq!(controllers.raids_heard(), 1);
        let action = brain.get_action(&view, &mut ScriptedDice::new());
        assert_eq!(action, Some(Action::Step(Direction::S)));
    }
}
