use gravetide_sim::constants::{LOG_EXPLOSION, LOG_UNDEAD_EVOLVED};
use gravetide_sim::{
    Action, ActionOutcome, Actor, ActorBrain, ActorId, ActorIdSource, ActorView, Controller,
    Detail, Dice, DistrictPos, GameMode, Item, Map, MapAdvance, MapKind, ModelCatalog, ModelId,
    Point, ScriptedDice, SimConfig, SimFlags, TurnContext, advance_map, end_turn,
    perform_player_action,
};
use std::sync::Arc;

fn ctx(config: SimConfig, dice: ScriptedDice) -> TurnContext {
    TurnContext::new(
        Arc::new(config),
        Arc::new(ModelCatalog::default_catalog().clone()),
        Box::new(dice),
    )
    .with_ids(ActorIdSource::starting_at(1000))
}

fn actor(id: u64, model: ModelId, pos: Point) -> Actor {
    let model = ModelCatalog::default_catalog()
        .require(model)
        .expect("model in catalog")
        .clone();
    Actor::new(ActorId(id), model, pos)
}

fn street() -> Map {
    Map::new("street", MapKind::Entry, DistrictPos::new(0, 0), 12, 12)
}

/// Always goes for the same victim.
struct Biter(ActorId);

impl ActorBrain for Biter {
    fn name(&self) -> &'static str {
        "biter"
    }

    fn get_action(&mut self, _view: &ActorView<'_>, _dice: &mut dyn Dice) -> Option<Action> {
        Some(Action::MeleeAttack(self.0))
    }
}

#[test]
fn thrown_grenade_goes_off_and_sets_off_its_neighbour() {
    let mut ctx = ctx(SimConfig::default(), ScriptedDice::new());
    let mut map = street();
    let mut thrower = actor(1, ModelId::Civilian, Point::new(2, 5)).with_controller(Controller::Player);
    thrower.inventory.add(Item::grenade()).expect("room");
    map.place_actor(thrower).expect("placed");
    map.place_actor(actor(2, ModelId::Zombie, Point::new(6, 5)))
        .expect("placed");
    map.drop_item(Point::new(5, 6), Item::grenade()).expect("dropped");

    let outcome = perform_player_action(
        &mut ctx,
        &mut map,
        ActorId(1),
        Action::ThrowExplosive {
            target: Point::new(5, 5),
        },
    )
    .expect("thrown");
    assert_eq!(outcome, ActionOutcome::Performed);

    let first = end_turn(&mut ctx, &mut map, Detail::Full).expect("turn");
    assert_eq!(first.detonations, 0);
    let second = end_turn(&mut ctx, &mut map, Detail::Full).expect("turn");
    assert_eq!(second.detonations, 2);
    assert_eq!(ctx.messages.count_key(LOG_EXPLOSION), 2);

    assert!(map.actor(ActorId(2)).is_none());
    assert!(map.actor(ActorId(1)).is_some());
    let primed_left = map
        .ground
        .values()
        .flat_map(|stack| stack.items.iter())
        .chain(map.actors.iter().flat_map(|a| a.inventory.items.iter()))
        .filter(|item| item.fuse_left().is_some_and(|fuse| fuse <= 0))
        .count();
    assert_eq!(primed_left, 0);
}

#[test]
fn ai_bite_on_a_sleeper_turns_the_victim_and_evolves_the_biter() {
    let config = SimConfig {
        mode: GameMode::Standard,
        undead_evolution_day: 0,
        ..SimConfig::default()
    };
    let dice = ScriptedDice::new().with_skill_rolls([5, 0]).with_damage_rolls([20]);
    let mut ctx = ctx(config, dice);
    let mut map = street();
    let mut zombie = actor(1, ModelId::Zombie, Point::new(4, 4)).with_controller(Controller::ai(Biter(ActorId(2))));
    zombie.action_points = 100;
    zombie.kills = 1;
    map.place_actor(zombie).expect("placed");
    let mut sleeper = actor(2, ModelId::Civilian, Point::new(5, 4));
    sleeper.is_sleeping = true;
    map.place_actor(sleeper).expect("placed");

    let advance = advance_map(&mut ctx, &mut map, SimFlags::simulated(Detail::Full)).expect("advance");
    assert!(matches!(advance, MapAdvance::TurnEnded(_)));

    assert!(map.actor(ActorId(2)).is_none());
    let risen = map.actor_at(Point::new(5, 4)).expect("victim turned");
    assert_eq!(risen.model.id, ModelId::ZombifiedCivilian);
    assert!(risen.id.0 >= 1000);
    assert!(map.corpses.is_empty());

    let biter = map.actor(ActorId(1)).expect("biter");
    assert_eq!(biter.kills, 2);
    assert_eq!(biter.murders, 0);
    assert_eq!(biter.model.id, ModelId::DarkEyedZombie);
    assert!(ctx.messages.contains_key(LOG_UNDEAD_EVOLVED));
    assert!(biter.controller.is_ai());
}

#[test]
fn infection_mode_bite_leaves_an_infected_corpse() {
    let config = SimConfig {
        mode: GameMode::CorpsesInfection,
        ..SimConfig::default()
    };
    let dice = ScriptedDice::new().with_skill_rolls([5, 0]).with_damage_rolls([20]);
    let mut ctx = ctx(config, dice);
    let mut map = street();
    let mut zombie = actor(1, ModelId::Zombie, Point::new(4, 4)).with_controller(Controller::ai(Biter(ActorId(2))));
    zombie.action_points = 100;
    map.place_actor(zombie).expect("placed");
    map.place_actor(actor(2, ModelId::Civilian, Point::new(5, 4)))
        .expect("placed");

    advance_map(&mut ctx, &mut map, SimFlags::simulated(Detail::Full)).expect("advance");

    assert_eq!(map.corpses.len(), 1);
    let corpse = &map.corpses[0];
    assert_eq!(corpse.dead_guy.id, ActorId(2));
    assert!(corpse.dead_guy.infection > 0);
    assert!(map.actor_at(Point::new(5, 4)).is_none());
}
