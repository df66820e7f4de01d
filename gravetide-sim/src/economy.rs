//! Gauge arithmetic: every spend and regen goes through these helpers so the
//! bounds `0 <= gauge <= max` hold after each mutation.
use crate::actor::Actor;
use crate::constants::{AP_CARRY_OVER_CAP, BASE_ACTION_COST, RUN_MOVE_COST};
use crate::numbers::scale_pct;

/// Effective speed this turn: exhausted actors move at half speed, sleepy
/// ones at two thirds.
#[must_use]
pub fn actor_speed(actor: &Actor) -> i32 {
    let speed = actor.model.speed;
    if actor.is_exhausted() {
        speed / 2
    } else if actor.is_sleepy() {
        scale_pct(speed, 66)
    } else {
        speed
    }
}

#[must_use]
pub const fn move_cost(actor: &Actor) -> i32 {
    if actor.is_running {
        RUN_MOVE_COST
    } else {
        BASE_ACTION_COST
    }
}

pub fn spend_action_points(actor: &mut Actor, cost: i32) {
    actor.action_points = (actor.action_points - cost.max(0)).max(0);
}

pub fn regen_action_points(actor: &mut Actor) {
    let speed = actor_speed(actor);
    let cap = speed + AP_CARRY_OVER_CAP;
    actor.action_points = (actor.action_points + speed).min(cap).max(0);
}

pub fn spend_stamina(actor: &mut Actor, amount: i32) {
    if !actor.model.abilities.can_tire {
        return;
    }
    actor.stamina = (actor.stamina - amount.max(0)).max(0);
}

pub fn regen_stamina(actor: &mut Actor, amount: i32) {
    if !actor.model.abilities.can_tire {
        return;
    }
    actor.stamina = (actor.stamina + amount.max(0)).min(actor.max_stamina());
}

/// Apply damage; true when the actor is left at 0 HP.
pub fn take_damage(actor: &mut Actor, amount: i32) -> bool {
    actor.hit_points = (actor.hit_points - amount.max(0)).max(0);
    actor.hit_points <= 0
}

pub fn heal(actor: &mut Actor, amount: i32) {
    actor.hit_points = (actor.hit_points + amount.max(0)).min(actor.max_hp());
}

pub fn spend_food(actor: &mut Actor, amount: i32) {
    actor.food = (actor.food - amount.max(0)).max(0);
}

pub fn regen_food(actor: &mut Actor, amount: i32) {
    actor.food = (actor.food + amount.max(0)).min(actor.model.max_food);
}

pub fn spend_sleep(actor: &mut Actor, amount: i32) {
    actor.sleep = (actor.sleep - amount.max(0)).max(0);
}

pub fn regen_sleep(actor: &mut Actor, amount: i32) {
    actor.sleep = (actor.sleep + amount.max(0)).min(actor.model.max_sleep);
}

pub fn spend_sanity(actor: &mut Actor, amount: i32) {
    if !actor.model.abilities.has_sanity {
        return;
    }
    actor.sanity = (actor.sanity - amount.max(0)).max(0);
}

pub fn regen_sanity(actor: &mut Actor, amount: i32) {
    if !actor.model.abilities.has_sanity {
        return;
    }
    actor.sanity = (actor.sanity + amount.max(0)).min(actor.model.max_sanity);
}

pub fn infect(actor: &mut Actor, amount: i32) {
    if !actor.model.abilities.can_be_infected {
        return;
    }
    actor.infection = (actor.infection + amount.max(0)).min(actor.model.max_infection);
}

pub fn cure(actor: &mut Actor, amount: i32) {
    actor.infection = (actor.infection - amount.max(0)).max(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorId;
    use crate::constants::SLEEP_SLEEPY_LEVEL;
    use crate::geometry::Point;
    use crate::models::{ModelCatalog, ModelId};

    fn civilian() -> Actor {
        let model = ModelCatalog::default_catalog()
            .require(ModelId::Civilian)
            .expect("model")
            .clone();
        Actor::new(ActorId(1), model, Point::new(0, 0))
    }

    #[test]
    fn gauges_clamp_at_both_ends() {
        let mut civ = civilian();
        spend_action_points(&mut civ, 1_000);
        assert_eq!(civ.action_points, 0);
        spend_stamina(&mut civ, 1_000);
        assert_eq!(civ.stamina, 0);
        regen_stamina(&mut civ, 1_000);
        assert_eq!(civ.stamina, civ.max_stamina());
        assert!(take_damage(&mut civ, 1_000));
        assert_eq!(civ.hit_points, 0);
        heal(&mut civ, 1_000);
        assert_eq!(civ.hit_points, civ.max_hp());
        infect(&mut civ, 100_000);
        assert_eq!(civ.infection, civ.model.max_infection);
        spend_sanity(&mut civ, 100_000);
        assert_eq!(civ.sanity, 0);
    }

    #[test]
    fn ap_regen_caps_carry_over() {
        let mut civ = civilian();
        for _ in 0..10 {
            regen_action_points(&mut civ);
        }
        assert_eq!(civ.action_points, civ.model.speed + AP_CARRY_OVER_CAP);
    }

    #[test]
    fn tiredness_slows_actors() {
        let mut civ = civilian();
        assert_eq!(actor_speed(&civ), 100);
        civ.sleep = SLEEP_SLEEPY_LEVEL;
        assert_eq!(actor_speed(&civ), 66);
        civ.sleep = 0;
        assert_eq!(actor_speed(&civ), 50);
    }

    #[test]
    fn running_halves_move_cost() {
        let mut civ = civilian();
        assert_eq!(move_cost(&civ), BASE_ACTION_COST);
        civ.is_running = true;
        assert_eq!(move_cost(&civ), RUN_MOVE_COST);
    }
}
