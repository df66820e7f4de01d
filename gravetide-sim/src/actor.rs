//! Actors: the player, NPCs and undead living on a map.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::constants::{
    FOOD_HUNGRY_LEVEL, ROT_HUNGRY_LEVEL, SANITY_DISTURBED_LEVEL, SKILL_TOUGHNESS_HP_BONUS,
    SLEEP_SLEEPY_LEVEL, STAMINA_INFINITE, STAMINA_MIN_FOR_ACTIVITY,
};
use crate::controller::Controller;
use crate::geometry::Point;
use crate::items::Inventory;
use crate::models::{ActorModel, Faction};
use crate::progression::{Skill, SkillSet};

/// Stable identity of an actor, unique for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub model: ActorModel,
    pub position: Point,
    #[serde(skip)]
    pub controller: Controller,
    pub action_points: i32,
    pub stamina: i32,
    pub hit_points: i32,
    pub food: i32,
    pub sleep: i32,
    pub sanity: i32,
    pub infection: i32,
    pub leader: Option<ActorId>,
    pub followers: Vec<ActorId>,
    pub trust_in_leader: i32,
    /// Original actor id of the corpse being dragged.
    pub dragged_corpse: Option<ActorId>,
    pub inventory: Inventory,
    pub kills: i32,
    pub murders: i32,
    pub is_sleeping: bool,
    pub is_running: bool,
    pub is_dead: bool,
    pub skills: SkillSet,
    /// Actors this one attacked without being an enemy.
    pub aggressor_of: BTreeSet<ActorId>,
    /// Actors this one may fight back against.
    pub self_defence_from: BTreeSet<ActorId>,
}

impl Actor {
    /// A fresh actor with every gauge at its model maximum.
    #[must_use]
    pub fn new(id: ActorId, model: ActorModel, position: Point) -> Self {
        let stamina = if model.abilities.can_tire {
            model.max_stamina
        } else {
            STAMINA_INFINITE
        };
        Self {
            id,
            name: model.name.clone(),
            action_points: model.speed,
            stamina,
            hit_points: model.max_hp,
            food: model.max_food,
            sleep: model.max_sleep,
            sanity: model.max_sanity,
            infection: 0,
            model,
            position,
            controller: Controller::None,
            leader: None,
            followers: Vec::new(),
            trust_in_leader: 0,
            dragged_corpse: None,
            inventory: Inventory::default(),
            kills: 0,
            murders: 0,
            is_sleeping: false,
            is_running: false,
            is_dead: false,
            skills: SkillSet::default(),
            aggressor_of: BTreeSet::new(),
            self_defence_from: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_controller(mut self, controller: Controller) -> Self {
        self.controller = controller;
        self
    }

    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self.controller, Controller::Player)
    }

    #[must_use]
    pub const fn is_undead(&self) -> bool {
        self.model.abilities.is_undead
    }

    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.model.faction
    }

    #[must_use]
    pub const fn is_enemy_of(&self, other: &Self) -> bool {
        self.model.faction.is_enemy_of(other.model.faction)
    }

    #[must_use]
    pub fn max_hp(&self) -> i32 {
        let toughness = self.skills.level(Skill::Toughness) + self.skills.level(Skill::ZToughness);
        self.model.max_hp + SKILL_TOUGHNESS_HP_BONUS * toughness
    }

    #[must_use]
    pub const fn max_stamina(&self) -> i32 {
        if self.model.abilities.can_tire {
            self.model.max_stamina
        } else {
            STAMINA_INFINITE
        }
    }

    /// True when the actor is too winded for running or hard blows.
    #[must_use]
    pub const fn is_tired(&self) -> bool {
        self.model.abilities.can_tire && self.stamina < STAMINA_MIN_FOR_ACTIVITY
    }

    #[must_use]
    pub const fn is_hungry(&self) -> bool {
        let abilities = self.model.abilities;
        if abilities.has_to_eat {
            self.food <= FOOD_HUNGRY_LEVEL
        } else if abilities.is_rotting {
            self.food <= ROT_HUNGRY_LEVEL
        } else {
            false
        }
    }

    #[must_use]
    pub const fn is_starving(&self) -> bool {
        (self.model.abilities.has_to_eat || self.model.abilities.is_rotting) && self.food <= 0
    }

    #[must_use]
    pub const fn is_sleepy(&self) -> bool {
        self.model.abilities.has_to_sleep && self.sleep <= SLEEP_SLEEPY_LEVEL
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.model.abilities.has_to_sleep && self.sleep <= 0
    }

    #[must_use]
    pub const fn is_insane(&self) -> bool {
        self.model.abilities.has_sanity && self.sanity <= 0
    }

    #[must_use]
    pub const fn is_disturbed(&self) -> bool {
        self.model.abilities.has_sanity && self.sanity <= SANITY_DISTURBED_LEVEL
    }

    #[must_use]
    pub const fn is_infected(&self) -> bool {
        self.model.abilities.can_be_infected && self.infection > 0
    }

    /// Whether this actor is bonded to `other` through leadership with enough trust.
    #[must_use]
    pub fn has_bond_with(&self, other: &Self) -> bool {
        let threshold = crate::constants::TRUST_BOND_THRESHOLD;
        (self.leader == Some(other.id) && self.trust_in_leader >= threshold)
            || (other.leader == Some(self.id) && other.trust_in_leader >= threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelCatalog, ModelId};

    fn actor(model: ModelId) -> Actor {
        let model = ModelCatalog::default_catalog()
            .require(model)
            .expect("model")
            .clone();
        Actor::new(ActorId(1), model, Point::new(0, 0))
    }

    #[test]
    fn new_actor_starts_full() {
        let civ = actor(ModelId::Civilian);
        assert_eq!(civ.hit_points, civ.max_hp());
        assert_eq!(civ.action_points, civ.model.speed);
        assert_eq!(civ.stamina, civ.model.max_stamina);
        assert!(!civ.is_hungry());
        assert!(!civ.is_player());
    }

    #[test]
    fn undead_never_tire() {
        let zombie = actor(ModelId::Zombie);
        assert_eq!(zombie.stamina, STAMINA_INFINITE);
        assert_eq!(zombie.max_stamina(), STAMINA_INFINITE);
        assert!(!zombie.is_tired());
        assert!(!zombie.is_insane());
    }

    #[test]
    fn toughness_raises_max_hp() {
        let mut civ = actor(ModelId::Civilian);
        let base = civ.max_hp();
        civ.skills.raise(Skill::Toughness);
        assert_eq!(civ.max_hp(), base + SKILL_TOUGHNESS_HP_BONUS);
    }

    #[test]
    fn gauge_thresholds() {
        let mut civ = actor(ModelId::Civilian);
        civ.food = FOOD_HUNGRY_LEVEL;
        civ.sleep = 0;
        civ.sanity = 0;
        assert!(civ.is_hungry());
        assert!(civ.is_exhausted());
        assert!(civ.is_insane());
        assert!(civ.is_disturbed());
        assert!(!civ.is_starving());
        civ.food = 0;
        assert!(civ.is_starving());
    }

    #[test]
    fn display_id() {
        assert_eq!(ActorId(7).to_string(), "#7");
    }
}
