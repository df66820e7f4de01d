//! Data-driven actor templates and faction relations.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::SimError;
use crate::progression::Skill;

const DEFAULT_MODEL_DATA: &str = include_str!("../assets/actor_models.json");

/// Identifier of an actor template in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    Civilian,
    Policeman,
    Soldier,
    BlackOps,
    Biker,
    Gangsta,
    Survivor,
    Skeleton,
    RedEyedSkeleton,
    RedSkeleton,
    Zombie,
    DarkEyedZombie,
    DarkZombie,
    ZombieMaster,
    ZombieLord,
    ZombifiedCivilian,
    NeoZombie,
    SewersThing,
    Rat,
}

impl ModelId {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Civilian => "civilian",
            Self::Policeman => "policeman",
            Self::Soldier => "soldier",
            Self::BlackOps => "black_ops",
            Self::Biker => "biker",
            Self::Gangsta => "gangsta",
            Self::Survivor => "survivor",
            Self::Skeleton => "skeleton",
            Self::RedEyedSkeleton => "red_eyed_skeleton",
            Self::RedSkeleton => "red_skeleton",
            Self::Zombie => "zombie",
            Self::DarkEyedZombie => "dark_eyed_zombie",
            Self::DarkZombie => "dark_zombie",
            Self::ZombieMaster => "zombie_master",
            Self::ZombieLord => "zombie_lord",
            Self::ZombifiedCivilian => "zombified_civilian",
            Self::NeoZombie => "neo_zombie",
            Self::SewersThing => "sewers_thing",
            Self::Rat => "rat",
        }
    }
}

/// Allegiance of an actor. Enmity is symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Civilians,
    Police,
    Army,
    BlackOps,
    Bikers,
    Gangstas,
    Survivors,
    Undead,
}

impl Faction {
    #[must_use]
    pub const fn is_undead(self) -> bool {
        matches!(self, Self::Undead)
    }

    #[must_use]
    pub const fn is_enemy_of(self, other: Self) -> bool {
        Self::hates(self, other) || Self::hates(other, self)
    }

    const fn hates(a: Self, b: Self) -> bool {
        match (a, b) {
            (Self::Undead, Self::Undead) => false,
            (Self::Undead, _) => true,
            (Self::Police, Self::Bikers | Self::Gangstas) => true,
            (Self::Army, Self::Bikers | Self::Gangstas | Self::BlackOps) => true,
            (Self::BlackOps, other) => !matches!(other, Self::BlackOps),
            (Self::Bikers, Self::Gangstas) => true,
            _ => false,
        }
    }
}

/// Capability flags of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Abilities {
    pub is_undead: bool,
    pub is_undead_master: bool,
    pub can_tire: bool,
    pub has_to_eat: bool,
    pub is_rotting: bool,
    pub has_to_sleep: bool,
    pub has_sanity: bool,
    pub can_be_infected: bool,
    pub can_run: bool,
    pub can_zombify_killed: bool,
    pub can_be_upgraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attack {
    pub hit: i32,
    pub damage: i32,
    #[serde(default)]
    pub stamina_penalty: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Defence {
    pub value: i32,
    #[serde(default)]
    pub protection_hit: i32,
    #[serde(default)]
    pub protection_shot: i32,
}

/// Template an actor is instantiated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorModel {
    pub id: ModelId,
    pub name: String,
    pub faction: Faction,
    #[serde(default)]
    pub abilities: Abilities,
    pub speed: i32,
    pub max_hp: i32,
    pub max_stamina: i32,
    #[serde(default)]
    pub max_food: i32,
    #[serde(default)]
    pub max_sleep: i32,
    #[serde(default)]
    pub max_sanity: i32,
    #[serde(default)]
    pub max_infection: i32,
    pub attack: Attack,
    pub defence: Defence,
    /// Infection points inflicted per point of damage.
    #[serde(default)]
    pub infection_per_damage: i32,
    #[serde(default)]
    pub evolves_into: Option<ModelId>,
    #[serde(default)]
    pub evolution_kills: i32,
    #[serde(default)]
    pub zombifies_into: Option<ModelId>,
    #[serde(default)]
    pub upgrade_skills: Vec<Skill>,
}

impl ActorModel {
    #[must_use]
    pub const fn is_undead(&self) -> bool {
        self.abilities.is_undead
    }
}

/// Catalog of actor templates, usually the embedded default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub models: Vec<ActorModel>,
}

impl ModelCatalog {
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_MODEL_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<ModelCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a model catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn get(&self, id: ModelId) -> Option<&ActorModel> {
        self.models.iter().find(|model| model.id == id)
    }

    /// # Errors
    ///
    /// Returns `SimError::MissingModel` when `id` has no entry.
    pub fn require(&self, id: ModelId) -> Result<&ActorModel, SimError> {
        self.get(id)
            .ok_or_else(|| SimError::MissingModel(id.key().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_covers_every_model() {
        let catalog = ModelCatalog::default_catalog();
        for id in [
            ModelId::Civilian,
            ModelId::Policeman,
            ModelId::Soldier,
            ModelId::BlackOps,
            ModelId::Biker,
            ModelId::Gangsta,
            ModelId::Survivor,
            ModelId::Skeleton,
            ModelId::RedEyedSkeleton,
            ModelId::RedSkeleton,
            ModelId::Zombie,
            ModelId::DarkEyedZombie,
            ModelId::DarkZombie,
            ModelId::ZombieMaster,
            ModelId::ZombieLord,
            ModelId::ZombifiedCivilian,
            ModelId::NeoZombie,
            ModelId::SewersThing,
            ModelId::Rat,
        ] {
            let model = catalog.require(id).expect("model present");
            assert_eq!(model.id.key(), id.key());
            assert!(model.max_hp > 0);
        }
    }

    #[test]
    fn evolution_targets_exist() {
        let catalog = ModelCatalog::default_catalog();
        for model in &catalog.models {
            if let Some(next) = model.evolves_into {
                assert!(catalog.get(next).is_some(), "{:?} evolves into missing", model.id);
                assert!(model.evolution_kills > 0);
            }
            if let Some(z) = model.zombifies_into {
                assert!(catalog.require(z).expect("zombie model").is_undead());
            }
        }
    }

    #[test]
    fn factions_are_symmetric_enemies() {
        assert!(Faction::Undead.is_enemy_of(Faction::Civilians));
        assert!(Faction::Civilians.is_enemy_of(Faction::Undead));
        assert!(Faction::Bikers.is_enemy_of(Faction::Police));
        assert!(Faction::Civilians.is_enemy_of(Faction::BlackOps));
        assert!(!Faction::Civilians.is_enemy_of(Faction::Police));
        assert!(!Faction::Undead.is_enemy_of(Faction::Undead));
        assert!(!Faction::BlackOps.is_enemy_of(Faction::BlackOps));
    }

    #[test]
    fn missing_model_is_an_error() {
        let empty = ModelCatalog::default();
        assert_eq!(
            empty.require(ModelId::Rat),
            Err(SimError::MissingModel("rat".into()))
        );
    }
}
