//! Items, inventories and blast tables.
use serde::{Deserialize, Serialize};

use crate::models::Attack;
use crate::scent::OdorKind;

/// Damage profile of an explosive, indexed by distance from ground zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastAttack {
    pub radius: i32,
    pub damage: Vec<i32>,
    #[serde(default)]
    pub can_damage_objects: bool,
}

impl BlastAttack {
    /// Damage dealt at `distance` tiles from ground zero, 0 beyond the radius.
    #[must_use]
    pub fn damage_at(&self, distance: i32) -> i32 {
        if distance < 0 || distance > self.radius {
            return 0;
        }
        usize::try_from(distance)
            .ok()
            .and_then(|idx| self.damage.get(idx))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    MeleeWeapon {
        attack: Attack,
        #[serde(default)]
        fragile: bool,
        #[serde(default)]
        unbreakable: bool,
    },
    RangedWeapon {
        attack: Attack,
        range: i32,
        ammo: i32,
        max_ammo: i32,
        firearm: bool,
    },
    Ammo {
        rounds: i32,
    },
    Explosive {
        blast: BlastAttack,
        fuse: i32,
    },
    PrimedExplosive {
        blast: BlastAttack,
        fuse_left: i32,
    },
    Light {
        batteries: i32,
        max_batteries: i32,
    },
    Tracker {
        batteries: i32,
        max_batteries: i32,
    },
    Armor {
        protection_hit: i32,
        protection_shot: i32,
    },
    Food {
        nutrition: i32,
    },
    Spray {
        odor: OdorKind,
        strength: i32,
        sprays_left: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub equipped: bool,
}

impl Item {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            equipped: false,
        }
    }

    #[must_use]
    pub const fn equip(mut self) -> Self {
        self.equipped = true;
        self
    }

    #[must_use]
    pub fn baseball_bat() -> Self {
        Self::new(
            "baseball bat",
            ItemKind::MeleeWeapon {
                attack: Attack {
                    hit: 2,
                    damage: 4,
                    stamina_penalty: 2,
                },
                fragile: false,
                unbreakable: false,
            },
        )
    }

    #[must_use]
    pub fn kitchen_knife() -> Self {
        Self::new(
            "kitchen knife",
            ItemKind::MeleeWeapon {
                attack: Attack {
                    hit: 1,
                    damage: 3,
                    stamina_penalty: 0,
                },
                fragile: true,
                unbreakable: false,
            },
        )
    }

    #[must_use]
    pub fn pistol() -> Self {
        Self::new(
            "pistol",
            ItemKind::RangedWeapon {
                attack: Attack {
                    hit: 5,
                    damage: 6,
                    stamina_penalty: 0,
                },
                range: 6,
                ammo: 12,
                max_ammo: 12,
                firearm: true,
            },
        )
    }

    #[must_use]
    pub fn army_rifle() -> Self {
        Self::new(
            "army rifle",
            ItemKind::RangedWeapon {
                attack: Attack {
                    hit: 8,
                    damage: 9,
                    stamina_penalty: 0,
                },
                range: 10,
                ammo: 30,
                max_ammo: 30,
                firearm: true,
            },
        )
    }

    #[must_use]
    pub fn crossbow() -> Self {
        Self::new(
            "crossbow",
            ItemKind::RangedWeapon {
                attack: Attack {
                    hit: 4,
                    damage: 7,
                    stamina_penalty: 0,
                },
                range: 7,
                ammo: 8,
                max_ammo: 8,
                firearm: false,
            },
        )
    }

    #[must_use]
    pub fn pistol_bullets() -> Self {
        Self::new("pistol bullets", ItemKind::Ammo { rounds: 12 })
    }

    #[must_use]
    pub fn grenade() -> Self {
        Self::new(
            "grenade",
            ItemKind::Explosive {
                blast: BlastAttack {
                    radius: 2,
                    damage: vec![40, 20, 10],
                    can_damage_objects: true,
                },
                fuse: 2,
            },
        )
    }

    #[must_use]
    pub fn flashlight() -> Self {
        Self::new(
            "flashlight",
            ItemKind::Light {
                batteries: 2 * crate::constants::TURNS_PER_DAY,
                max_batteries: 2 * crate::constants::TURNS_PER_DAY,
            },
        )
    }

    #[must_use]
    pub fn zombie_tracker() -> Self {
        Self::new(
            "zombie tracker",
            ItemKind::Tracker {
                batteries: crate::constants::TURNS_PER_DAY,
                max_batteries: crate::constants::TURNS_PER_DAY,
            },
        )
    }

    #[must_use]
    pub fn army_body_armor() -> Self {
        Self::new(
            "army body armor",
            ItemKind::Armor {
                protection_hit: 3,
                protection_shot: 4,
            },
        )
    }

    #[must_use]
    pub fn canned_food() -> Self {
        Self::new(
            "canned food",
            ItemKind::Food {
                nutrition: crate::constants::TURNS_PER_DAY,
            },
        )
    }

    #[must_use]
    pub fn army_ration() -> Self {
        Self::new(
            "army ration",
            ItemKind::Food {
                nutrition: 2 * crate::constants::TURNS_PER_DAY,
            },
        )
    }

    #[must_use]
    pub fn stench_killer() -> Self {
        Self::new(
            "stench killer",
            ItemKind::Spray {
                odor: OdorKind::PerfumeLivingSuppressor,
                strength: 8 * crate::constants::TURNS_PER_HOUR,
                sprays_left: 6,
            },
        )
    }

    #[must_use]
    pub fn bait_musk() -> Self {
        Self::new(
            "bait musk",
            ItemKind::Spray {
                odor: OdorKind::PerfumeLivingGenerator,
                strength: 4 * crate::constants::TURNS_PER_HOUR,
                sprays_left: 4,
            },
        )
    }

    #[must_use]
    pub const fn is_primed_explosive(&self) -> bool {
        matches!(self.kind, ItemKind::PrimedExplosive { .. })
    }

    #[must_use]
    pub const fn is_explosive(&self) -> bool {
        matches!(
            self.kind,
            ItemKind::Explosive { .. } | ItemKind::PrimedExplosive { .. }
        )
    }

    /// Fuse left on a primed explosive.
    #[must_use]
    pub const fn fuse_left(&self) -> Option<i32> {
        match self.kind {
            ItemKind::PrimedExplosive { fuse_left, .. } => Some(fuse_left),
            _ => None,
        }
    }

    /// Arm an explosive. Already primed explosives get their fuse overridden.
    #[must_use]
    pub fn primed(self, fuse_override: Option<i32>) -> Self {
        let kind = match self.kind {
            ItemKind::Explosive { blast, fuse } => ItemKind::PrimedExplosive {
                blast,
                fuse_left: fuse_override.unwrap_or(fuse),
            },
            ItemKind::PrimedExplosive { blast, fuse_left } => ItemKind::PrimedExplosive {
                blast,
                fuse_left: fuse_override.unwrap_or(fuse_left),
            },
            other => other,
        };
        Self {
            name: self.name,
            kind,
            equipped: false,
        }
    }
}

impl Item {
    /// Arm this explosive in place with an expired fuse.
    pub fn prime_now(&mut self) -> bool {
        match &mut self.kind {
            ItemKind::Explosive { blast, .. } => {
                self.kind = ItemKind::PrimedExplosive {
                    blast: blast.clone(),
                    fuse_left: 0,
                };
                true
            }
            ItemKind::PrimedExplosive { fuse_left, .. } => {
                *fuse_left = 0;
                true
            }
            _ => false,
        }
    }
}

/// An ordered, bounded collection of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub items: Vec<Item>,
    pub capacity: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl Inventory {
    pub const DEFAULT_CAPACITY: usize = 10;
    pub const GROUND_CAPACITY: usize = 20;

    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Add an item, returning it back when there is no room.
    ///
    /// # Errors
    ///
    /// Returns the rejected item when the inventory is full.
    pub fn add(&mut self, item: Item) -> Result<(), Item> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Item> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Index of the first equipped item matching `pred`.
    pub fn equipped_index(&self, pred: impl Fn(&ItemKind) -> bool) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.equipped && pred(&item.kind))
    }

    #[must_use]
    pub fn equipped_melee(&self) -> Option<&Item> {
        self.equipped_index(|kind| matches!(kind, ItemKind::MeleeWeapon { .. }))
            .and_then(|idx| self.items.get(idx))
    }

    #[must_use]
    pub fn equipped_ranged_index(&self) -> Option<usize> {
        self.equipped_index(|kind| matches!(kind, ItemKind::RangedWeapon { .. }))
    }

    /// Protection granted by equipped armor as `(hit, shot)`.
    #[must_use]
    pub fn armor_protection(&self) -> (i32, i32) {
        self.items
            .iter()
            .filter(|item| item.equipped)
            .fold((0, 0), |(hit, shot), item| match item.kind {
                ItemKind::Armor {
                    protection_hit,
                    protection_shot,
                } => (hit + protection_hit, shot + protection_shot),
                _ => (hit, shot),
            })
    }

    #[must_use]
    pub fn has_equipped_armor(&self) -> bool {
        self.equipped_index(|kind| matches!(kind, ItemKind::Armor { .. }))
            .is_some()
    }

    /// Index of the first unprimed or primed explosive.
    #[must_use]
    pub fn explosive_index(&self) -> Option<usize> {
        self.items.iter().position(Item::is_explosive)
    }

    /// Index of the first primed explosive whose fuse has run out.
    #[must_use]
    pub fn expired_explosive_index(&self) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.fuse_left().is_some_and(|fuse| fuse <= 0))
    }

    /// Decrement every primed fuse by one turn.
    pub fn tick_fuses(&mut self) {
        for item in &mut self.items {
            if let ItemKind::PrimedExplosive { fuse_left, .. } = &mut item.kind {
                *fuse_left -= 1;
            }
        }
    }

    /// Prime every explosive with a zero fuse; returns how many were armed.
    pub fn prime_all_explosives_now(&mut self) -> usize {
        let mut armed = 0;
        for item in &mut self.items {
            if item.prime_now() {
                armed += 1;
            }
        }
        armed
    }
}
