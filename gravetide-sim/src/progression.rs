//! Skills, NPC upgrades and undead evolution.
use log::debug;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::actor::ActorId;
use crate::constants::{LOG_SKILL_UPGRADE, LOG_UNDEAD_EVOLVED, SKILL_MAX_LEVEL};
use crate::context::TurnContext;
use crate::error::SimError;
use crate::map::Map;
use crate::numbers::scale_ratio;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Agile,
    Strong,
    Toughness,
    Firearms,
    Awake,
    Hardy,
    ZAgile,
    ZStrong,
    ZToughness,
}

impl Skill {
    #[must_use]
    pub const fn is_undead_skill(self) -> bool {
        matches!(self, Self::ZAgile | Self::ZStrong | Self::ZToughness)
    }
}

/// Skill levels of one actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet {
    levels: SmallVec<[(Skill, u8); 4]>,
}

impl SkillSet {
    #[must_use]
    pub fn level(&self, skill: Skill) -> i32 {
        self.levels
            .iter()
            .find(|(s, _)| *s == skill)
            .map_or(0, |(_, level)| i32::from(*level))
    }

    /// Raise a skill by one level; false when it is already maxed.
    pub fn raise(&mut self, skill: Skill) -> bool {
        if let Some((_, level)) = self.levels.iter_mut().find(|(s, _)| *s == skill) {
            if *level >= SKILL_MAX_LEVEL {
                return false;
            }
            *level += 1;
            return true;
        }
        self.levels.push((skill, 1));
        true
    }

    /// Undead skills survive zombification.
    #[must_use]
    pub fn undead_only(&self) -> Self {
        Self {
            levels: self
                .levels
                .iter()
                .copied()
                .filter(|(skill, _)| skill.is_undead_skill())
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Skill, u8)> + '_ {
        self.levels.iter().copied()
    }
}

/// Give every eligible NPC on the map one random skill from its model's set.
/// Returns how many actors gained a level.
pub fn upgrade_npcs(ctx: &mut TurnContext, map: &mut Map, undead: bool) -> usize {
    let turn = map.local_time.turn;
    let mut upgraded = 0;
    for actor in &mut map.actors {
        if actor.is_player() || actor.is_dead || actor.is_undead() != undead {
            continue;
        }
        if !actor.model.abilities.can_be_upgraded || actor.model.upgrade_skills.is_empty() {
            continue;
        }
        let Some(idx) = ctx.dice.pick_index(actor.model.upgrade_skills.len()) else {
            continue;
        };
        let skill = actor.model.upgrade_skills[idx];
        let before_max = actor.max_hp();
        if actor.skills.raise(skill) {
            if matches!(skill, Skill::Toughness | Skill::ZToughness) {
                actor.hit_points += actor.max_hp() - before_max;
            }
            ctx.messages
                .push(turn, LOG_SKILL_UPGRADE, Some(actor.id), format!("{skill:?}"));
            upgraded += 1;
        }
    }
    debug!(
        "upgraded {upgraded} {} npcs at turn {turn}",
        if undead { "undead" } else { "living" }
    );
    upgraded
}

/// Evolve `killer` into its model's next form when the kill threshold is met.
///
/// # Errors
///
/// Returns `SimError::MissingModel` when the evolution target is not in the catalog.
pub fn check_undead_evolution(
    ctx: &mut TurnContext,
    map: &mut Map,
    killer: ActorId,
) -> Result<bool, SimError> {
    if !ctx.config.undead_evolution
        || !ctx.config.mode.allows_evolution()
        || map.local_time.day() < ctx.config.undead_evolution_day
    {
        return Ok(false);
    }
    let Some(actor) = map.actor(killer) else {
        return Ok(false);
    };
    if !actor.is_undead() || actor.kills < actor.model.evolution_kills {
        return Ok(false);
    }
    let Some(next) = actor.model.evolves_into else {
        return Ok(false);
    };
    let next_model = ctx.models.require(next)?.clone();
    let turn = map.local_time.turn;
    let Some(actor) = map.actor_mut(killer) else {
        return Ok(false);
    };
    let hp_num = actor.hit_points;
    let hp_den = actor.max_hp();
    actor.name.clone_from(&next_model.name);
    actor.model = next_model;
    actor.hit_points = scale_ratio(actor.max_hp(), hp_num, hp_den).max(1);
    ctx.messages
        .push(turn, LOG_UNDEAD_EVOLVED, Some(killer), next.key().to_string());
    debug!("actor {killer} evolved into {}", next.key());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_caps_at_max_level() {
        let mut skills = SkillSet::default();
        for _ in 0..SKILL_MAX_LEVEL {
            assert!(skills.raise(Skill::Agile));
        }
        assert!(!skills.raise(Skill::Agile));
        assert_eq!(skills.level(Skill::Agile), i32::from(SKILL_MAX_LEVEL));
        assert_eq!(skills.level(Skill::Strong), 0);
    }

    #[test]
    fn zombification_keeps_undead_skills_only() {
        let mut skills = SkillSet::default();
        skills.raise(Skill::Agile);
        skills.raise(Skill::ZStrong);
        let kept = skills.undead_only();
        assert_eq!(kept.level(Skill::Agile), 0);
        assert_eq!(kept.level(Skill::ZStrong), 1);
        assert_eq!(kept.iter().count(), 1);
    }
}
