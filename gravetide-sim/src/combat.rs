//! Melee, ranged and blast resolution plus the universal death path.
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::action::FireMode;
use crate::actor::{Actor, ActorId};
use crate::constants::{
    BASE_ACTION_COST, BLAST_IGNITE_CHANCE_CAP, BLOOD_DECORATION_TURNS, CORPSE_CONDITION_PER_HP,
    FIRE_DISTANCE_PENALTY, ITEM_DROP_ON_DEATH_CHANCE, LOG_ACTOR_KILLED, LOG_BOND_GRIEF, LOG_EXPLOSION,
    LOG_MELEE_HIT, LOG_MELEE_MISS, LOG_OBJECT_DESTROYED, LOG_SHOT_HIT, LOG_SHOT_INTERCEPTED,
    LOG_SHOT_JAMMED, LOG_SHOT_MISS, LOG_WEAPON_BROKE, MELEE_WEAPON_BREAK_CHANCE,
    MELEE_WEAPON_FRAGILE_BREAK_CHANCE, RAPID_FIRE_FIRST_SHOT_ACCURACY,
    RAPID_FIRE_SECOND_SHOT_ACCURACY, SANITY_HIT_BOND_DEATH, SCORCH_DECORATION_TURNS,
    SKILL_AGILE_ATK_BONUS, SKILL_AGILE_DEF_BONUS, SKILL_FIREARMS_ATK_BONUS,
    SKILL_STRONG_DMG_BONUS, STAMINA_COST_MELEE_ATTACK, TRUST_BOND_THRESHOLD,
};
use crate::context::TurnContext;
use crate::economy::{infect, spend_action_points, spend_sanity, spend_stamina, take_damage};
use crate::error::SimError;
use crate::geometry::{Point, grid_distance, ring, trace_line};
use crate::infection::zombify;
use crate::items::{BlastAttack, ItemKind};
use crate::map::{Corpse, Decoration, Map};
use crate::messages::MessageLog;
use crate::models::{Attack, Defence};
use crate::numbers::scale_pct;
use crate::progression::{Skill, check_undead_evolution};

/// Melee attack stats including weapon and skills.
#[must_use]
pub fn melee_attack_of(actor: &Actor) -> Attack {
    let mut attack = actor.model.attack;
    if let Some(item) = actor.inventory.equipped_melee()
        && let ItemKind::MeleeWeapon { attack: weapon, .. } = item.kind
    {
        attack.hit += weapon.hit;
        attack.damage += weapon.damage;
        attack.stamina_penalty += weapon.stamina_penalty;
    }
    let agile = actor.skills.level(Skill::Agile) + actor.skills.level(Skill::ZAgile);
    let strong = actor.skills.level(Skill::Strong) + actor.skills.level(Skill::ZStrong);
    attack.hit += SKILL_AGILE_ATK_BONUS * agile;
    attack.damage += SKILL_STRONG_DMG_BONUS * strong;
    attack
}

/// Ranged attack stats for a weapon attack profile.
#[must_use]
pub fn ranged_attack_of(actor: &Actor, weapon: Attack, firearm: bool) -> Attack {
    let mut attack = weapon;
    if firearm {
        attack.hit += SKILL_FIREARMS_ATK_BONUS * actor.skills.level(Skill::Firearms);
    }
    attack
}

/// Defence stats including armor and skills.
#[must_use]
pub fn defence_of(actor: &Actor) -> Defence {
    let mut defence = actor.model.defence;
    let (hit, shot) = actor.inventory.armor_protection();
    defence.protection_hit += hit;
    defence.protection_shot += shot;
    let agile = actor.skills.level(Skill::Agile) + actor.skills.level(Skill::ZAgile);
    defence.value += SKILL_AGILE_DEF_BONUS * agile;
    defence
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeleeOutcome {
    pub hit_roll: i32,
    pub defence_roll: i32,
    pub damage: i32,
    pub killed: bool,
    pub weapon_broke: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotOutcome {
    Hit { damage: i32, killed: bool },
    Miss,
    Jammed,
    Intercepted(Point),
    NoAmmo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KillReport {
    pub murder: bool,
    pub corpse: bool,
    pub zombified: Option<ActorId>,
    pub dropped_items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastReport {
    pub actors_hit: usize,
    pub killed: Vec<ActorId>,
    pub items_destroyed: usize,
    pub explosives_primed: usize,
    pub objects_destroyed: usize,
    pub corpses_destroyed: usize,
}

/// Record an unprovoked attack between non-enemy living actors.
fn mark_aggression(attacker: &mut Actor, defender: &mut Actor) {
    if attacker.is_undead() || defender.is_undead() || attacker.is_enemy_of(defender) {
        return;
    }
    if attacker.self_defence_from.contains(&defender.id) {
        return;
    }
    attacker.aggressor_of.insert(defender.id);
    defender.self_defence_from.insert(attacker.id);
}

fn infect_from_damage(ctx: &TurnContext, attacker: &Actor, defender: &mut Actor, damage: i32) {
    if ctx.config.mode.has_infection() && attacker.is_undead() && attacker.model.infection_per_damage > 0 {
        infect(defender, damage * attacker.model.infection_per_damage);
    }
}

/// Resolve one melee blow.
///
/// # Errors
///
/// Fails when either actor is not on the map, or when the resulting death
/// breaks an invariant.
pub fn do_melee_attack(
    ctx: &mut TurnContext,
    map: &mut Map,
    attacker: ActorId,
    defender: ActorId,
) -> Result<MeleeOutcome, SimError> {
    let turn = map.local_time.turn;
    let (att, def) = map
        .actor_pair_mut(attacker, defender)
        .ok_or(SimError::UnknownActor(defender))?;
    let attack = melee_attack_of(att);
    let defence = defence_of(def);
    spend_action_points(att, BASE_ACTION_COST);
    spend_stamina(att, STAMINA_COST_MELEE_ATTACK + attack.stamina_penalty);
    mark_aggression(att, def);

    let hit_roll = ctx.dice.roll_skill(attack.hit);
    let defence_roll = ctx.dice.roll_skill(defence.value);
    let mut damage = 0;
    let mut lethal = false;
    let defender_pos = def.position;
    if hit_roll > defence_roll {
        let potential = if def.is_sleeping {
            2 * attack.damage
        } else {
            attack.damage
        };
        damage = (ctx.dice.roll_damage(potential) - defence.protection_hit).max(0);
        if damage > 0 {
            lethal = take_damage(def, damage);
            infect_from_damage(ctx, att, def, damage);
        }
        def.is_sleeping = false;
        ctx.messages
            .push(turn, LOG_MELEE_HIT, Some(attacker), format!("{defender}:{damage}"));
    } else {
        ctx.messages
            .push(turn, LOG_MELEE_MISS, Some(attacker), defender.to_string());
    }

    let weapon_broke = roll_melee_weapon_break(ctx, att, turn);
    if damage > 0 {
        map.add_decoration(defender_pos, Decoration::Blood, BLOOD_DECORATION_TURNS);
    }
    debug!("melee {attacker} -> {defender}: hit {hit_roll} def {defence_roll} dmg {damage}");
    if lethal {
        kill_actor(ctx, map, Some(attacker), defender, "melee")?;
    }
    Ok(MeleeOutcome {
        hit_roll,
        defence_roll,
        damage,
        killed: lethal,
        weapon_broke,
    })
}

fn roll_melee_weapon_break(ctx: &mut TurnContext, att: &mut Actor, turn: i32) -> bool {
    let Some(idx) = att
        .inventory
        .equipped_index(|kind| matches!(kind, ItemKind::MeleeWeapon { .. }))
    else {
        return false;
    };
    let ItemKind::MeleeWeapon {
        fragile,
        unbreakable,
        ..
    } = att.inventory.items[idx].kind
    else {
        return false;
    };
    if unbreakable {
        return false;
    }
    let chance = if fragile {
        MELEE_WEAPON_FRAGILE_BREAK_CHANCE
    } else {
        MELEE_WEAPON_BREAK_CHANCE
    };
    if !ctx.dice.roll_chance(chance) {
        return false;
    }
    if let Some(item) = att.inventory.remove_at(idx) {
        ctx.messages.push(turn, LOG_WEAPON_BROKE, Some(att.id), item.name);
    }
    true
}

/// Fire at `target` in the given mode. The attack costs one action whatever
/// the number of shots.
///
/// # Errors
///
/// Fails when an actor is missing or a resulting death breaks an invariant.
pub fn do_ranged_attack(
    ctx: &mut TurnContext,
    map: &mut Map,
    attacker: ActorId,
    target: ActorId,
    mode: FireMode,
) -> Result<Vec<ShotOutcome>, SimError> {
    let shooter = map.actor_mut(attacker).ok_or(SimError::UnknownActor(attacker))?;
    spend_action_points(shooter, BASE_ACTION_COST);
    let accuracies: &[i32] = match mode {
        FireMode::Default => &[100],
        FireMode::Rapid => &[RAPID_FIRE_FIRST_SHOT_ACCURACY, RAPID_FIRE_SECOND_SHOT_ACCURACY],
    };
    let mut shots = Vec::with_capacity(accuracies.len());
    for (i, &accuracy) in accuracies.iter().enumerate() {
        if i > 0 && (map.killed.contains(&target) || loaded_ammo(map, attacker) <= 0) {
            break;
        }
        shots.push(do_single_ranged_attack(ctx, map, attacker, target, accuracy)?);
    }
    Ok(shots)
}

fn loaded_ammo(map: &Map, actor: ActorId) -> i32 {
    map.actor(actor)
        .and_then(|a| {
            a.inventory
                .equipped_ranged_index()
                .map(|idx| &a.inventory.items[idx].kind)
        })
        .map_or(0, |kind| match kind {
            ItemKind::RangedWeapon { ammo, .. } => *ammo,
            _ => 0,
        })
}

/// Fire one shot at `accuracy_pct` of normal accuracy. Spends no AP.
///
/// # Errors
///
/// Fails when an actor is missing or a resulting death breaks an invariant.
pub fn do_single_ranged_attack(
    ctx: &mut TurnContext,
    map: &mut Map,
    attacker: ActorId,
    target: ActorId,
    accuracy_pct: i32,
) -> Result<ShotOutcome, SimError> {
    let turn = map.local_time.turn;
    let shooter = map.actor(attacker).ok_or(SimError::UnknownActor(attacker))?;
    let from = shooter.position;
    let to = map.actor(target).ok_or(SimError::UnknownActor(target))?.position;
    let Some(idx) = shooter.inventory.equipped_ranged_index() else {
        return Ok(ShotOutcome::NoAmmo);
    };
    let ItemKind::RangedWeapon {
        attack: weapon,
        range,
        ammo,
        firearm,
        ..
    } = shooter.inventory.items[idx].kind
    else {
        return Ok(ShotOutcome::NoAmmo);
    };
    if ammo <= 0 {
        return Ok(ShotOutcome::NoAmmo);
    }
    if firearm && ctx.dice.roll_chance(ctx.weather.firearm_jam_chance()) {
        ctx.messages.push(turn, LOG_SHOT_JAMMED, Some(attacker), "");
        return Ok(ShotOutcome::Jammed);
    }
    let mut attack = ranged_attack_of(shooter, weapon, firearm);
    let shooter = map.actor_mut(attacker).ok_or(SimError::UnknownActor(attacker))?;
    if let ItemKind::RangedWeapon { ammo, .. } = &mut shooter.inventory.items[idx].kind {
        *ammo -= 1;
    }

    let line = trace_line(from, to);
    for &p in line.iter().take(line.len().saturating_sub(1)) {
        if map
            .objects
            .get(&p)
            .is_some_and(|o| o.is_breakable() && o.breaks_when_fired_through)
        {
            if let Some(object) = map.objects.remove(&p) {
                ctx.messages.push(turn, LOG_OBJECT_DESTROYED, None, object.name);
            }
            ctx.messages.push(turn, LOG_SHOT_INTERCEPTED, Some(attacker), "");
            return Ok(ShotOutcome::Intercepted(p));
        }
    }

    let distance = grid_distance(from, to);
    let half_range = range / 2;
    if distance > half_range {
        attack.hit -= FIRE_DISTANCE_PENALTY * (distance - half_range);
    }
    attack.hit = scale_pct(attack.hit.max(0), accuracy_pct);

    let (att, def) = map
        .actor_pair_mut(attacker, target)
        .ok_or(SimError::UnknownActor(target))?;
    let defence = defence_of(def);
    mark_aggression(att, def);
    let hit_roll = ctx.dice.roll_skill(attack.hit);
    let defence_roll = ctx.dice.roll_skill(defence.value);
    if hit_roll <= defence_roll {
        ctx.messages.push(turn, LOG_SHOT_MISS, Some(attacker), target.to_string());
        return Ok(ShotOutcome::Miss);
    }
    let damage = (ctx.dice.roll_damage(attack.damage) - defence.protection_shot).max(0);
    let lethal = damage > 0 && take_damage(def, damage);
    def.is_sleeping = false;
    ctx.messages
        .push(turn, LOG_SHOT_HIT, Some(attacker), format!("{target}:{damage}"));
    if damage > 0 {
        map.add_decoration(to, Decoration::Blood, BLOOD_DECORATION_TURNS);
    }
    if lethal {
        kill_actor(ctx, map, Some(attacker), target, "shot")?;
    }
    Ok(ShotOutcome::Hit {
        damage,
        killed: lethal,
    })
}

/// Detonate a blast at `center`: ground zero first, then each ring out to
/// the radius, tiles gated by line of effect.
///
/// # Errors
///
/// Propagates invariant violations from deaths caused by the blast.
pub fn do_blast(
    ctx: &mut TurnContext,
    map: &mut Map,
    center: Point,
    blast: &BlastAttack,
    source: Option<ActorId>,
) -> Result<BlastReport, SimError> {
    let turn = map.local_time.turn;
    ctx.messages.push(
        turn,
        LOG_EXPLOSION,
        source,
        format!("{},{}", center.x, center.y),
    );
    let mut report = BlastReport::default();
    for radius in 0..=blast.radius {
        let damage = blast.damage_at(radius);
        if damage <= 0 {
            continue;
        }
        for p in ring(center, radius) {
            if !map.in_bounds(p) || (radius > 0 && !map.has_line_of_effect(center, p)) {
                continue;
            }
            blast_tile(ctx, map, p, damage, blast.can_damage_objects, source, &mut report)?;
        }
    }
    info!(
        "blast at ({}, {}) hit {} actors, killed {}",
        center.x,
        center.y,
        report.actors_hit,
        report.killed.len()
    );
    Ok(report)
}

fn blast_tile(
    ctx: &mut TurnContext,
    map: &mut Map,
    p: Point,
    damage: i32,
    damage_objects: bool,
    source: Option<ActorId>,
    report: &mut BlastReport,
) -> Result<(), SimError> {
    let turn = map.local_time.turn;
    if let Some(idx) = map.actors.iter().position(|a| a.position == p) {
        let victim = &mut map.actors[idx];
        let dealt = if victim.inventory.has_equipped_armor() {
            damage / 2
        } else {
            damage
        };
        report.explosives_primed += victim.inventory.prime_all_explosives_now();
        victim.is_sleeping = false;
        let id = victim.id;
        report.actors_hit += 1;
        if take_damage(victim, dealt) {
            kill_actor(ctx, map, source.filter(|s| *s != id), id, "explosion")?;
            report.killed.push(id);
        }
    }

    if let Some(stack) = map.ground.get_mut(&p) {
        let mut kept = Vec::with_capacity(stack.items.len());
        for mut item in stack.items.drain(..) {
            if item.prime_now() {
                report.explosives_primed += 1;
                kept.push(item);
            } else if ctx.dice.roll_chance(damage) {
                report.items_destroyed += 1;
            } else {
                kept.push(item);
            }
        }
        stack.items = kept;
        if stack.is_empty() {
            map.ground.remove(&p);
        }
    }

    if let Some(object) = map.objects.get_mut(&p) {
        if damage_objects && object.is_breakable() && object.damage(damage) {
            if let Some(object) = map.objects.remove(&p) {
                ctx.messages.push(turn, LOG_OBJECT_DESTROYED, None, object.name);
            }
            report.objects_destroyed += 1;
        } else if object.burnable
            && !object.on_fire
            && ctx.dice.roll_chance(damage.min(BLAST_IGNITE_CHANCE_CAP))
        {
            object.on_fire = true;
        }
    }

    let before = map.corpses.len();
    for corpse in map.corpses.iter_mut().filter(|c| c.position == p) {
        corpse.hit_points -= damage * CORPSE_CONDITION_PER_HP;
    }
    map.corpses.retain(|c| c.hit_points > 0);
    report.corpses_destroyed += before - map.corpses.len();

    map.add_decoration(p, Decoration::Scorch, SCORCH_DECORATION_TURNS);
    Ok(())
}

/// Break leader/follower bonds of a dying actor, hurting bonded survivors.
fn detach_relationships(map: &mut Map, messages: &mut MessageLog, victim: ActorId) {
    let turn = map.local_time.turn;
    let Some(dead) = map.actor(victim) else {
        return;
    };
    let leader = dead.leader;
    let victim_trust = dead.trust_in_leader;
    let followers = dead.followers.clone();
    if let Some(leader_id) = leader
        && let Some(leader) = map.actor_mut(leader_id)
    {
        leader.followers.retain(|f| *f != victim);
        if victim_trust >= TRUST_BOND_THRESHOLD {
            spend_sanity(leader, SANITY_HIT_BOND_DEATH);
            messages.push(turn, LOG_BOND_GRIEF, Some(leader_id), "");
        }
    }
    for follower_id in followers {
        if let Some(follower) = map.actor_mut(follower_id) {
            if follower.trust_in_leader >= TRUST_BOND_THRESHOLD {
                spend_sanity(follower, SANITY_HIT_BOND_DEATH);
                messages.push(turn, LOG_BOND_GRIEF, Some(follower_id), "");
            }
            follower.leader = None;
            follower.trust_in_leader = 0;
        }
    }
    if let Some(dead) = map.actor_mut(victim) {
        dead.leader = None;
        dead.followers.clear();
        dead.trust_in_leader = 0;
    }
}

/// What a death leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remains {
    /// Corpse or immediate zombification, as the game mode dictates.
    ByMode,
    /// No corpse; the victim always turns.
    Zombify,
}

/// The universal death path. A second kill of the same actor is refused.
///
/// # Errors
///
/// Returns `SimError::AlreadyDead` for a repeated kill and
/// `SimError::UnknownActor` when the victim is not on this map.
pub fn kill_actor(
    ctx: &mut TurnContext,
    map: &mut Map,
    killer: Option<ActorId>,
    victim: ActorId,
    reason: &str,
) -> Result<KillReport, SimError> {
    kill_actor_with(ctx, map, killer, victim, reason, Remains::ByMode)
}

/// [`kill_actor`] with an explicit choice of remains.
///
/// # Errors
///
/// Same as [`kill_actor`].
pub fn kill_actor_with(
    ctx: &mut TurnContext,
    map: &mut Map,
    killer: Option<ActorId>,
    victim: ActorId,
    reason: &str,
    remains: Remains,
) -> Result<KillReport, SimError> {
    if map.killed.contains(&victim) {
        return Err(SimError::AlreadyDead(victim));
    }
    let dead = map.actor(victim).ok_or(SimError::UnknownActor(victim))?;
    let victim_living = !dead.is_undead();
    let victim_faction = dead.faction();
    let turn = map.local_time.turn;
    map.killed.insert(victim);

    detach_relationships(map, &mut ctx.messages, victim);
    for other in &mut map.actors {
        other.aggressor_of.remove(&victim);
        other.self_defence_from.remove(&victim);
    }
    for corpse in &mut map.corpses {
        if corpse.dragged_by == Some(victim) {
            corpse.dragged_by = None;
        }
    }

    let mut report = KillReport::default();
    let mut zombifying_killer = false;
    if let Some(killer_id) = killer.filter(|k| *k != victim)
        && let Some(k) = map.actor_mut(killer_id)
    {
        k.kills += 1;
        let unprovoked = !k.self_defence_from.contains(&victim);
        if victim_living && !k.is_undead() && !k.model.faction.is_enemy_of(victim_faction) && unprovoked {
            k.murders += 1;
            report.murder = true;
        }
        zombifying_killer = k.is_undead() && k.model.abilities.can_zombify_killed;
    }

    let mut dead = map.remove_actor(victim)?;
    dead.is_dead = true;
    dead.is_sleeping = false;
    dead.is_running = false;
    dead.dragged_corpse = None;
    dead.aggressor_of.clear();
    dead.self_defence_from.clear();
    let pos = dead.position;

    for item in std::mem::take(&mut dead.inventory.items) {
        let drop = item.is_primed_explosive() || ctx.dice.roll_chance(ITEM_DROP_ON_DEATH_CHANCE);
        if drop && map.drop_item(pos, item).is_ok() {
            report.dropped_items += 1;
        }
    }

    ctx.messages
        .push(turn, LOG_ACTOR_KILLED, Some(victim), reason.to_string());
    info!("actor {victim} killed ({reason}) at turn {turn}");

    let turns_now = remains == Remains::Zombify
        || (victim_living && zombifying_killer && ctx.config.mode.zombifies_immediately());
    if turns_now {
        report.zombified = zombify(ctx, map, dead, 1, 1)?;
    } else if victim_living && ctx.config.mode.has_corpses() {
        map.add_corpse(Corpse::new(dead, turn));
        report.corpse = true;
    }

    if let Some(killer_id) = killer.filter(|k| *k != victim) {
        check_undead_evolution(ctx, map, killer_id)?;
    }
    Ok(report)
}
