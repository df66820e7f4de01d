//! World events rolled for the player's district: invasions, arrivals and
//! raids, plus the border spawning they rely on.
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorId};
use crate::clock::WorldTime;
use crate::config::{EventRule, EventRules, EventTiming};
use crate::constants::{LOG_EVENT_FIRED, TRUST_NEW_FOLLOWER};
use crate::context::{SpawnRole, TurnContext};
use crate::controller::Controller;
use crate::error::SimError;
use crate::geometry::{Point, grid_distance};
use crate::items::Item;
use crate::map::Map;
use crate::models::ModelId;
use crate::world::District;

/// Events AI brains may be ordered to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaidType {
    NationalGuard,
    ArmySupplies,
    Bikers,
    Gangstas,
    BlackOps,
    Survivors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldEvent {
    ZombieInvasion,
    RefugeeWave,
    NationalGuard,
    ArmySupplies,
    Bikers,
    Gangstas,
    BlackOps,
    Survivors,
    SewersInvasion,
}

impl WorldEvent {
    /// Events checked against the entry map, in roll order.
    pub const ENTRY: [Self; 8] = [
        Self::ZombieInvasion,
        Self::RefugeeWave,
        Self::NationalGuard,
        Self::ArmySupplies,
        Self::Bikers,
        Self::Gangstas,
        Self::BlackOps,
        Self::Survivors,
    ];

    #[must_use]
    pub const fn rule(self, rules: &EventRules) -> &EventRule {
        match self {
            Self::ZombieInvasion => &rules.zombie_invasion,
            Self::RefugeeWave => &rules.refugees,
            Self::NationalGuard => &rules.national_guard,
            Self::ArmySupplies => &rules.army_supplies,
            Self::Bikers => &rules.bikers,
            Self::Gangstas => &rules.gangstas,
            Self::BlackOps => &rules.blackops,
            Self::Survivors => &rules.survivors,
            Self::SewersInvasion => &rules.sewers_invasion,
        }
    }

    #[must_use]
    pub const fn raid(self) -> Option<RaidType> {
        match self {
            Self::NationalGuard => Some(RaidType::NationalGuard),
            Self::ArmySupplies => Some(RaidType::ArmySupplies),
            Self::Bikers => Some(RaidType::Bikers),
            Self::Gangstas => Some(RaidType::Gangstas),
            Self::BlackOps => Some(RaidType::BlackOps),
            Self::Survivors => Some(RaidType::Survivors),
            Self::ZombieInvasion | Self::RefugeeWave | Self::SewersInvasion => None,
        }
    }

    const fn spawns_undead(self) -> bool {
        matches!(self, Self::ZombieInvasion | Self::SewersInvasion)
    }

    #[must_use]
    pub const fn i18n_key(self) -> &'static str {
        match self {
            Self::ZombieInvasion => "event.zombie_invasion",
            Self::RefugeeWave => "event.refugees",
            Self::NationalGuard => "event.national_guard",
            Self::ArmySupplies => "event.army_supplies",
            Self::Bikers => "event.bikers",
            Self::Gangstas => "event.gangstas",
            Self::BlackOps => "event.blackops",
            Self::Survivors => "event.survivors",
            Self::SewersInvasion => "event.sewers_invasion",
        }
    }
}

/// Outcome of one event check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCheck {
    pub event: WorldEvent,
    /// Timing gate and day window passed, so the chance was rolled.
    pub rolled: bool,
    pub fired: bool,
    /// Actors or item stacks placed.
    pub spawned: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReport {
    pub checks: Vec<EventCheck>,
}

impl EventReport {
    #[must_use]
    pub fn check(&self, event: WorldEvent) -> Option<&EventCheck> {
        self.checks.iter().find(|c| c.event == event)
    }

    #[must_use]
    pub fn fired(&self) -> impl Iterator<Item = WorldEvent> + '_ {
        self.checks.iter().filter(|c| c.fired).map(|c| c.event)
    }
}

const fn timing_passes(timing: EventTiming, time: WorldTime) -> bool {
    match timing {
        EventTiming::Midnight => time.is_strike_of_midnight(),
        EventTiming::Midday => time.is_strike_of_midday(),
        EventTiming::Hourly => time.is_strike_of_hour(),
        EventTiming::EveryTurn => true,
    }
}

/// Roll every event for the player's district. Each check is independent:
/// one firing never skips or forces another.
///
/// # Errors
///
/// Returns `SimError::MissingModel` when a spawned model is missing from the
/// catalog.
pub fn check_district_events(
    ctx: &mut TurnContext,
    district: &mut District,
) -> Result<EventReport, SimError> {
    let mut report = EventReport::default();
    for event in WorldEvent::ENTRY {
        report.checks.push(check_event(ctx, &mut district.entry, event)?);
    }
    report
        .checks
        .push(check_event(ctx, &mut district.sewers, WorldEvent::SewersInvasion)?);
    Ok(report)
}

fn check_event(ctx: &mut TurnContext, map: &mut Map, event: WorldEvent) -> Result<EventCheck, SimError> {
    let rule = event.rule(&ctx.config.events).clone();
    let time = map.local_time;
    let mut check = EventCheck {
        event,
        rolled: false,
        fired: false,
        spawned: 0,
    };
    if !timing_passes(rule.timing, time) || !rule.day_in_window(time.day()) {
        return Ok(check);
    }
    check.rolled = true;
    if !ctx.dice.roll_permil(rule.chance_permil) {
        return Ok(check);
    }
    let caps = ctx.config.population;
    let capped = if event == WorldEvent::ArmySupplies {
        false
    } else if event.spawns_undead() {
        map.count_undead() >= caps.max_undeads
    } else {
        map.count_living() >= caps.max_living
    };
    if capped {
        debug!("{event:?} skipped on {}: population cap", map.name);
        return Ok(check);
    }
    let (spawned, location) = fire_event(ctx, map, event, rule.group_size)?;
    check.spawned = spawned;
    check.fired = spawned > 0;
    if let Some(location) = location.filter(|_| check.fired) {
        ctx.messages.push(time.turn, LOG_EVENT_FIRED, None, event.i18n_key());
        info!(
            "{event:?} on {} at turn {}: {spawned} spawned",
            map.name, time.turn
        );
        if let Some(raid) = event.raid() {
            notify_orderables(map, raid, location, time.turn);
        }
    }
    Ok(check)
}

fn fire_event(
    ctx: &mut TurnContext,
    map: &mut Map,
    event: WorldEvent,
    group_size: u32,
) -> Result<(usize, Option<Point>), SimError> {
    let day = map.local_time.day();
    match event {
        WorldEvent::ZombieInvasion => spawn_singles(ctx, map, group_size, |dice_roll| {
            if day >= 7 && dice_roll < 10 {
                ModelId::ZombieMaster
            } else if dice_roll < 55 {
                ModelId::Zombie
            } else {
                ModelId::Skeleton
            }
        }),
        WorldEvent::SewersInvasion => spawn_singles(ctx, map, group_size, |dice_roll| {
            if dice_roll < 20 {
                ModelId::SewersThing
            } else {
                ModelId::Rat
            }
        }),
        WorldEvent::RefugeeWave => spawn_singles(ctx, map, group_size, |_| ModelId::Civilian),
        WorldEvent::NationalGuard => spawn_group(ctx, map, ModelId::Soldier, group_size, &|| {
            vec![Item::army_rifle().equip(), Item::army_body_armor().equip(), Item::army_ration()]
        }),
        WorldEvent::Bikers => spawn_group(ctx, map, ModelId::Biker, group_size, &|| {
            vec![Item::baseball_bat().equip()]
        }),
        WorldEvent::Gangstas => spawn_group(ctx, map, ModelId::Gangsta, group_size, &|| {
            vec![Item::pistol().equip(), Item::pistol_bullets()]
        }),
        WorldEvent::BlackOps => spawn_group(ctx, map, ModelId::BlackOps, group_size, &|| {
            vec![
                Item::army_rifle().equip(),
                Item::army_body_armor().equip(),
                Item::zombie_tracker().equip(),
            ]
        }),
        WorldEvent::Survivors => spawn_group(ctx, map, ModelId::Survivor, group_size, &|| {
            vec![Item::kitchen_knife().equip(), Item::canned_food()]
        }),
        WorldEvent::ArmySupplies => Ok(drop_supplies(ctx, map, group_size)),
    }
}

/// A fresh actor of `model` with a controller from the context's factory.
///
/// # Errors
///
/// Returns `SimError::MissingModel` when `model` is not in the catalog.
pub fn new_actor(ctx: &mut TurnContext, model: ModelId, role: SpawnRole) -> Result<Actor, SimError> {
    let model = ctx.models.require(model)?.clone();
    let controller = ctx.controllers.controller_for(&model, role);
    let id = ctx.ids.next_id();
    Ok(Actor::new(id, model, Point::default()).with_controller(controller))
}

fn spawn_singles(
    ctx: &mut TurnContext,
    map: &mut Map,
    count: u32,
    pick_model: impl Fn(i32) -> ModelId,
) -> Result<(usize, Option<Point>), SimError> {
    let mut spawned = 0;
    let mut location = None;
    for _ in 0..count {
        let roll = ctx.dice.roll(0, 100);
        let actor = new_actor(ctx, pick_model(roll), SpawnRole::EventArrival)?;
        if let Some(id) = spawn_actor_on_border(ctx, map, actor) {
            location = location.or_else(|| map.actor(id).map(|a| a.position));
            spawned += 1;
        }
    }
    Ok((spawned, location))
}

fn spawn_group(
    ctx: &mut TurnContext,
    map: &mut Map,
    model: ModelId,
    size: u32,
    kit: &dyn Fn() -> Vec<Item>,
) -> Result<(usize, Option<Point>), SimError> {
    let mut leader = new_actor(ctx, model, SpawnRole::GroupLeader)?;
    equip_kit(&mut leader, kit());
    let Some(leader_id) = spawn_actor_on_border(ctx, map, leader) else {
        return Ok((0, None));
    };
    let center = map
        .actor(leader_id)
        .map(|a| a.position)
        .ok_or(SimError::UnknownActor(leader_id))?;
    let mut spawned = 1;
    for _ in 1..size {
        let mut follower = new_actor(ctx, model, SpawnRole::GroupFollower)?;
        equip_kit(&mut follower, kit());
        follower.leader = Some(leader_id);
        follower.trust_in_leader = TRUST_NEW_FOLLOWER;
        if let Some(id) = spawn_actor_near(ctx, map, follower, center, 3) {
            if let Some(leader) = map.actor_mut(leader_id) {
                leader.followers.push(id);
            }
            spawned += 1;
        }
    }
    Ok((spawned, Some(center)))
}

/// Give `actor` as much of `kit` as its inventory holds. Returns the items
/// that fit.
fn equip_kit(actor: &mut Actor, kit: Vec<Item>) -> usize {
    let mut given = 0;
    for item in kit {
        match actor.inventory.add(item) {
            Ok(()) => given += 1,
            Err(item) => debug!("no room for {} on actor {}", item.name, actor.id),
        }
    }
    given
}

fn drop_supplies(ctx: &mut TurnContext, map: &mut Map, stacks: u32) -> (usize, Option<Point>) {
    let mut dropped = 0;
    let mut location = None;
    let tries = spawn_tries(map);
    for _ in 0..stacks {
        for _ in 0..tries {
            let p = Point::new(ctx.dice.roll(0, map.width), ctx.dice.roll(0, map.height));
            if !map.is_outside(p) || !map.is_free(p) || map.ground.contains_key(&p) {
                continue;
            }
            let supplies = match ctx.dice.roll(0, 3) {
                0 => [Item::army_ration(), Item::army_ration()],
                1 => [Item::pistol_bullets(), Item::army_ration()],
                _ => [Item::army_body_armor(), Item::canned_food()],
            };
            let landed = supplies
                .into_iter()
                .map(|item| map.drop_item(p, item))
                .filter(Result::is_ok)
                .count();
            if landed == 0 {
                continue;
            }
            location = location.or(Some(p));
            dropped += 1;
            break;
        }
    }
    (dropped, location)
}

fn spawn_tries(map: &Map) -> i32 {
    4 * (map.width + map.height)
}

/// Free tile, far enough from the player, with no enemy of `actor` next to it.
fn is_spawn_spot(map: &Map, actor: &Actor, p: Point, min_player_distance: i32) -> bool {
    if !map.is_free(p) {
        return false;
    }
    if map
        .player()
        .is_some_and(|player| grid_distance(player.position, p) < min_player_distance)
    {
        return false;
    }
    !map
        .actors
        .iter()
        .any(|other| grid_distance(other.position, p) <= 1 && other.is_enemy_of(actor))
}

/// Place `actor` on a random border tile. Gives up silently after
/// `4 * (width + height)` tries.
pub fn spawn_actor_on_border(ctx: &mut TurnContext, map: &mut Map, mut actor: Actor) -> Option<ActorId> {
    if map.width <= 0 || map.height <= 0 {
        return None;
    }
    let min_distance = ctx.config.min_spawn_distance_to_player;
    for _ in 0..spawn_tries(map) {
        let p = match ctx.dice.roll(0, 4) {
            0 => Point::new(ctx.dice.roll(0, map.width), 0),
            1 => Point::new(ctx.dice.roll(0, map.width), map.height - 1),
            2 => Point::new(0, ctx.dice.roll(0, map.height)),
            _ => Point::new(map.width - 1, ctx.dice.roll(0, map.height)),
        };
        if is_spawn_spot(map, &actor, p, min_distance) {
            actor.position = p;
            let id = actor.id;
            return map.place_actor(actor).ok().map(|()| id);
        }
    }
    debug!("no border spot for {} on {}", actor.id, map.name);
    None
}

/// Place `actor` within `radius` of `center`, same constraints as border spawns.
pub fn spawn_actor_near(
    ctx: &mut TurnContext,
    map: &mut Map,
    mut actor: Actor,
    center: Point,
    radius: i32,
) -> Option<ActorId> {
    let min_distance = ctx.config.min_spawn_distance_to_player;
    for _ in 0..spawn_tries(map) {
        let p = Point::new(
            center.x + ctx.dice.roll(-radius, radius + 1),
            center.y + ctx.dice.roll(-radius, radius + 1),
        );
        if is_spawn_spot(map, &actor, p, min_distance) {
            actor.position = p;
            let id = actor.id;
            return map.place_actor(actor).ok().map(|()| id);
        }
    }
    debug!("no spot near ({}, {}) for {}", center.x, center.y, actor.id);
    None
}

/// Tell every orderable brain on the map about a raid. Returns how many heard it.
pub fn notify_orderables(map: &mut Map, raid: RaidType, location: Point, turn: i32) -> usize {
    let mut notified = 0;
    for actor in &mut map.actors {
        if let Controller::Ai(brain) = &mut actor.controller
            && let Some(orderable) = brain.as_orderable()
        {
            orderable.on_raid(raid, location, turn);
            notified += 1;
        }
    }
    debug!("{raid:?} raid notified to {notified} of {} actors", map.actors.len());
    notified
}
