//! Disabling and respawning agents.
//!
//! Guards are taken out of the scene while the stalker is aggressive and
//! come back in a zone away from both the player and the stalker. The
//! stalker itself is taken out while the player hides and returns at a
//! random zone afterwards.
//!
//! Deactivation always unregisters the agent from the arbiter first, which
//! drops any reservation and destination occupancy it holds.

use glam::Vec2;
use hallway_common::ZoneId;
use tracing::{info, warn};

use crate::agent::AgentState;
use crate::events::{EventBus, SceneEvent};
use crate::reservation::ReservationArbiter;
use crate::zone::ZoneRegistry;

/// Removes an agent from the scene. Returns `false` if it was already out.
pub fn deactivate(arbiter: &mut ReservationArbiter, agent: &mut AgentState, events: &EventBus) -> bool {
    if !agent.active {
        return false;
    }
    arbiter.unregister(agent.id);
    agent.active = false;
    agent.transit = None;
    info!("{} disabled", agent.name);
    events.publish(SceneEvent::AgentDeactivated { agent: agent.id });
    true
}

/// Puts an agent back into the scene at `position` in `zone`.
pub fn activate(
    arbiter: &mut ReservationArbiter,
    agent: &mut AgentState,
    zone: ZoneId,
    position: Vec2,
    rng: &mut fastrand::Rng,
    events: &EventBus,
) {
    agent.place(zone.clone(), position, rng);
    agent.patrol.reset_timer();
    agent.active = true;
    arbiter.register_resident(agent.id, zone.clone());
    events.publish(SceneEvent::AgentActivated {
        agent: agent.id,
        zone,
    });
}

/// Returns the zones with a spawn point that are not in `excluded`.
#[must_use]
pub fn safe_zones(registry: &ZoneRegistry, excluded: &[&ZoneId]) -> Vec<ZoneId> {
    registry
        .zones()
        .iter()
        .filter(|zone| !excluded.contains(zone))
        .filter(|zone| registry.spawn_point(zone.as_str()).is_some())
        .cloned()
        .collect()
}

/// Respawns a disabled guard away from the player and the stalker.
///
/// Leaves the guard disabled with a warning when no such zone has a spawn
/// point. Returns the zone the guard was placed in.
pub fn respawn_guard(
    arbiter: &mut ReservationArbiter,
    guard: &mut AgentState,
    player_zone: &ZoneId,
    stalker_zone: Option<&ZoneId>,
    rng: &mut fastrand::Rng,
    events: &EventBus,
) -> Option<ZoneId> {
    if guard.active {
        return None;
    }

    let mut excluded = vec![player_zone];
    excluded.extend(stalker_zone);
    let candidates = safe_zones(arbiter.registry(), &excluded);
    if candidates.is_empty() {
        warn!("No safe zone to respawn {}, leaving it disabled", guard.name);
        return None;
    }

    let zone = candidates[rng.usize(..candidates.len())].clone();
    let spawn = arbiter.registry().spawn_point(zone.as_str())?;
    let position = Vec2::new(spawn.x, guard.position.y);
    activate(arbiter, guard, zone.clone(), position, rng, events);
    info!("{} respawned on '{zone}'", guard.name);
    Some(zone)
}

/// Brings the stalker back at a random zone.
///
/// Any registered zone may be chosen. If it has no spawn point the
/// stalker reappears where it was disabled.
pub fn respawn_stalker(
    arbiter: &mut ReservationArbiter,
    stalker: &mut AgentState,
    rng: &mut fastrand::Rng,
    events: &EventBus,
) -> ZoneId {
    if stalker.active {
        return stalker.zone.clone();
    }

    let zones = arbiter.registry().zones();
    let chosen = (!zones.is_empty()).then(|| zones[rng.usize(..zones.len())].clone());
    let placement = chosen.and_then(|zone| {
        let spawn = arbiter.registry().spawn_point(zone.as_str());
        if spawn.is_none() {
            warn!("'{zone}' has no spawn point for {}", stalker.name);
        }
        spawn.map(|point| (zone, Vec2::new(point.x, stalker.position.y)))
    });

    let (zone, position) = placement.unwrap_or_else(|| {
        warn!("{} reactivated at its last position", stalker.name);
        (stalker.zone.clone(), stalker.position)
    });

    activate(arbiter, stalker, zone.clone(), position, rng, events);
    info!("{} respawned on '{zone}'", stalker.name);
    zone
}
