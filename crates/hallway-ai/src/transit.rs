//! Walking to a reserved warp and using it.
//!
//! Shared by patrol-triggered transits and floor chases. Both acquire an
//! edge through the arbiter and then hand the walk to [`advance`].

use glam::Vec2;
use hallway_common::{EdgeId, ZoneId};
use tracing::{debug, info, warn};

use crate::agent::AgentState;
use crate::reservation::ReservationArbiter;

/// Something that happened to an agent's transit this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitEvent {
    /// The agent won a reservation and started walking to the warp
    Reserved(EdgeId),
    /// The agent used the warp and is now resident in `zone`
    Arrived {
        /// Edge that was used
        edge: EdgeId,
        /// New zone
        zone: ZoneId,
    },
    /// The reservation disappeared under the agent; it stopped walking
    Abandoned(EdgeId),
}

/// Moves `current` toward `target` by at most `max_step`.
#[must_use]
pub fn move_towards_x(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    }
}

/// Walks an agent toward the warp it holds and uses it on arrival.
///
/// Arrival means the horizontal distance to the transit point dropped
/// below `epsilon`. The agent is then released through the arbiter,
/// placed at the edge's exit point and its patrol is recentered.
pub fn advance(
    arbiter: &mut ReservationArbiter,
    agent: &mut AgentState,
    dt: f32,
    epsilon: f32,
    rng: &mut fastrand::Rng,
) -> Option<TransitEvent> {
    let edge_id = agent.transit?;

    if arbiter.holder(edge_id) != Some(agent.id) {
        warn!("{} lost its hold on {edge_id}, stopping", agent.name);
        agent.transit = None;
        return Some(TransitEvent::Abandoned(edge_id));
    }
    let Some(edge) = arbiter.edge(edge_id) else {
        agent.transit = None;
        return Some(TransitEvent::Abandoned(edge_id));
    };
    let target_x = edge.transit_point().x;
    let exit = Vec2::new(edge.exit_point().x, agent.position.y);
    let dest = edge.dest().clone();
    let name = edge.name().to_owned();

    let step = agent.patrol.tuning().speed * dt;
    agent.position.x = move_towards_x(agent.position.x, target_x, step);
    if agent.horizontal_distance(target_x) >= epsilon {
        return None;
    }

    debug!("{} using warp {name}", agent.name);
    arbiter.release(edge_id, agent.id);
    let old = agent.zone.clone();
    agent.place(dest.clone(), exit, rng);
    info!("{} moved: '{old}' → '{dest}'", agent.name);

    Some(TransitEvent::Arrived {
        edge: edge_id,
        zone: dest,
    })
}

/// Tries to start a patrol-triggered transit out of the agent's zone.
///
/// Winning a reservation or finding no edge at all restarts the timer at
/// the full patrol duration; losing a race restarts it at the retry delay.
pub fn attempt_transit(
    arbiter: &mut ReservationArbiter,
    agent: &mut AgentState,
    rng: &mut fastrand::Rng,
) -> Option<TransitEvent> {
    let zone = agent.zone.clone();
    arbiter.clear_destination_membership(agent.id, zone.as_str());

    let Some(edge) = arbiter.random_available_edge(zone.as_str(), agent.id, rng) else {
        debug!("{} found no available warps on '{zone}'", agent.name);
        agent.patrol.reset_timer();
        return None;
    };

    if arbiter.reserve(edge, agent.id) {
        agent.transit = Some(edge);
        agent.patrol.reset_timer();
        Some(TransitEvent::Reserved(edge))
    } else {
        debug!("{} lost {edge}, retrying shortly", agent.name);
        agent.patrol.back_off();
        None
    }
}

/// Runs one tick of ordinary patrol for an active agent.
///
/// While the agent holds a warp it walks there instead of patrolling and
/// the timer is paused.
pub fn run_patrol(
    arbiter: &mut ReservationArbiter,
    agent: &mut AgentState,
    dt: f32,
    epsilon: f32,
    rng: &mut fastrand::Rng,
) -> Option<TransitEvent> {
    if agent.is_in_transit() {
        return advance(arbiter, agent, dt, epsilon, rng);
    }

    agent.position.x = agent.patrol.step(agent.position.x, dt);
    if agent.patrol.tick_timer(dt) {
        return attempt_transit(arbiter, agent, rng);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRole;
    use crate::patrol::{PatrolController, PatrolTuning};
    use crate::zone::WarpSpec;
    use hallway_common::AgentId;

    fn setup() -> (ReservationArbiter, AgentState, EdgeId, fastrand::Rng) {
        let mut rng = fastrand::Rng::with_seed(11);
        let mut arbiter = ReservationArbiter::new();
        let edge = arbiter
            .register_edge(
                WarpSpec::new("Stairs_Up", "Floor1", "Floor2", Vec2::new(4.0, 0.0))
                    .with_exit(Vec2::new(30.0, 0.0)),
            )
            .expect("edge should register");

        let patrol = PatrolController::new(PatrolTuning::default(), 0.0, &mut rng);
        let agent = AgentState::new(
            AgentId::new(),
            "Guard",
            AgentRole::Guard,
            "Floor1",
            Vec2::ZERO,
            patrol,
        );
        arbiter.register_resident(agent.id, "Floor1");
        (arbiter, agent, edge, rng)
    }

    #[test]
    fn test_move_towards_x() {
        assert!((move_towards_x(0.0, 10.0, 3.0) - 3.0).abs() < f32::EPSILON);
        assert!((move_towards_x(0.0, -10.0, 3.0) + 3.0).abs() < f32::EPSILON);
        assert!((move_towards_x(9.0, 10.0, 3.0) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_attempt_then_advance_to_arrival() {
        let (mut arbiter, mut agent, edge, mut rng) = setup();

        let event = attempt_transit(&mut arbiter, &mut agent, &mut rng);
        assert_eq!(event, Some(TransitEvent::Reserved(edge)));
        assert_eq!(arbiter.holder(edge), Some(agent.id));

        let mut arrived = None;
        for _ in 0..10 {
            if let Some(event) = advance(&mut arbiter, &mut agent, 1.0, 0.5, &mut rng) {
                arrived = Some(event);
                break;
            }
        }

        assert_eq!(
            arrived,
            Some(TransitEvent::Arrived {
                edge,
                zone: ZoneId::from("Floor2"),
            })
        );
        assert_eq!(agent.zone.as_str(), "Floor2");
        assert!((agent.position.x - 30.0).abs() < f32::EPSILON);
        assert_eq!(agent.patrol.bounds(), (15.0, 45.0));
        assert_eq!(arbiter.holder(edge), None);
        assert_eq!(arbiter.zone_of(agent.id).map(ZoneId::as_str), Some("Floor2"));
    }

    #[test]
    fn test_attempt_without_edges_resets_timer() {
        let (mut arbiter, mut agent, _, mut rng) = setup();
        arbiter.register_resident(agent.id, "Floor2");
        agent.zone = ZoneId::from("Floor2");
        let _ = agent.patrol.tick_timer(10.0);

        assert_eq!(attempt_transit(&mut arbiter, &mut agent, &mut rng), None);
        assert!((agent.patrol.timer() - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_advance_abandons_cancelled_reservation() {
        let (mut arbiter, mut agent, edge, mut rng) = setup();
        assert!(attempt_transit(&mut arbiter, &mut agent, &mut rng).is_some());
        arbiter.cancel_reservation(agent.id);

        let event = advance(&mut arbiter, &mut agent, 0.1, 0.5, &mut rng);
        assert_eq!(event, Some(TransitEvent::Abandoned(edge)));
        assert!(!agent.is_in_transit());
    }

    #[test]
    fn test_run_patrol_triggers_transit_when_timer_expires() {
        let (mut arbiter, mut agent, edge, mut rng) = setup();

        let mut reserved = false;
        for _ in 0..20 {
            if run_patrol(&mut arbiter, &mut agent, 1.0, 0.5, &mut rng)
                == Some(TransitEvent::Reserved(edge))
            {
                reserved = true;
                break;
            }
        }
        assert!(reserved);
        assert!(agent.is_in_transit());
    }
}
