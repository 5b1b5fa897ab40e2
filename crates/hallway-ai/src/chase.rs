//! Pursuit of the player by an escalated stalker.
//!
//! Across zones the stalker picks a random available warp each tick and
//! only commits when it happens to lead to the player's zone. Inside the
//! player's zone the [`ProximityController`] takes over.

use hallway_common::{EdgeId, ZoneId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::AgentState;
use crate::reservation::ReservationArbiter;
use crate::transit::{self, move_towards_x, TransitEvent};
use crate::vision::EscalationState;

/// Result of one chase tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChaseOutcome {
    /// No warp out of the zone is available; retry next tick
    NoEdges,
    /// The random pick does not lead to the player; retry next tick
    WrongDestination(EdgeId),
    /// The pick leads to the player but another agent won it
    LostRace(EdgeId),
    /// Reservation won, walking started
    Departed(EdgeId),
    /// Still walking to the warp
    Walking(EdgeId),
    /// Used the warp
    Arrived {
        /// Edge that was used
        edge: EdgeId,
        /// New zone
        zone: ZoneId,
    },
    /// The held reservation vanished
    Abandoned(EdgeId),
}

impl ChaseOutcome {
    /// Returns the transit event this outcome corresponds to, if any.
    #[must_use]
    pub fn transit_event(&self) -> Option<TransitEvent> {
        match self {
            ChaseOutcome::Departed(edge) => Some(TransitEvent::Reserved(*edge)),
            ChaseOutcome::Arrived { edge, zone } => Some(TransitEvent::Arrived {
                edge: *edge,
                zone: zone.clone(),
            }),
            ChaseOutcome::Abandoned(edge) => Some(TransitEvent::Abandoned(*edge)),
            _ => None,
        }
    }
}

/// Drives zone-to-zone pursuit.
#[derive(Debug, Clone, Copy)]
pub struct FloorChaseCoordinator {
    arrival_epsilon: f32,
}

impl FloorChaseCoordinator {
    /// Creates a coordinator using `arrival_epsilon` as the arrival distance.
    #[must_use]
    pub const fn new(arrival_epsilon: f32) -> Self {
        Self { arrival_epsilon }
    }

    /// Runs one chase tick for `agent` toward `player_zone`.
    ///
    /// Callers invoke this only while the agent is escalated and in a
    /// different zone than the player. There is no back-off between
    /// attempts.
    pub fn step(
        &self,
        arbiter: &mut ReservationArbiter,
        agent: &mut AgentState,
        player_zone: &ZoneId,
        dt: f32,
        rng: &mut fastrand::Rng,
    ) -> ChaseOutcome {
        if let Some(edge) = agent.transit {
            return match transit::advance(arbiter, agent, dt, self.arrival_epsilon, rng) {
                Some(TransitEvent::Arrived { edge, zone }) => ChaseOutcome::Arrived { edge, zone },
                Some(TransitEvent::Abandoned(edge)) => ChaseOutcome::Abandoned(edge),
                Some(TransitEvent::Reserved(_)) | None => ChaseOutcome::Walking(edge),
            };
        }

        let zone = agent.zone.clone();
        arbiter.clear_destination_membership(agent.id, zone.as_str());

        let Some(edge) = arbiter.random_available_edge(zone.as_str(), agent.id, rng) else {
            debug!("{} has no warps out of '{zone}' to chase through", agent.name);
            return ChaseOutcome::NoEdges;
        };

        let leads_to_player = arbiter
            .edge(edge)
            .is_some_and(|warp| warp.dest() == player_zone);
        if !leads_to_player {
            return ChaseOutcome::WrongDestination(edge);
        }

        if arbiter.reserve(edge, agent.id) {
            debug!("{} chasing player through {edge}", agent.name);
            agent.transit = Some(edge);
            ChaseOutcome::Departed(edge)
        } else {
            ChaseOutcome::LostRace(edge)
        }
    }
}

/// Standoff tuning for pursuit inside the player's zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityTuning {
    /// Speed while stalking
    pub stalk_speed: f32,
    /// Speed while hunting
    pub hunt_speed: f32,
    /// Distance a stalker tries to keep
    pub preferred_distance: f32,
    /// Beyond this distance a stalker stops closing in
    pub maintain_range: f32,
}

impl Default for ProximityTuning {
    fn default() -> Self {
        Self {
            stalk_speed: 2.5,
            hunt_speed: 5.0,
            preferred_distance: 10.0,
            maintain_range: 12.0,
        }
    }
}

/// Approach and retreat inside the player's zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProximityController {
    tuning: ProximityTuning,
}

impl ProximityController {
    /// Distance a too-close stalker retreats toward per decision.
    const BACK_OFF: f32 = 1.5;
    /// Dead band around the preferred distance.
    const SLACK: f32 = 1.0;

    /// Creates a controller.
    #[must_use]
    pub const fn new(tuning: ProximityTuning) -> Self {
        Self { tuning }
    }

    /// Returns the agent's next x position.
    #[must_use]
    pub fn step(&self, state: EscalationState, agent_x: f32, player_x: f32, dt: f32) -> f32 {
        match state {
            EscalationState::Patrol => agent_x,
            EscalationState::Hunt => move_towards_x(agent_x, player_x, self.tuning.hunt_speed * dt),
            EscalationState::Stalk => {
                let distance = (agent_x - player_x).abs();
                let step = self.tuning.stalk_speed * dt;
                if distance > self.tuning.preferred_distance + Self::SLACK
                    && distance < self.tuning.maintain_range
                {
                    move_towards_x(agent_x, player_x, step)
                } else if distance < self.tuning.preferred_distance - Self::SLACK {
                    let away = if agent_x > player_x { Self::BACK_OFF } else { -Self::BACK_OFF };
                    move_towards_x(agent_x, agent_x + away, step)
                } else {
                    agent_x
                }
            },
        }
    }
}
