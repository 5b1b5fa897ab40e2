//! Per-agent state.

use glam::Vec2;
use hallway_common::{AgentId, EdgeId, ZoneId};
use serde::{Deserialize, Serialize};

use crate::patrol::PatrolController;

/// Role of a non-player agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Passive patroller, disabled while the stalker is aggressive
    Guard,
    /// Vision-driven pursuer
    Stalker,
}

impl AgentRole {
    /// Returns whether this role reacts to vision.
    #[must_use]
    pub const fn escalates(&self) -> bool {
        matches!(self, AgentRole::Stalker)
    }
}

/// State of an individual agent.
#[derive(Debug, Clone)]
pub struct AgentState {
    /// Agent ID
    pub id: AgentId,
    /// Display name, used in logs
    pub name: String,
    /// Role
    pub role: AgentRole,
    /// Zone the agent is in (last known zone while deactivated)
    pub zone: ZoneId,
    /// Current position
    pub position: Vec2,
    /// Whether the agent is present in the scene
    pub active: bool,
    /// Edge the agent is walking to, if any
    pub transit: Option<EdgeId>,
    /// Patrol bounds and transit timer
    pub patrol: PatrolController,
}

impl AgentState {
    /// Creates an active agent.
    #[must_use]
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        role: AgentRole,
        zone: impl Into<ZoneId>,
        position: Vec2,
        patrol: PatrolController,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            zone: zone.into(),
            position,
            active: true,
            transit: None,
            patrol,
        }
    }

    /// Returns whether the agent is walking to a warp.
    #[must_use]
    pub const fn is_in_transit(&self) -> bool {
        self.transit.is_some()
    }

    /// Places the agent in a zone and recenters its patrol there.
    pub fn place(&mut self, zone: ZoneId, position: Vec2, rng: &mut fastrand::Rng) {
        self.zone = zone;
        self.position = position;
        self.transit = None;
        self.patrol.rebase(position.x, rng);
    }

    /// Returns the horizontal distance to a point.
    #[must_use]
    pub fn horizontal_distance(&self, x: f32) -> f32 {
        (self.position.x - x).abs()
    }
}
