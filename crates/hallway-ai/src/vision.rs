//! Vision-driven escalation for the stalker.
//!
//! Escalation levels, lowest first:
//! - Patrol: ordinary patrol and timed transits
//! - Stalk: the stalker has seen the player; keeps a standoff distance
//! - Hunt: the player has seen the stalker; runs straight at the player
//!
//! Both raised levels are sticky. A sighting sets a latch that keeps the
//! level up on every later tick, whether or not anyone is still visible.
//! Only [`VisionEscalation::reset`] clears the latches.

use hallway_common::ZoneId;
use serde::{Deserialize, Serialize};

use crate::agent::AgentState;
use crate::player::PlayerTracker;

/// Escalation level. Ordered `Patrol < Stalk < Hunt`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum EscalationState {
    /// Not aware of the player
    #[default]
    Patrol,
    /// Following at a distance
    Stalk,
    /// Chasing
    Hunt,
}

impl EscalationState {
    /// Returns whether the state is above patrol.
    #[must_use]
    pub const fn is_aggressive(&self) -> bool {
        !matches!(self, EscalationState::Patrol)
    }
}

/// The two vision predicates for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisionSample {
    /// The stalker can see the player
    pub enemy_sees_player: bool,
    /// The player can see the stalker
    pub player_sees_enemy: bool,
}

impl VisionSample {
    /// Sample with neither side seeing the other.
    pub const NONE: Self = Self {
        enemy_sees_player: false,
        player_sees_enemy: false,
    };
}

/// Source of vision predicates, queried once per tick.
pub trait VisionProbe {
    /// Returns whether `agent` can see the player.
    fn enemy_sees_player(&self, agent: &AgentState, player: &PlayerTracker) -> bool;

    /// Returns whether the player can see `agent`.
    fn player_sees_enemy(&self, agent: &AgentState, player: &PlayerTracker) -> bool;

    /// Samples both predicates.
    fn sample(&self, agent: &AgentState, player: &PlayerTracker) -> VisionSample {
        VisionSample {
            enemy_sees_player: self.enemy_sees_player(agent, player),
            player_sees_enemy: self.player_sees_enemy(agent, player),
        }
    }
}

/// A change of escalation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationTransition {
    /// Level before the tick
    pub from: EscalationState,
    /// Level after the tick
    pub to: EscalationState,
}

impl EscalationTransition {
    /// Patrol to anything above it.
    #[must_use]
    pub const fn left_patrol(&self) -> bool {
        !self.from.is_aggressive() && self.to.is_aggressive()
    }

    /// Anything above patrol back to patrol.
    #[must_use]
    pub const fn returned_to_patrol(&self) -> bool {
        self.from.is_aggressive() && !self.to.is_aggressive()
    }
}

/// Escalation state machine with its two latches.
#[derive(Debug, Clone, Default)]
pub struct VisionEscalation {
    state: EscalationState,
    stalk_latch: bool,
    hunt_latch: bool,
}

impl VisionEscalation {
    /// Creates a machine in `Patrol` with both latches clear.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current level.
    #[must_use]
    pub const fn state(&self) -> EscalationState {
        self.state
    }

    /// Returns whether the stalk latch is set.
    #[must_use]
    pub const fn stalk_latched(&self) -> bool {
        self.stalk_latch
    }

    /// Returns whether the hunt latch is set.
    #[must_use]
    pub const fn hunt_latched(&self) -> bool {
        self.hunt_latch
    }

    /// Advances one tick. Returns the transition if the level changed.
    ///
    /// While `hiding` is true the level is forced to `Patrol` and the
    /// latches are neither read nor written.
    pub fn update(&mut self, sample: VisionSample, hiding: bool) -> Option<EscalationTransition> {
        let previous = self.state;

        self.state = if hiding {
            EscalationState::Patrol
        } else {
            self.hunt_latch |= sample.player_sees_enemy;
            self.stalk_latch |= sample.enemy_sees_player;
            if self.hunt_latch {
                EscalationState::Hunt
            } else if self.stalk_latch {
                EscalationState::Stalk
            } else {
                EscalationState::Patrol
            }
        };

        (previous != self.state).then_some(EscalationTransition {
            from: previous,
            to: self.state,
        })
    }

    /// Clears both latches and returns to `Patrol`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Horizontal line-of-sight check for side-scrolling zones.
///
/// Two points see each other when they share a zone, are within
/// `range` horizontally, and no blocking interval of that zone lies
/// strictly between them.
#[derive(Debug, Clone, Default)]
pub struct SightLine {
    range: f32,
    blockers: Vec<(ZoneId, f32, f32)>,
}

impl SightLine {
    /// Creates a sight line with no blockers.
    #[must_use]
    pub const fn new(range: f32) -> Self {
        Self {
            range,
            blockers: Vec::new(),
        }
    }

    /// Adds a wall spanning `[left, right]` in `zone`.
    #[must_use]
    pub fn with_blocker(mut self, zone: impl Into<ZoneId>, left: f32, right: f32) -> Self {
        self.blockers.push((zone.into(), left.min(right), left.max(right)));
        self
    }

    /// Returns the detection range.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Returns whether `from_x` in `from_zone` can see `to_x` in `to_zone`.
    #[must_use]
    pub fn can_see(&self, from_zone: &ZoneId, from_x: f32, to_zone: &ZoneId, to_x: f32) -> bool {
        if from_zone != to_zone || (from_x - to_x).abs() > self.range {
            return false;
        }
        let (low, high) = (from_x.min(to_x), from_x.max(to_x));
        !self
            .blockers
            .iter()
            .any(|(zone, left, right)| zone == from_zone && *left < high && *right > low)
    }
}

/// Vision probe built from two sight lines.
#[derive(Debug, Clone)]
pub struct SightLineProbe {
    /// What the stalker can see
    pub enemy: SightLine,
    /// What the player can see
    pub player: SightLine,
}

impl Default for SightLineProbe {
    fn default() -> Self {
        Self {
            enemy: SightLine::new(6.0),
            player: SightLine::new(10.0),
        }
    }
}

impl VisionProbe for SightLineProbe {
    fn enemy_sees_player(&self, agent: &AgentState, player: &PlayerTracker) -> bool {
        self.enemy
            .can_see(&agent.zone, agent.position.x, player.zone(), player.position().x)
    }

    fn player_sees_enemy(&self, agent: &AgentState, player: &PlayerTracker) -> bool {
        self.player
            .can_see(player.zone(), player.position().x, &agent.zone, agent.position.x)
    }
}
