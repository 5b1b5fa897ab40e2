//! Tracked player state, fed by the host.

use glam::Vec2;
use hallway_common::ZoneId;
use serde::Serialize;
use tracing::debug;

/// Last known zone, position and concealment of the player.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerTracker {
    zone: ZoneId,
    position: Vec2,
    hiding: bool,
}

impl PlayerTracker {
    /// Creates a visible player in `zone`.
    #[must_use]
    pub fn new(zone: impl Into<ZoneId>) -> Self {
        Self {
            zone: zone.into(),
            position: Vec2::ZERO,
            hiding: false,
        }
    }

    /// Returns the player's zone.
    #[must_use]
    pub const fn zone(&self) -> &ZoneId {
        &self.zone
    }

    /// Returns the player's position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Returns whether the player is hiding.
    #[must_use]
    pub const fn is_hiding(&self) -> bool {
        self.hiding
    }

    /// Records a zone change. Returns `false` if the zone did not change.
    pub fn set_zone(&mut self, zone: impl Into<ZoneId>) -> bool {
        let zone = zone.into();
        if zone == self.zone {
            return false;
        }
        debug!("Player: '{}' → '{zone}'", self.zone);
        self.zone = zone;
        true
    }

    /// Records the player's position.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Records a concealment change. Returns `false` if nothing changed.
    pub fn set_hiding(&mut self, hiding: bool) -> bool {
        if hiding == self.hiding {
            return false;
        }
        self.hiding = hiding;
        true
    }
}
