//! Outbound notifications for rendering, locomotion and UI collaborators.
//!
//! Delivery is best effort: when the bus is full new events are dropped.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use hallway_common::{AgentId, EdgeId, ZoneId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::vision::EscalationState;

/// Events published by the director.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneEvent {
    /// Agent became present; show its physical representation
    AgentActivated {
        /// Agent ID
        agent: AgentId,
        /// Zone it appeared in
        zone: ZoneId,
    },
    /// Agent was removed from the scene; hide it
    AgentDeactivated {
        /// Agent ID
        agent: AgentId,
    },
    /// Agent came out of a warp in a new zone
    AgentArrivedAtZone {
        /// Agent ID
        agent: AgentId,
        /// New zone
        zone: ZoneId,
    },
    /// Stalker changed escalation level
    EscalationChanged {
        /// Agent ID
        agent: AgentId,
        /// Previous level
        from: EscalationState,
        /// New level
        to: EscalationState,
    },
    /// Agent won a warp reservation
    ReservationAcquired {
        /// Agent ID
        agent: AgentId,
        /// Reserved edge
        edge: EdgeId,
    },
    /// Agent used a warp and released it
    TransitCompleted {
        /// Agent ID
        agent: AgentId,
        /// Edge used
        edge: EdgeId,
    },
}

impl SceneEvent {
    /// Returns the agent the event is about.
    #[must_use]
    pub const fn agent(&self) -> AgentId {
        match self {
            SceneEvent::AgentActivated { agent, .. }
            | SceneEvent::AgentDeactivated { agent }
            | SceneEvent::AgentArrivedAtZone { agent, .. }
            | SceneEvent::EscalationChanged { agent, .. }
            | SceneEvent::ReservationAcquired { agent, .. }
            | SceneEvent::TransitCompleted { agent, .. } => *agent,
        }
    }
}

/// Bounded event bus.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<SceneEvent>,
    receiver: Receiver<SceneEvent>,
    capacity: usize,
    dropped: AtomicUsize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity,
            dropped: AtomicUsize::new(0),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: SceneEvent) {
        if let Err(TrySendError::Full(event) | TrySendError::Disconnected(event)) =
            self.sender.try_send(event)
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("Event bus full, dropped {event:?}");
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<SceneEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many events were dropped because the bus was full.
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(4);
        let agent = AgentId::new();
        bus.publish(SceneEvent::AgentDeactivated { agent });
        bus.publish(SceneEvent::AgentActivated {
            agent,
            zone: ZoneId::from("Floor1"),
        });

        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].agent(), agent);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(1);
        let agent = AgentId::new();
        bus.publish(SceneEvent::AgentDeactivated { agent });
        bus.publish(SceneEvent::AgentDeactivated { agent });

        assert_eq!(bus.drain().len(), 1);
        assert_eq!(bus.dropped_count(), 1);
        assert_eq!(bus.capacity(), 1);
    }
}
