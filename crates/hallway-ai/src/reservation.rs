//! Warp reservation arbiter.
//!
//! The arbiter owns every piece of mutable transit bookkeeping:
//! - which agents are resident in which zone,
//! - which agent (if any) holds the reservation on each edge,
//! - which agents arrived through each edge and have not yet moved on
//!   (destination occupancy).
//!
//! Listing available edges and reserving one are separate calls. Another
//! agent may win the edge in between, so callers must treat the result of
//! [`ReservationArbiter::reserve`] as the only authoritative answer.
//!
//! The arbiter is a plain single-owner value. Hosts that drive agents from
//! several threads wrap it in a [`SharedArbiter`], which serializes every
//! operation behind one mutex.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use hallway_common::{AgentId, EdgeId, ZoneId, ZoneResult};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::zone::{WarpEdge, WarpSpec, ZoneRegistry};

/// Arbiter shared between threads.
pub type SharedArbiter = Arc<Mutex<ReservationArbiter>>;

/// Observable transit status of a resident agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitStatus {
    /// Zone the agent is resident in
    pub zone: ZoneId,
    /// Whether the agent holds a reservation and is walking to it
    pub moving_to_warp: bool,
    /// Edge the agent is walking to
    pub target_edge: Option<EdgeId>,
    /// Edge the agent most recently arrived through
    pub arrived_via: Option<EdgeId>,
}

impl TransitStatus {
    fn resident(zone: ZoneId) -> Self {
        Self {
            zone,
            moving_to_warp: false,
            target_edge: None,
            arrived_via: None,
        }
    }
}

/// Mutable state of one edge.
#[derive(Debug, Default, Clone)]
struct EdgeState {
    /// Agent holding the reservation
    holder: Option<AgentId>,
    /// Agents that arrived through this edge and are still at its destination
    arrivals: AHashSet<AgentId>,
}

/// Owner of reservation and residency state for one scene.
#[derive(Debug, Default, Clone)]
pub struct ReservationArbiter {
    /// Static zone graph
    registry: ZoneRegistry,
    /// Per-edge state, indexed like the registry's edges
    edge_states: Vec<EdgeState>,
    /// Resident agents per zone
    residents: AHashMap<ZoneId, AHashSet<AgentId>>,
    /// Status of every resident agent
    statuses: AHashMap<AgentId, TransitStatus>,
}

impl ReservationArbiter {
    /// Creates an arbiter with an empty zone graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an arbiter over an already populated registry.
    #[must_use]
    pub fn with_registry(registry: ZoneRegistry) -> Self {
        let edge_states = vec![EdgeState::default(); registry.edge_count()];
        Self {
            registry,
            edge_states,
            residents: AHashMap::new(),
            statuses: AHashMap::new(),
        }
    }

    /// Wraps the arbiter for use from several threads.
    #[must_use]
    pub fn into_shared(self) -> SharedArbiter {
        Arc::new(Mutex::new(self))
    }

    /// Returns the zone graph.
    #[must_use]
    pub const fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Registers a zone. Returns `false` if it was already known.
    pub fn register_zone(&mut self, zone: impl Into<ZoneId>) -> bool {
        self.registry.register_zone(zone)
    }

    /// Registers a warp edge.
    pub fn register_edge(&mut self, spec: WarpSpec) -> ZoneResult<EdgeId> {
        let id = self.registry.register_edge(spec)?;
        self.edge_states.push(EdgeState::default());
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Residency
    // ------------------------------------------------------------------

    /// Makes `agent` resident in `zone`, moving it out of any other zone.
    ///
    /// An unknown zone is registered on the spot with a warning.
    pub fn register_resident(&mut self, agent: AgentId, zone: impl Into<ZoneId>) {
        let zone = zone.into();
        if !self.registry.contains_zone(zone.as_str()) {
            warn!("{agent} registered on unknown zone '{zone}', registering it");
            self.registry.register_zone(zone.clone());
        }

        if let Some(previous) = self.statuses.get(&agent).map(|s| s.zone.clone()) {
            self.remove_from_zone(agent, &previous);
        }

        self.residents.entry(zone.clone()).or_default().insert(agent);
        self.statuses.insert(agent, TransitStatus::resident(zone.clone()));
        info!("Registered {agent} on '{zone}'");
    }

    /// Removes `agent` from all tracking.
    ///
    /// Releases any reservation it holds and drops it from every edge's
    /// destination occupancy before returning. Returns whether the agent
    /// was resident.
    pub fn unregister(&mut self, agent: AgentId) -> bool {
        for state in &mut self.edge_states {
            if state.holder == Some(agent) {
                state.holder = None;
            }
            state.arrivals.remove(&agent);
        }

        match self.statuses.remove(&agent) {
            Some(status) => {
                self.remove_from_zone(agent, &status.zone);
                info!("Unregistered {agent} from '{}'", status.zone);
                true
            },
            None => false,
        }
    }

    /// Returns the zone an agent is resident in.
    #[must_use]
    pub fn zone_of(&self, agent: AgentId) -> Option<&ZoneId> {
        self.statuses.get(&agent).map(|s| &s.zone)
    }

    /// Returns whether an agent is resident anywhere.
    #[must_use]
    pub fn is_resident(&self, agent: AgentId) -> bool {
        self.statuses.contains_key(&agent)
    }

    /// Returns the agents resident in a zone.
    pub fn residents(&self, zone: &str) -> impl Iterator<Item = AgentId> + '_ {
        self.residents.get(zone).into_iter().flatten().copied()
    }

    /// Returns how many agents are resident in a zone.
    #[must_use]
    pub fn resident_count(&self, zone: &str) -> usize {
        self.residents.get(zone).map_or(0, |set| set.len())
    }

    /// Returns the observable status of an agent.
    #[must_use]
    pub fn status(&self, agent: AgentId) -> Option<&TransitStatus> {
        self.statuses.get(&agent)
    }

    /// Returns whether a zone holds any resident other than `requester`.
    #[must_use]
    pub fn is_zone_occupied_by_other(&self, zone: &str, requester: AgentId) -> bool {
        self.residents(zone).any(|agent| agent != requester)
    }

    // ------------------------------------------------------------------
    // Edge queries
    // ------------------------------------------------------------------

    /// Returns the agent holding the reservation on an edge.
    #[must_use]
    pub fn holder(&self, edge: EdgeId) -> Option<AgentId> {
        self.edge_states.get(edge.index()).and_then(|s| s.holder)
    }

    /// Returns whether `agent` is in the destination occupancy of `edge`.
    #[must_use]
    pub fn has_arrived_via(&self, edge: EdgeId, agent: AgentId) -> bool {
        self.edge_states
            .get(edge.index())
            .is_some_and(|s| s.arrivals.contains(&agent))
    }

    /// Returns the destination occupancy of an edge, sorted by agent ID.
    #[must_use]
    pub fn arrivals(&self, edge: EdgeId) -> Vec<AgentId> {
        let mut arrivals: Vec<AgentId> = self
            .edge_states
            .get(edge.index())
            .map(|s| s.arrivals.iter().copied().collect())
            .unwrap_or_default();
        arrivals.sort_unstable();
        arrivals
    }

    /// Returns the edges out of `zone` that `requester` may try to reserve.
    ///
    /// An edge qualifies when it is unreserved or reserved by `requester`,
    /// `requester` is not already recorded as arrived through it, and its
    /// destination zone holds no other resident. The order is registration
    /// order; callers pick among the results themselves.
    #[must_use]
    pub fn list_available_edges(&self, zone: &str, requester: AgentId) -> Vec<EdgeId> {
        let available: Vec<EdgeId> = self
            .registry
            .edges_from(zone)
            .iter()
            .copied()
            .filter(|&id| self.is_available(id, requester))
            .collect();

        debug!(
            "Zone '{zone}': found {} available warps for {requester}",
            available.len()
        );
        available
    }

    /// Picks one available edge uniformly at random.
    pub fn random_available_edge(
        &self,
        zone: &str,
        requester: AgentId,
        rng: &mut fastrand::Rng,
    ) -> Option<EdgeId> {
        let available = self.list_available_edges(zone, requester);
        if available.is_empty() {
            return None;
        }
        let selected = available[rng.usize(..available.len())];
        if let Some(edge) = self.registry.edge(selected) {
            debug!("{requester} selected {} (→ {})", edge.name(), edge.dest());
        }
        Some(selected)
    }

    fn is_available(&self, id: EdgeId, requester: AgentId) -> bool {
        let (Some(edge), Some(state)) = (self.registry.edge(id), self.edge_states.get(id.index()))
        else {
            return false;
        };
        state.holder.map_or(true, |holder| holder == requester)
            && !state.arrivals.contains(&requester)
            && !self.is_zone_occupied_by_other(edge.dest().as_str(), requester)
    }

    // ------------------------------------------------------------------
    // Reservation protocol
    // ------------------------------------------------------------------

    /// Tries to reserve `edge` for `requester`.
    ///
    /// Succeeds when the edge is free or already held by `requester` and
    /// the destination zone holds no other resident. Failure leaves all
    /// state untouched; it means "try another edge or wait a tick".
    pub fn reserve(&mut self, edge: EdgeId, requester: AgentId) -> bool {
        let Some(warp) = self.registry.edge(edge) else {
            warn!("{requester} tried to reserve unknown {edge}");
            return false;
        };
        if !self.statuses.contains_key(&requester) {
            warn!("{requester} is not resident anywhere, refusing {}", warp.name());
            return false;
        }

        let holder = self.edge_states.get(edge.index()).and_then(|s| s.holder);
        if let Some(other) = holder.filter(|&h| h != requester) {
            debug!("{} already reserved by {other}", warp.name());
            return false;
        }
        if self.is_zone_occupied_by_other(warp.dest().as_str(), requester) {
            debug!(
                "{} refused for {requester}: '{}' is occupied",
                warp.name(),
                warp.dest()
            );
            return false;
        }

        debug!("{requester} reserved {} → {}", warp.name(), warp.dest());
        if let Some(state) = self.edge_states.get_mut(edge.index()) {
            state.holder = Some(requester);
        }
        if let Some(status) = self.statuses.get_mut(&requester) {
            status.moving_to_warp = true;
            status.target_edge = Some(edge);
        }
        true
    }

    /// Completes a transit through `edge`.
    ///
    /// Moves `requester` from the edge's source zone to its destination,
    /// records it in the edge's destination occupancy, then clears the
    /// reservation. Calling it again with nothing changed in between leaves
    /// the same state. A reservation held by a different agent is left
    /// alone.
    pub fn release(&mut self, edge: EdgeId, requester: AgentId) {
        let Some(warp) = self.registry.edge(edge) else {
            warn!("{requester} tried to release unknown {edge}");
            return;
        };
        let (source, dest, name) = (warp.source().clone(), warp.dest().clone(), warp.name().to_owned());

        if !self.statuses.contains_key(&requester) {
            warn!("{requester} released {name} while not resident, ignoring");
            return;
        }
        if let Some(other) = self.holder(edge).filter(|&h| h != requester) {
            warn!("{requester} released {name} but it is held by {other}, ignoring");
            return;
        }

        debug!("{requester} completed warp via {name}");
        self.remove_from_zone(requester, &source);
        if let Some(previous) = self.zone_of(requester).cloned() {
            self.remove_from_zone(requester, &previous);
        }
        self.residents.entry(dest.clone()).or_default().insert(requester);

        if let Some(state) = self.edge_states.get_mut(edge.index()) {
            if state.arrivals.insert(requester) {
                debug!("{requester} marked at destination of {name}");
            }
            state.holder = None;
        }

        if let Some(status) = self.statuses.get_mut(&requester) {
            if status.zone != dest {
                debug!("{requester}: '{}' → '{dest}'", status.zone);
            }
            status.zone = dest;
            status.moving_to_warp = false;
            status.target_edge = None;
            status.arrived_via = Some(edge);
        }
    }

    /// Abandons whatever reservation `requester` holds.
    ///
    /// Clears the holder and removes `requester` from that edge's
    /// destination occupancy. Returns the abandoned edge.
    pub fn cancel_reservation(&mut self, requester: AgentId) -> Option<EdgeId> {
        let index = self
            .edge_states
            .iter()
            .position(|s| s.holder == Some(requester))?;
        let edge = EdgeId::new(index as u32);

        if let Some(state) = self.edge_states.get_mut(index) {
            state.holder = None;
            state.arrivals.remove(&requester);
        }
        if let Some(status) = self.statuses.get_mut(&requester) {
            status.moving_to_warp = false;
            status.target_edge = None;
        }
        if let Some(warp) = self.registry.edge(edge) {
            debug!("{requester} cancelled reservation for {}", warp.name());
        }
        Some(edge)
    }

    /// Forgets that `requester` arrived in `leaving_zone` through any edge.
    ///
    /// Called before an agent looks for a new transit out of the zone it is
    /// in, so edges into that zone stop treating it as freshly arrived.
    pub fn clear_destination_membership(&mut self, requester: AgentId, leaving_zone: &str) {
        for &id in self.registry.edges_into(leaving_zone) {
            if let Some(state) = self.edge_states.get_mut(id.index()) {
                if state.arrivals.remove(&requester) {
                    if let Some(warp) = self.registry.edge(id) {
                        debug!("{requester} cleared from destination of {}", warp.name());
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    /// Captures the full reservation table.
    #[must_use]
    pub fn snapshot(&self) -> ArbiterSnapshot {
        let edges = self
            .registry
            .edges()
            .map(|edge| EdgeSnapshot {
                id: edge.id(),
                name: edge.name().to_owned(),
                from: edge.source().clone(),
                to: edge.dest().clone(),
                holder: self.holder(edge.id()),
                arrivals: self.arrivals(edge.id()),
            })
            .collect();

        let zones = self
            .registry
            .zones()
            .iter()
            .map(|zone| ZoneSnapshot {
                zone: zone.clone(),
                edge_count: self.registry.edges_from(zone.as_str()).len(),
                resident_count: self.resident_count(zone.as_str()),
            })
            .collect();

        let mut agents: Vec<AgentSnapshot> = self
            .statuses
            .iter()
            .map(|(&agent, status)| AgentSnapshot {
                agent,
                status: status.clone(),
            })
            .collect();
        agents.sort_by_key(|a| a.agent);

        ArbiterSnapshot {
            edges,
            zones,
            agents,
        }
    }

    fn remove_from_zone(&mut self, agent: AgentId, zone: &ZoneId) {
        if let Some(set) = self.residents.get_mut(zone.as_str()) {
            set.remove(&agent);
        }
    }

    /// Returns the edge record, if registered.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&WarpEdge> {
        self.registry.edge(edge)
    }
}

/// Point-in-time copy of the reservation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbiterSnapshot {
    /// Every edge with its holder and arrivals
    pub edges: Vec<EdgeSnapshot>,
    /// Every zone with edge and resident counts
    pub zones: Vec<ZoneSnapshot>,
    /// Every resident agent's status
    pub agents: Vec<AgentSnapshot>,
}

/// Snapshot of one edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSnapshot {
    /// Edge ID
    pub id: EdgeId,
    /// Physical object name
    pub name: String,
    /// Source zone
    pub from: ZoneId,
    /// Destination zone
    pub to: ZoneId,
    /// Reservation holder
    pub holder: Option<AgentId>,
    /// Destination occupancy
    pub arrivals: Vec<AgentId>,
}

/// Snapshot of one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSnapshot {
    /// Zone name
    pub zone: ZoneId,
    /// Number of edges leaving the zone
    pub edge_count: usize,
    /// Number of resident agents
    pub resident_count: usize,
}

/// Snapshot of one resident agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    /// Agent ID
    pub agent: AgentId,
    /// Transit status
    pub status: TransitStatus,
}
