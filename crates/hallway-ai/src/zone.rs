//! Static zone graph: zones and the one-way warp edges between them.
//!
//! The registry is filled once at scene load and never shrinks. It holds
//! no per-agent state; reservations and residency live in
//! [`ReservationArbiter`](crate::reservation::ReservationArbiter).

use ahash::AHashMap;
use glam::Vec2;
use hallway_common::{EdgeId, ZoneError, ZoneId, ZoneResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Description of one physical warp object (door, stairs, ladder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarpSpec {
    /// Unique name of the physical object
    pub name: String,
    /// Zone the warp is entered from
    pub from: ZoneId,
    /// Zone the warp leads to
    pub to: ZoneId,
    /// Point an agent walks to before it can use the warp
    pub transit: Vec2,
    /// Point the agent appears at on the destination side
    #[serde(default)]
    pub exit: Option<Vec2>,
}

impl WarpSpec {
    /// Creates a warp spec without an explicit exit point.
    #[must_use]
    pub fn new(name: impl Into<String>, from: impl Into<ZoneId>, to: impl Into<ZoneId>, transit: Vec2) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            to: to.into(),
            transit,
            exit: None,
        }
    }

    /// Sets the exit point on the destination side.
    #[must_use]
    pub fn with_exit(mut self, exit: Vec2) -> Self {
        self.exit = Some(exit);
        self
    }
}

/// A registered one-way warp edge.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpEdge {
    id: EdgeId,
    name: String,
    source: ZoneId,
    dest: ZoneId,
    transit_point: Vec2,
    exit_point: Vec2,
}

impl WarpEdge {
    /// Returns the edge ID.
    #[must_use]
    pub const fn id(&self) -> EdgeId {
        self.id
    }

    /// Returns the name of the physical warp object.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the zone the edge starts in.
    #[must_use]
    pub const fn source(&self) -> &ZoneId {
        &self.source
    }

    /// Returns the zone the edge leads to.
    #[must_use]
    pub const fn dest(&self) -> &ZoneId {
        &self.dest
    }

    /// Returns the point an agent must reach to use the edge.
    #[must_use]
    pub const fn transit_point(&self) -> Vec2 {
        self.transit_point
    }

    /// Returns where an agent is placed after using the edge.
    #[must_use]
    pub const fn exit_point(&self) -> Vec2 {
        self.exit_point
    }
}

/// Table of zones and warp edges.
#[derive(Debug, Default, Clone)]
pub struct ZoneRegistry {
    /// Zones in first-seen order
    zones: Vec<ZoneId>,
    /// Edges indexed by `EdgeId`
    edges: Vec<WarpEdge>,
    /// Physical object name -> edge
    by_name: AHashMap<String, EdgeId>,
    /// Zone -> edges leaving it
    outgoing: AHashMap<ZoneId, Vec<EdgeId>>,
    /// Zone -> edges entering it
    incoming: AHashMap<ZoneId, Vec<EdgeId>>,
}

impl ZoneRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a zone. Returns `false` if it was already known.
    pub fn register_zone(&mut self, zone: impl Into<ZoneId>) -> bool {
        let zone = zone.into();
        if self.contains_zone(zone.as_str()) {
            return false;
        }
        info!("Registered zone '{zone}'");
        self.outgoing.entry(zone.clone()).or_default();
        self.incoming.entry(zone.clone()).or_default();
        self.zones.push(zone);
        true
    }

    /// Registers a warp edge, registering its zones on first sight.
    ///
    /// A second registration of the same physical object is rejected.
    pub fn register_edge(&mut self, spec: WarpSpec) -> ZoneResult<EdgeId> {
        if self.by_name.contains_key(&spec.name) {
            warn!("{} already registered, skipping", spec.name);
            return Err(ZoneError::DuplicateEdge(spec.name));
        }
        if !spec.from.is_named() {
            error!("Warp {} has no source zone", spec.name);
            return Err(ZoneError::MissingSource(spec.name));
        }
        if !spec.to.is_named() {
            error!("Warp {} has no destination zone", spec.name);
            return Err(ZoneError::MissingDestination(spec.name));
        }

        self.register_zone(spec.from.clone());
        self.register_zone(spec.to.clone());

        let id = EdgeId::new(self.edges.len() as u32);
        info!("Registered warp {}: {} → {}", spec.name, spec.from, spec.to);

        self.outgoing.entry(spec.from.clone()).or_default().push(id);
        self.incoming.entry(spec.to.clone()).or_default().push(id);
        self.by_name.insert(spec.name.clone(), id);
        self.edges.push(WarpEdge {
            id,
            name: spec.name,
            source: spec.from,
            dest: spec.to,
            transit_point: spec.transit,
            exit_point: spec.exit.unwrap_or(spec.transit),
        });

        Ok(id)
    }

    /// Gets an edge by ID.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&WarpEdge> {
        self.edges.get(id.index())
    }

    /// Gets an edge by ID, reporting unknown IDs as an error.
    pub fn try_edge(&self, id: EdgeId) -> ZoneResult<&WarpEdge> {
        self.edge(id).ok_or(ZoneError::UnknownEdge(id))
    }

    /// Looks up an edge by the name of its physical object.
    #[must_use]
    pub fn edge_by_name(&self, name: &str) -> Option<&WarpEdge> {
        self.by_name.get(name).and_then(|&id| self.edge(id))
    }

    /// Returns all edges in registration order.
    pub fn edges(&self) -> impl Iterator<Item = &WarpEdge> {
        self.edges.iter()
    }

    /// Returns the edges leaving a zone.
    #[must_use]
    pub fn edges_from(&self, zone: &str) -> &[EdgeId] {
        self.outgoing.get(zone).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the edges entering a zone.
    #[must_use]
    pub fn edges_into(&self, zone: &str) -> &[EdgeId] {
        self.incoming.get(zone).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns all zones in first-seen order.
    #[must_use]
    pub fn zones(&self) -> &[ZoneId] {
        &self.zones
    }

    /// Returns whether a zone is registered.
    #[must_use]
    pub fn contains_zone(&self, zone: &str) -> bool {
        self.outgoing.contains_key(zone)
    }

    /// Returns the number of zones.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns a point in `zone` where an agent can be placed.
    ///
    /// Any warp leaving the zone serves as a spawn point; the first one
    /// registered wins. Zones without outgoing warps have none.
    #[must_use]
    pub fn spawn_point(&self, zone: &str) -> Option<Vec2> {
        self.edges_from(zone)
            .first()
            .and_then(|&id| self.edge(id))
            .map(WarpEdge::transit_point)
    }
}
