//! Error types for Project Hallway.
//!
//! Only configuration problems are errors. Contention between agents
//! (a lost reservation, no free edge) is reported through plain return
//! values and never through these types.

use crate::ids::{AgentId, EdgeId};
use thiserror::Error;

/// Zone graph configuration errors.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// A warp object with this name was already registered
    #[error("Warp edge already registered: {0}")]
    DuplicateEdge(String),

    /// A warp object names no destination zone
    #[error("Warp edge {0} has no destination zone")]
    MissingDestination(String),

    /// A warp object names no source zone
    #[error("Warp edge {0} has no source zone")]
    MissingSource(String),

    /// Edge ID does not belong to this registry
    #[error("Unknown warp edge: {0}")]
    UnknownEdge(EdgeId),
}

/// Agent registration errors.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent already registered
    #[error("Agent already registered: {0}")]
    AlreadyRegistered(AgentId),

    /// A second stalker was registered; only one drives escalation
    #[error("A stalker is already registered: {0}")]
    StalkerTaken(AgentId),
}

/// Result type alias for zone graph operations.
pub type ZoneResult<T> = Result<T, ZoneError>;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
