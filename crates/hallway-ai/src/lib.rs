//! # Hallway AI
//!
//! Coordination core for the non-player agents of Project Hallway.
//!
//! This crate provides:
//! - Zone graph of floors and one-way warps
//! - Reservation arbiter for exclusive warp use
//! - Patrol with timed transits
//! - Vision escalation (Patrol → Stalk → Hunt)
//! - Floor chase and in-zone standoff
//! - Guard disable/respawn lifecycle
//! - Scene director, config and outbound event bus

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod chase;
pub mod config;
pub mod director;
pub mod events;
pub mod lifecycle;
pub mod patrol;
pub mod player;
pub mod reservation;
pub mod transit;
pub mod vision;
pub mod zone;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::chase::*;
    pub use crate::config::*;
    pub use crate::director::*;
    pub use crate::events::*;
    pub use crate::patrol::*;
    pub use crate::player::*;
    pub use crate::reservation::*;
    pub use crate::transit::TransitEvent;
    pub use crate::vision::*;
    pub use crate::zone::*;
}

pub use prelude::*;
