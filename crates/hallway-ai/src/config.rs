//! Scene tuning and layout files.
//!
//! Tuning (`SceneConfig`) is forgiving: a missing or broken file falls back
//! to defaults. Layouts (`SceneLayout`) describe the zone graph and agents
//! and report problems as errors.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::agent::AgentRole;
use crate::chase::ProximityTuning;
use crate::patrol::PatrolTuning;
use crate::zone::WarpSpec;

/// Errors raised while loading a layout.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// File is not valid TOML for this schema
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tuning parameters for a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    // === Patrol ===
    /// Patrol walking speed, also used to walk to warps
    pub patrol_speed: f32,
    /// Half-width of the patrol band
    pub patrol_distance: f32,
    /// Seconds between patrol-triggered transit attempts
    pub patrol_duration: f32,
    /// Seconds to wait after losing a reservation race
    pub retry_delay: f32,
    /// Distance at which an agent counts as standing at a warp
    pub arrival_epsilon: f32,

    // === Stalker ===
    /// Speed while stalking
    pub stalk_speed: f32,
    /// Speed while hunting
    pub hunt_speed: f32,
    /// Distance a stalker tries to keep from the player
    pub preferred_distance: f32,
    /// Beyond this distance a stalker stops closing in
    pub stalk_maintain_range: f32,

    // === Scene ===
    /// RNG seed (None = random)
    pub seed: Option<u64>,
    /// Capacity of the outbound event bus
    pub event_capacity: usize,
    /// Zone the player starts in
    pub player_start_zone: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            patrol_speed: 2.0,
            patrol_distance: 15.0,
            patrol_duration: 10.0,
            retry_delay: 2.0,
            arrival_epsilon: 0.5,
            stalk_speed: 2.5,
            hunt_speed: 5.0,
            preferred_distance: 10.0,
            stalk_maintain_range: 12.0,
            seed: None,
            event_capacity: 1024,
            player_start_zone: "Floor1".to_owned(),
        }
    }
}

impl SceneConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Scene config not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read scene config: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(mut config) => {
                        info!("Loaded scene config from {}", path.display());
                        config.validate();
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse scene config: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open scene config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a TOML file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved scene config to {}", path.display());
        Ok(())
    }

    /// Clamp values into sensible ranges.
    ///
    /// Non-finite values are reset to their defaults first.
    pub fn validate(&mut self) {
        let defaults = Self::default();
        for (name, value, fallback) in [
            ("patrol_speed", &mut self.patrol_speed, defaults.patrol_speed),
            ("patrol_distance", &mut self.patrol_distance, defaults.patrol_distance),
            ("patrol_duration", &mut self.patrol_duration, defaults.patrol_duration),
            ("retry_delay", &mut self.retry_delay, defaults.retry_delay),
            ("arrival_epsilon", &mut self.arrival_epsilon, defaults.arrival_epsilon),
            ("stalk_speed", &mut self.stalk_speed, defaults.stalk_speed),
            ("hunt_speed", &mut self.hunt_speed, defaults.hunt_speed),
            ("preferred_distance", &mut self.preferred_distance, defaults.preferred_distance),
            ("stalk_maintain_range", &mut self.stalk_maintain_range, defaults.stalk_maintain_range),
        ] {
            if !value.is_finite() {
                warn!("{name} is {value}, using default {fallback}");
                *value = fallback;
            }
        }

        self.patrol_speed = self.patrol_speed.clamp(0.1, 50.0);
        self.patrol_distance = self.patrol_distance.clamp(0.0, 500.0);
        self.patrol_duration = self.patrol_duration.clamp(0.1, 600.0);
        self.retry_delay = self.retry_delay.clamp(0.1, self.patrol_duration);
        self.arrival_epsilon = self.arrival_epsilon.clamp(0.01, 5.0);

        self.stalk_speed = self.stalk_speed.clamp(0.1, 50.0);
        self.hunt_speed = self.hunt_speed.clamp(0.1, 50.0);
        self.preferred_distance = self.preferred_distance.clamp(1.0, 100.0);
        self.stalk_maintain_range = self.stalk_maintain_range.max(self.preferred_distance);

        self.event_capacity = self.event_capacity.clamp(16, 65_536);
    }

    /// Patrol tuning derived from this config.
    #[must_use]
    pub const fn patrol_tuning(&self) -> PatrolTuning {
        PatrolTuning {
            speed: self.patrol_speed,
            distance: self.patrol_distance,
            duration: self.patrol_duration,
            retry_delay: self.retry_delay,
        }
    }

    /// Standoff tuning derived from this config.
    #[must_use]
    pub const fn proximity_tuning(&self) -> ProximityTuning {
        ProximityTuning {
            stalk_speed: self.stalk_speed,
            hunt_speed: self.hunt_speed,
            preferred_distance: self.preferred_distance,
            maintain_range: self.stalk_maintain_range,
        }
    }
}

/// A warp edge entry in a layout file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeEntry {
    /// Unique name of the physical object
    pub name: String,
    /// Source zone
    pub from: String,
    /// Destination zone
    pub to: String,
    /// Horizontal position of the transit point
    pub transit_x: f32,
    /// Horizontal position of the exit point
    #[serde(default)]
    pub exit_x: Option<f32>,
}

impl EdgeEntry {
    /// Converts the entry into a registration request.
    #[must_use]
    pub fn to_spec(&self) -> WarpSpec {
        let spec = WarpSpec::new(
            self.name.clone(),
            self.from.as_str(),
            self.to.as_str(),
            Vec2::new(self.transit_x, 0.0),
        );
        match self.exit_x {
            Some(x) => spec.with_exit(Vec2::new(x, 0.0)),
            None => spec,
        }
    }
}

/// An agent entry in a layout file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEntry {
    /// Display name
    pub name: String,
    /// Role
    pub role: AgentRole,
    /// Starting zone
    pub zone: String,
    /// Starting horizontal position
    #[serde(default)]
    pub x: f32,
}

/// Zone graph and agents of a scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLayout {
    /// Zones, including ones without warps
    pub zones: Vec<String>,
    /// Warp edges
    pub edges: Vec<EdgeEntry>,
    /// Agents
    pub agents: Vec<AgentEntry>,
}

impl SceneLayout {
    /// Load a layout from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Loaded layout from {}: {} zones, {} edges, {} agents",
            path.display(),
            layout.zones.len(),
            layout.edges.len(),
            layout.agents.len()
        );
        Ok(layout)
    }

    /// Parse a layout from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
