//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::limits::LimitsConfig;
use super::links::{ClusterBlock, SharedBlock};
use super::resv::ResvConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration as seen by the reservation subsystem.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// Nickname and channel name length limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Reservation options.
    #[serde(default)]
    pub resv: ResvConfig,
    /// Servers that our operators' reservations are shared with.
    #[serde(default)]
    pub cluster: Vec<ClusterBlock>,
    /// Remote operators allowed to place reservations on this server.
    #[serde(default)]
    pub shared: Vec<SharedBlock>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.straylight.net"). Target masks in
    /// `RESV ... ON <server>` are matched against it.
    pub name: String,
    /// Server ID for TS6 (3 characters).
    pub sid: String,
    /// Server description.
    #[serde(default)]
    pub description: String,
}

pub(super) fn default_true() -> bool {
    true
}
