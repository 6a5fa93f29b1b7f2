//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig)
//! - [`limits`]: Name length limits (LimitsConfig)
//! - [`resv`]: Reservation file and enforcement options (ResvConfig)
//! - [`links`]: Cluster and shared blocks controlling RESV propagation and trust
//! - [`validation`]: Startup validation of the loaded configuration

mod limits;
mod links;
mod resv;
mod types;
pub mod validation;

pub use limits::LimitsConfig;
pub use links::{ClusterBlock, ShareFlag, ShareFlags, SharedBlock};
pub use resv::ResvConfig;
pub use types::{Config, ConfigError, ServerConfig};
