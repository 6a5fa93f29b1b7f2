//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.sid must be exactly 3 characters, got {0}")]
    InvalidSid(usize),
    #[error("server.sid must match pattern [0-9][A-Z0-9][A-Z0-9], got '{0}'")]
    InvalidSidFormat(String),
    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("resv.file is required")]
    MissingResvFile,
    #[error("resv.file parent directory does not exist: {0}")]
    ResvPathInvalid(String),
    #[error("cluster block for '{0}' has no flags")]
    ClusterWithoutFlags(String),
    #[error("shared block for '{0}' has no flags")]
    SharedWithoutFlags(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    // SID validation (TS6 format)
    let sid = &config.server.sid;
    if sid.len() != 3 {
        errors.push(ValidationError::InvalidSid(sid.len()));
    } else {
        let chars: Vec<char> = sid.chars().collect();
        let valid = chars[0].is_ascii_digit()
            && (chars[1].is_ascii_uppercase() || chars[1].is_ascii_digit())
            && (chars[2].is_ascii_uppercase() || chars[2].is_ascii_digit());
        if !valid {
            errors.push(ValidationError::InvalidSidFormat(sid.clone()));
        }
    }

    if config.limits.nicklen == 0 {
        errors.push(ValidationError::ZeroLimit("nicklen"));
    }
    if config.limits.channellen == 0 {
        errors.push(ValidationError::ZeroLimit("channellen"));
    }

    if config.resv.file.is_empty() {
        errors.push(ValidationError::MissingResvFile);
    } else {
        let path = Path::new(&config.resv.file);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::ResvPathInvalid(config.resv.file.clone()));
        }
    }

    for block in &config.cluster {
        if block.flags.is_empty() {
            errors.push(ValidationError::ClusterWithoutFlags(block.server.clone()));
        }
    }
    for block in &config.shared {
        if block.flags.is_empty() {
            errors.push(ValidationError::SharedWithoutFlags(block.server.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
