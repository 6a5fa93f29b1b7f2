//! Reservation options.

use serde::Deserialize;
use std::path::PathBuf;

use super::types::default_true;

/// `[resv]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ResvConfig {
    /// Path of the permanent reservation file (default: "resv.conf").
    /// The rewrite temp file is this path with `.tmp` appended.
    #[serde(default = "default_resv_file")]
    pub file: String,
    /// Part local users out of a channel when it becomes reserved.
    #[serde(default = "default_true")]
    pub forcepart: bool,
    /// Minimum non-wildcard characters in a nickname reservation (default: 3).
    #[serde(default = "default_min_nonwildcard")]
    pub min_nonwildcard: usize,
}

impl Default for ResvConfig {
    fn default() -> Self {
        Self {
            file: default_resv_file(),
            forcepart: true,
            min_nonwildcard: default_min_nonwildcard(),
        }
    }
}

impl ResvConfig {
    /// The reservation file path.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.file)
    }
}

fn default_resv_file() -> String {
    "resv.conf".to_string()
}

fn default_min_nonwildcard() -> usize {
    3
}
