//! Name length limits configuration.

use serde::Deserialize;

/// Length limits applied to reservation patterns.
///
/// Channel reservations may be at most `channellen` characters; nickname
/// reservations may be up to twice `nicklen` to leave room for wildcards.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum nickname length (default: 30).
    #[serde(default = "default_nicklen")]
    pub nicklen: usize,
    /// Maximum channel name length (default: 50).
    #[serde(default = "default_channellen")]
    pub channellen: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            nicklen: default_nicklen(),
            channellen: default_channellen(),
        }
    }
}

impl LimitsConfig {
    /// Longest nickname reservation pattern accepted.
    pub fn max_nick_pattern(&self) -> usize {
        self.nicklen * 2
    }
}

fn default_nicklen() -> usize {
    30
}

fn default_channellen() -> usize {
    50
}
