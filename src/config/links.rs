//! Cluster and shared blocks.
//!
//! A `[[cluster]]` block names servers that reservations placed by our own
//! operators are forwarded to. A `[[shared]]` block names remote operators
//! whose reservations we accept. Both carry share flags selecting which
//! kinds of action they cover.

use serde::Deserialize;

/// A category of shareable reservation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareFlag {
    /// Permanent reservations.
    Presv,
    /// Temporary reservations.
    Tresv,
    /// Removal of reservations.
    Unresv,
    /// Shorthand for all of the above.
    All,
}

impl ShareFlag {
    /// The flag required to share a reservation of `duration` seconds.
    pub fn for_duration(duration: u64) -> Self {
        if duration > 0 { Self::Tresv } else { Self::Presv }
    }
}

/// Set of share flags as listed in the config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ShareFlags(Vec<ShareFlag>);

impl ShareFlags {
    pub fn new(flags: impl IntoIterator<Item = ShareFlag>) -> Self {
        Self(flags.into_iter().collect())
    }

    /// Does this set cover `flag`?
    pub fn allows(&self, flag: ShareFlag) -> bool {
        self.0.iter().any(|f| *f == flag || *f == ShareFlag::All)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `[[cluster]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterBlock {
    /// Server name mask (e.g., "*.straylight.net").
    pub server: String,
    /// Actions forwarded to matching servers.
    #[serde(default)]
    pub flags: ShareFlags,
}

/// `[[shared]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedBlock {
    /// `user@host` mask of the remote operator (default: "*@*").
    #[serde(default = "default_oper_mask")]
    pub oper: String,
    /// Mask of the server the operator is connected to.
    pub server: String,
    /// Actions accepted from matching operators.
    #[serde(default)]
    pub flags: ShareFlags,
}

impl SharedBlock {
    /// Split the `user@host` mask. A mask without `@` is a host mask.
    pub fn user_host(&self) -> (&str, &str) {
        self.oper.split_once('@').unwrap_or(("*", self.oper.as_str()))
    }
}

fn default_oper_mask() -> String {
    "*@*".to_string()
}
