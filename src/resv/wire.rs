//! Server-to-server reservation messages.
//!
//! Two generations of the protocol coexist on a network:
//!
//! - legacy (`CLUSTER` peers): `RESV <target> <pattern> :<reason>` and
//!   `UNRESV <target> <pattern>`, which cannot carry a duration;
//! - encapsulated (`ENCAP` peers): `ENCAP <target> RESV <seconds> <pattern> 0
//!   :<reason>` and `ENCAP <target> UNRESV <pattern>`.

use std::fmt;
use std::str::FromStr;

/// Identifier of a directly connected peer link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub String);

impl LinkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A capability negotiated on a server link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerCap {
    /// Understands the legacy `RESV`/`UNRESV` forms.
    Cluster,
    /// Understands `ENCAP`.
    Encap,
    /// Understands UID-sourced commands.
    Ts6,
}

impl ServerCap {
    const fn bit(self) -> u8 {
        match self {
            Self::Cluster => 0b001,
            Self::Encap => 0b010,
            Self::Ts6 => 0b100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cluster => "CLUSTER",
            Self::Encap => "ENCAP",
            Self::Ts6 => "TS6",
        }
    }
}

impl FromStr for ServerCap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CLUSTER" => Ok(Self::Cluster),
            "ENCAP" => Ok(Self::Encap),
            "TS6" => Ok(Self::Ts6),
            other => Err(format!("unknown server capability: {other}")),
        }
    }
}

/// Set of capabilities on one link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCaps(u8);

impl LinkCaps {
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn with(self, cap: ServerCap) -> Self {
        Self(self.0 | cap.bit())
    }

    pub const fn has(self, cap: ServerCap) -> bool {
        self.0 & cap.bit() != 0
    }

    /// Parse a space-separated `CAPAB` list, ignoring tokens we don't use.
    pub fn from_capab(list: &str) -> Self {
        list.split_whitespace()
            .filter_map(|token| token.parse::<ServerCap>().ok())
            .fold(Self::empty(), Self::with)
    }
}

impl FromIterator<ServerCap> for LinkCaps {
    fn from_iter<I: IntoIterator<Item = ServerCap>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// An outbound server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Resv {
        source: String,
        target: String,
        pattern: String,
        reason: String,
    },
    EncapResv {
        source: String,
        target: String,
        duration: u64,
        pattern: String,
        reason: String,
    },
    Unresv {
        source: String,
        target: String,
        pattern: String,
    },
    EncapUnresv {
        source: String,
        target: String,
        pattern: String,
    },
    /// A local member leaving a channel, sourced by UID.
    Part { uid: String, channel: String },
}

impl ServerMessage {
    /// The command word, for logging.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Resv { .. } => "RESV",
            Self::Unresv { .. } => "UNRESV",
            Self::EncapResv { .. } | Self::EncapUnresv { .. } => "ENCAP",
            Self::Part { .. } => "PART",
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resv {
                source,
                target,
                pattern,
                reason,
            } => write!(f, ":{source} RESV {target} {pattern} :{reason}"),
            Self::EncapResv {
                source,
                target,
                duration,
                pattern,
                reason,
            } => write!(f, ":{source} ENCAP {target} RESV {duration} {pattern} 0 :{reason}"),
            Self::Unresv {
                source,
                target,
                pattern,
            } => write!(f, ":{source} UNRESV {target} {pattern}"),
            Self::EncapUnresv {
                source,
                target,
                pattern,
            } => write!(f, ":{source} ENCAP {target} UNRESV {pattern}"),
            Self::Part { uid, channel } => write!(f, ":{uid} PART {channel}"),
        }
    }
}
