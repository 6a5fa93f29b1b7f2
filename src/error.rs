//! Unified error handling for the reservation subsystem.
//!
//! Every failure a RESV/UNRESV command can hit is a [`ResvError`]. Each one
//! maps to exactly one [`Reply`] for the issuer and to a static code for
//! log labeling. None of them is fatal to the daemon.

use crate::reply::Reply;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Command errors
// ============================================================================

/// Errors that can occur while handling a reservation command.
#[derive(Debug, Error)]
pub enum ResvError {
    #[error("missing privilege: {0}")]
    NoPrivileges(&'static str),

    #[error("not enough parameters for {0}")]
    NeedMoreParams(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("No RESV for {0}")]
    NotFound(String),
}

impl ResvError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoPrivileges(_) => "authorization_denied",
            Self::NeedMoreParams(_) => "need_more_params",
            Self::Validation(ValidationError::ChannelReserved(_) | ValidationError::NickReserved(_)) => {
                "store_conflict"
            }
            Self::Validation(_) => "validation_failed",
            Self::Persist(e) => e.error_code(),
            Self::NotFound(_) => "not_found",
        }
    }

    /// Convert to the reply sent to the issuer.
    pub fn to_reply(&self) -> Reply {
        match self {
            Self::NoPrivileges(privilege) => Reply::NoPrivs(privilege),
            Self::NeedMoreParams(cmd) => Reply::NeedMoreParams(cmd),
            other => Reply::notice(other.to_string()),
        }
    }
}

/// Result type for reservation commands.
pub type ResvResult<T = ()> = Result<T, ResvError>;

// ============================================================================
// Validation errors
// ============================================================================

/// Pattern or reason rejected before any state was touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A RESV has already been placed on channel: {0}")]
    ChannelReserved(String),

    #[error("A RESV has already been placed on nick: {0}")]
    NickReserved(String),

    #[error("Invalid RESV length: {0}")]
    InvalidLength(String),

    #[error("Invalid character ',' in channel RESV")]
    CommaInChannel,

    #[error("Invalid character '\"' in channel RESV")]
    QuoteInChannel,

    #[error("Invalid character '\"' in comment")]
    QuoteInReason,

    #[error("Please include at least {0} non-wildcard characters with the resv")]
    TooFewNonWildcard(usize),

    #[error("You have specified an invalid resv: [{0}]")]
    InvalidMask(String),
}

// ============================================================================
// Persistence errors
// ============================================================================

/// Reservation file failures.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Cannot open {}", path.display())]
    NotOpened {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot open {}", path.display())]
    TempNotOpened {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't read resv file, aborted")]
    ReadFailed(#[source] io::Error),

    #[error("Couldn't write temp resv file, aborted")]
    WriteFailed(#[source] io::Error),

    #[error("Cannot find RESV for {0} in file")]
    NotFound(String),

    #[error("Couldn't rename temp file, aborted")]
    RenameFailed(#[source] io::Error),

    #[error("Refusing to write temporary RESV [{0}] to the reservation file")]
    Temporary(String),

    #[error("Problem writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PersistError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotOpened { .. } | Self::TempNotOpened { .. } => "persistence_unavailable",
            Self::ReadFailed(_) => "persistence_read_failed",
            Self::WriteFailed(_) | Self::Io { .. } => "persistence_write_failed",
            Self::NotFound(_) => "persistence_not_found",
            Self::RenameFailed(_) => "persistence_rename_failed",
            Self::Temporary(_) => "persistence_temporary",
        }
    }
}
