//! Parsing of RESV and UNRESV commands from every origin.
//!
//! ```text
//! local oper  RESV [minutes] <pattern> [ON <server>] :<reason>
//!             UNRESV <pattern> [ON <server>]
//! peer link   RESV <target> <pattern> :<reason>
//!             UNRESV <target> <pattern>
//! encap       ENCAP <me> RESV <seconds> <pattern> 0 :<reason>
//!             ENCAP <me> UNRESV <pattern>
//! ```

use super::wire::LinkId;
use crate::casemap::irc_eq;
use crate::error::{ResvError, ResvResult};
use std::str::FromStr;

/// Longest duration an operator may give, in minutes (52 weeks).
pub const MAX_TEMP_MINUTES: u64 = 60 * 24 * 7 * 52;

/// Command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Resv,
    Unresv,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resv => "RESV",
            Self::Unresv => "UNRESV",
        }
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("RESV") {
            Ok(Self::Resv)
        } else if s.eq_ignore_ascii_case("UNRESV") {
            Ok(Self::Unresv)
        } else {
            Err(format!("not a reservation command: {s}"))
        }
    }
}

/// Where a command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Typed by a client connected to this server.
    Client,
    /// Plain server command received on a peer link.
    Peer(LinkId),
    /// Unwrapped from an `ENCAP` addressed to us.
    Encap,
}

/// A parsed reservation command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResvRequest {
    OperCreate {
        /// Seconds; zero is permanent.
        duration: u64,
        pattern: String,
        target: Option<String>,
        /// Checked after authorization so privilege errors come first.
        reason: Option<String>,
    },
    OperRemove {
        pattern: String,
        target: Option<String>,
    },
    RelayCreate {
        link: LinkId,
        target: String,
        pattern: String,
        reason: String,
    },
    RelayRemove {
        link: LinkId,
        target: String,
        pattern: String,
    },
    EncapCreate {
        duration: u64,
        pattern: String,
        reason: String,
    },
    EncapRemove {
        pattern: String,
    },
}

impl ResvRequest {
    /// Parse `params` (everything after the command word).
    pub fn parse(verb: Verb, origin: Origin, params: &[&str]) -> ResvResult<Self> {
        let need = |n: usize| {
            if params.len() < n {
                Err(ResvError::NeedMoreParams(verb.as_str()))
            } else {
                Ok(())
            }
        };

        match (verb, origin) {
            (Verb::Resv, Origin::Client) => {
                need(2)?;
                let mut loc = 0;
                let duration = match valid_temp_time(params[0]) {
                    Some(secs) => {
                        loc += 1;
                        secs
                    }
                    None => 0,
                };

                let pattern = params[loc].to_string();
                loc += 1;

                let mut target = None;
                if params.len() >= loc + 2 && irc_eq(params[loc], "ON") {
                    target = Some(params[loc + 1].to_string());
                    loc += 2;
                }

                let reason = params
                    .get(loc)
                    .filter(|reason| !reason.is_empty())
                    .map(|reason| reason.to_string());

                Ok(Self::OperCreate {
                    duration,
                    pattern,
                    target,
                    reason,
                })
            }
            (Verb::Unresv, Origin::Client) => {
                need(1)?;
                let target = match params {
                    [_, on, server] if irc_eq(on, "ON") => Some(server.to_string()),
                    _ => None,
                };
                Ok(Self::OperRemove {
                    pattern: params[0].to_string(),
                    target,
                })
            }
            (Verb::Resv, Origin::Peer(link)) => {
                need(3)?;
                Ok(Self::RelayCreate {
                    link,
                    target: params[0].to_string(),
                    pattern: params[1].to_string(),
                    reason: params[2].to_string(),
                })
            }
            (Verb::Unresv, Origin::Peer(link)) => {
                need(2)?;
                Ok(Self::RelayRemove {
                    link,
                    target: params[0].to_string(),
                    pattern: params[1].to_string(),
                })
            }
            (Verb::Resv, Origin::Encap) => {
                need(4)?;
                Ok(Self::EncapCreate {
                    duration: leading_digits(params[0]),
                    pattern: params[1].to_string(),
                    reason: params[3].to_string(),
                })
            }
            (Verb::Unresv, Origin::Encap) => {
                need(1)?;
                Ok(Self::EncapRemove {
                    pattern: params[0].to_string(),
                })
            }
        }
    }

    /// The reservation pattern this request concerns.
    pub fn pattern(&self) -> &str {
        match self {
            Self::OperCreate { pattern, .. }
            | Self::OperRemove { pattern, .. }
            | Self::RelayCreate { pattern, .. }
            | Self::RelayRemove { pattern, .. }
            | Self::EncapCreate { pattern, .. }
            | Self::EncapRemove { pattern } => pattern,
        }
    }
}

/// Parse an operator duration token: all digits, in minutes, capped at
/// 52 weeks. Returns seconds, or `None` if the token is not a duration.
pub fn valid_temp_time(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let minutes = token
        .bytes()
        .try_fold(0u64, |acc, b| {
            acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
        })
        .unwrap_or(u64::MAX)
        .min(MAX_TEMP_MINUTES);

    Some(minutes * 60)
}

/// Numeric prefix of `token` in seconds, zero if there is none. Saturates
/// at the same 52 week ceiling as [`valid_temp_time`].
fn leading_digits(token: &str) -> u64 {
    token
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, b| {
            acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
        })
        .min(MAX_TEMP_MINUTES * 60)
}
