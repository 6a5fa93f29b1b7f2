//! Replies sent back to the issuer of a reservation command.

use std::fmt;

/// A single-line reply to the source of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Server NOTICE.
    Notice(String),
    /// ERR_NOPRIVS (723): missing oper privilege.
    NoPrivs(&'static str),
    /// ERR_NEEDMOREPARAMS (461).
    NeedMoreParams(&'static str),
}

impl Reply {
    pub fn notice(text: impl Into<String>) -> Self {
        Self::Notice(text.into())
    }

    /// Numeric code, if this reply is a numeric.
    pub fn numeric(&self) -> Option<u16> {
        match self {
            Self::Notice(_) => None,
            Self::NoPrivs(_) => Some(723),
            Self::NeedMoreParams(_) => Some(461),
        }
    }

    /// Render as a wire line from `server_name` to `nick`.
    pub fn to_line(&self, server_name: &str, nick: &str) -> String {
        match self {
            Self::Notice(text) => format!(":{server_name} NOTICE {nick} :{text}"),
            Self::NoPrivs(privilege) => {
                format!(":{server_name} 723 {nick} {privilege} :Insufficient oper privileges.")
            }
            Self::NeedMoreParams(cmd) => {
                format!(":{server_name} 461 {nick} {cmd} :Not enough parameters")
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice(text) => f.write_str(text),
            Self::NoPrivs(privilege) => write!(f, "{privilege} :Insufficient oper privileges."),
            Self::NeedMoreParams(cmd) => write!(f, "{cmd} :Not enough parameters"),
        }
    }
}
