//! Authorization of reservation requests.
//!
//! A request can only reach the store with a [`ResvGrant`], and grants can
//! only be minted here. Local operators are checked against their
//! privileges; users on other servers must be covered by a `[[shared]]`
//! block whose flags include the requested action.

use crate::config::{ShareFlag, SharedBlock};
use crate::error::{ResvError, ResvResult};
use crate::matcher::Matcher;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Operator privileges relevant to reservations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperPrivs {
    /// May place and remove reservations.
    pub resv: bool,
    /// May target other servers with `ON <server>`.
    pub remoteban: bool,
}

/// What kind of entity issued a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// An operator connected to this server.
    LocalOper(OperPrivs),
    /// A non-operator connected to this server.
    LocalUser,
    /// A user on another server.
    RemoteUser,
    /// A server.
    Server,
}

/// Identity of whoever issued a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub nick: String,
    pub user: String,
    pub host: String,
    /// Server the source is connected to.
    pub server: String,
    /// TS6 UID, when known.
    pub uid: Option<String>,
    pub kind: SourceKind,
}

impl Source {
    pub fn local_oper(nick: &str, user: &str, host: &str, server: &str, privs: OperPrivs) -> Self {
        Self {
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
            server: server.to_string(),
            uid: None,
            kind: SourceKind::LocalOper(privs),
        }
    }

    pub fn remote_user(nick: &str, user: &str, host: &str, server: &str) -> Self {
        Self {
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
            server: server.to_string(),
            uid: None,
            kind: SourceKind::RemoteUser,
        }
    }

    pub fn server(name: &str) -> Self {
        Self {
            nick: name.to_string(),
            user: String::new(),
            host: String::new(),
            server: name.to_string(),
            uid: None,
            kind: SourceKind::Server,
        }
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    fn privs(&self) -> OperPrivs {
        match self.kind {
            SourceKind::LocalOper(privs) => privs,
            _ => OperPrivs::default(),
        }
    }

    pub fn can_manage_reservations(&self) -> bool {
        self.privs().resv
    }

    pub fn can_remote_administer(&self) -> bool {
        self.privs().remoteban
    }

    /// Users (local or remote) as opposed to servers.
    pub fn is_user(&self) -> bool {
        !matches!(self.kind, SourceKind::Server)
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, SourceKind::LocalOper(_) | SourceKind::LocalUser)
    }

    /// Prefix used on relayed server messages.
    pub fn wire_name(&self) -> &str {
        self.uid.as_deref().unwrap_or(&self.nick)
    }

    /// `nick!user@host{server}`, as shown in notices and the file.
    pub fn oper_name(&self) -> String {
        match self.kind {
            SourceKind::Server => self.server.clone(),
            _ => format!("{}!{}@{}{{{}}}", self.nick, self.user, self.host, self.server),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.oper_name())
    }
}

/// An action a grant can cover.
pub trait GrantScope: Copy + fmt::Debug {
    /// Share flag a remote source needs for this action.
    fn share_flag(&self) -> ShareFlag;
}

/// Place a reservation lasting `duration` seconds (zero is permanent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Create {
    pub duration: u64,
}

impl GrantScope for Create {
    fn share_flag(&self) -> ShareFlag {
        ShareFlag::for_duration(self.duration)
    }
}

/// Remove a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remove;

impl GrantScope for Remove {
    fn share_flag(&self) -> ShareFlag {
        ShareFlag::Unresv
    }
}

/// Proof that a request was authorized for `S`.
///
/// Only [`ResvAuthority`] can mint one, and it is not `Clone`: a grant is
/// consumed by the action it authorizes.
#[derive(Debug)]
pub struct ResvGrant<S: GrantScope> {
    scope: S,
    issuer: String,
}

impl<S: GrantScope> ResvGrant<S> {
    fn new(scope: S, issuer: String) -> Self {
        Self { scope, issuer }
    }

    pub fn scope(&self) -> S {
        self.scope
    }

    /// `oper_name()` of the authorized source.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

/// Mints [`ResvGrant`]s.
pub struct ResvAuthority {
    shared: Vec<SharedBlock>,
    matcher: Arc<dyn Matcher>,
}

impl ResvAuthority {
    pub fn new(shared: Vec<SharedBlock>, matcher: Arc<dyn Matcher>) -> Self {
        Self { shared, matcher }
    }

    /// Authorize a local operator command. `targeted` is set for
    /// `... ON <server>` forms.
    pub fn authorize_oper<S: GrantScope>(
        &self,
        source: &Source,
        targeted: bool,
        scope: S,
    ) -> ResvResult<ResvGrant<S>> {
        if !source.can_manage_reservations() {
            return Err(ResvError::NoPrivileges("resv"));
        }
        if targeted && !source.can_remote_administer() {
            return Err(ResvError::NoPrivileges("remoteban"));
        }
        Ok(ResvGrant::new(scope, source.oper_name()))
    }

    /// Authorize a request relayed from another server. The first shared
    /// block matching the source decides.
    pub fn authorize_remote<S: GrantScope>(&self, source: &Source, scope: S) -> Option<ResvGrant<S>> {
        if !source.is_user() {
            return None;
        }

        let flag = scope.share_flag();
        let block = self.shared.iter().find(|block| {
            let (user, host) = block.user_host();
            self.matcher.matches(user, &source.user)
                && self.matcher.matches(host, &source.host)
                && self.matcher.matches(&block.server, &source.server)
        });

        match block {
            Some(block) if block.flags.allows(flag) => Some(ResvGrant::new(scope, source.oper_name())),
            Some(_) => {
                debug!(source = %source, ?flag, "Shared block does not allow this action");
                None
            }
            None => {
                debug!(source = %source, "No shared block for remote source");
                None
            }
        }
    }
}
