//! Delivery of notices to the requester, affected users and operators.

use super::authority::Source;
use super::enforce::LocalMember;
use crate::reply::Reply;
use async_trait::async_trait;

/// Which operators see a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeScope {
    /// Operators on this server.
    Local,
    /// Operators on every server.
    Network,
}

/// Outbound notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Reply to whoever issued the command (local or remote).
    async fn reply(&self, source: &Source, reply: Reply);

    /// Notice a local user.
    async fn notify_user(&self, member: &LocalMember, text: &str);

    /// Server notice to operators.
    async fn notify_opers(&self, scope: NoticeScope, text: &str);
}
