//! Forced part of local members when their channel becomes reserved.

use super::notify::{NoticeScope, Notifier};
use super::propagate::PeerLinks;
use super::wire::{ServerCap, ServerMessage};
use crate::matcher::is_local_channel;
use async_trait::async_trait;
use tracing::info;

/// A local user currently joined to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMember {
    pub uid: String,
    pub nick: String,
    pub user: String,
    pub host: String,
    /// Immune to reservations (e.g. services or exempted operators).
    pub exempt: bool,
}

impl LocalMember {
    /// `nick!user@host`
    pub fn hostmask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }
}

/// Channel membership, as far as enforcement needs it.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Snapshot of the channel's local members, or `None` if the channel
    /// does not exist.
    async fn local_members(&self, channel: &str) -> Option<Vec<LocalMember>>;

    /// Show `member` leaving to the channel's local members.
    async fn broadcast_part(&self, channel: &str, member: &LocalMember, reason: &str);

    /// Detach `member` from the channel.
    async fn remove_member(&self, channel: &str, member: &LocalMember);
}

/// Part every non-exempt local member out of `channel`.
///
/// Works on a snapshot of the member list, so detaching members while
/// iterating cannot skip anyone. Returns the number of members parted.
pub async fn force_part(
    directory: &dyn ChannelDirectory,
    links: &dyn PeerLinks,
    notifier: &dyn Notifier,
    channel: &str,
    reason: &str,
    temporary: bool,
) -> usize {
    let Some(members) = directory.local_members(channel).await else {
        return 0;
    };

    let mut parted = 0;
    for member in members.iter().filter(|m| !m.exempt) {
        if !is_local_channel(channel) {
            links.broadcast(
                ServerCap::Ts6,
                None,
                ServerMessage::Part {
                    uid: member.uid.clone(),
                    channel: channel.to_string(),
                },
            );
        }

        directory.broadcast_part(channel, member, &member.nick).await;
        directory.remove_member(channel, member).await;

        let hostmask = member.hostmask();
        info!(target: "resv", member = %hostmask, channel = %channel, "Forced part");
        notifier
            .notify_opers(
                NoticeScope::Local,
                &format!("Forced PART for {hostmask} from {channel} ({reason})"),
            )
            .await;

        let text = if temporary {
            format!("*** Channel {channel} is temporarily unavailable on this server.")
        } else {
            format!("*** Channel {channel} is no longer available on this server.")
        };
        notifier.notify_user(member, &text).await;

        parted += 1;
    }

    parted
}
