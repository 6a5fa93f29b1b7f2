//! Fake channel directory and notifier.

use async_trait::async_trait;
use slircd_resv::Reply;
use slircd_resv::resv::{ChannelDirectory, LocalMember, NoticeScope, Notifier, Source};
use std::collections::HashMap;
use std::sync::Mutex;

/// Build a non-exempt local member.
pub fn member(uid: &str, nick: &str) -> LocalMember {
    LocalMember {
        uid: uid.to_string(),
        nick: nick.to_string(),
        user: nick.to_string(),
        host: "user.example.org".to_string(),
        exempt: false,
    }
}

/// Channel membership held in memory.
#[derive(Default)]
pub struct FakeChannels {
    channels: Mutex<HashMap<String, Vec<LocalMember>>>,
    parts: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeChannels {
    pub fn join(&self, channel: &str, member: LocalMember) {
        self.channels
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push(member);
    }

    pub fn members(&self, channel: &str) -> Vec<String> {
        self.channels
            .lock()
            .unwrap()
            .get(channel)
            .map(|members| members.iter().map(|m| m.nick.clone()).collect())
            .unwrap_or_default()
    }

    /// Local PART lines broadcast so far.
    pub fn parts(&self) -> Vec<String> {
        self.parts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelDirectory for FakeChannels {
    async fn local_members(&self, channel: &str) -> Option<Vec<LocalMember>> {
        self.channels.lock().unwrap().get(channel).cloned()
    }

    async fn broadcast_part(&self, channel: &str, member: &LocalMember, reason: &str) {
        self.parts
            .lock()
            .unwrap()
            .push(format!(":{} PART {channel} :{reason}", member.hostmask()));
    }

    async fn remove_member(&self, channel: &str, member: &LocalMember) {
        if let Some(members) = self.channels.lock().unwrap().get_mut(channel) {
            members.retain(|m| m.uid != member.uid);
        }
    }
}

/// Records every notice instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    replies: Mutex<Vec<(String, Reply)>>,
    users: Mutex<Vec<(String, String)>>,
    opers: Mutex<Vec<(NoticeScope, String)>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    /// Replies sent to `nick`, in order.
    pub fn replies_to(&self, nick: &str) -> Vec<Reply> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == nick)
            .map(|(_, reply)| reply.clone())
            .collect()
    }

    pub fn last_reply(&self, nick: &str) -> Option<Reply> {
        self.replies_to(nick).pop()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    /// Notices sent to local user `nick`.
    pub fn user_notices(&self, nick: &str) -> Vec<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == nick)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn oper_notices(&self) -> Vec<(NoticeScope, String)> {
        self.opers.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.replies.lock().unwrap().clear();
        self.users.lock().unwrap().clear();
        self.opers.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn reply(&self, source: &Source, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .push((source.nick.clone(), reply));
    }

    async fn notify_user(&self, member: &LocalMember, text: &str) {
        self.users
            .lock()
            .unwrap()
            .push((member.nick.clone(), text.to_string()));
    }

    async fn notify_opers(&self, scope: NoticeScope, text: &str) {
        self.opers.lock().unwrap().push((scope, text.to_string()));
    }
}
