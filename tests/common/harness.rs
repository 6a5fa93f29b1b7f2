//! Reservation service wired to fakes.

use super::fakes::{FakeChannels, RecordingNotifier};
use slircd_resv::config::Config;
use slircd_resv::resv::{
    LinkCaps, LinkId, LinkTable, OperPrivs, Origin, ResvService, ServerCap, ServerMessage, Source,
    Verb,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const SERVER_NAME: &str = "irc.example.net";

/// The local operator used by most tests.
pub fn oper() -> Source {
    Source::local_oper(
        "alice",
        "alice",
        "staff.example.net",
        SERVER_NAME,
        OperPrivs {
            resv: true,
            remoteban: true,
        },
    )
    .with_uid("00AAAAAAA")
}

pub fn remote_user(nick: &str, server: &str) -> Source {
    Source::remote_user(nick, nick, "staff.example.net", server)
}

/// A reservation service on `irc.example.net` with a private reservation
/// file and in-memory collaborators.
pub struct Harness {
    pub service: Arc<ResvService>,
    pub channels: Arc<FakeChannels>,
    pub notifier: Arc<RecordingNotifier>,
    pub links: Arc<LinkTable>,
    peers: HashMap<String, mpsc::Receiver<Arc<ServerMessage>>>,
    dir: TempDir,
}

#[allow(dead_code)]
impl Harness {
    /// `extra` is appended to the config right after `[resv] file = ...`,
    /// so it may start with further `[resv]` keys.
    pub fn new(extra: &str, peers: &[(&str, &str, &[ServerCap])]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let resv_path = dir.path().join("resv.conf");
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"
[server]
name = "{SERVER_NAME}"
sid = "00A"

[resv]
file = "{}"
{extra}
"#,
                resv_path.display()
            ),
        )
        .unwrap();
        let config = Config::load(&config_path).unwrap();

        let links = Arc::new(LinkTable::new());
        let mut receivers = HashMap::new();
        for (id, name, caps) in peers {
            let (tx, rx) = mpsc::channel(32);
            let caps: LinkCaps = caps.iter().copied().collect();
            links.register_link(LinkId::new(*id), name, caps, tx);
            receivers.insert(id.to_string(), rx);
        }

        let channels = Arc::new(FakeChannels::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = Arc::new(ResvService::new(
            &config,
            links.clone(),
            channels.clone(),
            notifier.clone(),
        ));

        Self {
            service,
            channels,
            notifier,
            links,
            peers: receivers,
            dir,
        }
    }

    /// No peers, default options.
    pub fn standalone() -> Self {
        Self::new("", &[])
    }

    pub fn resv_path(&self) -> PathBuf {
        self.dir.path().join("resv.conf")
    }

    /// Reservation file contents, empty if it does not exist.
    pub fn file(&self) -> String {
        std::fs::read_to_string(self.resv_path()).unwrap_or_default()
    }

    pub async fn resv(&self, params: &[&str]) {
        self.service
            .handle(&oper(), Verb::Resv, Origin::Client, params)
            .await;
    }

    pub async fn unresv(&self, params: &[&str]) {
        self.service
            .handle(&oper(), Verb::Unresv, Origin::Client, params)
            .await;
    }

    /// Lines queued on peer link `id` since the last drain.
    pub fn drain(&mut self, id: &str) -> Vec<String> {
        let rx = self.peers.get_mut(id).unwrap();
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg.to_string());
        }
        out
    }

    /// Last notice text sent to `nick`.
    pub fn last_notice(&self, nick: &str) -> String {
        self.notifier
            .last_reply(nick)
            .map(|reply| reply.to_string())
            .unwrap_or_default()
    }
}
