//! Reservation propagation to peer servers.
//!
//! Every change is relayed before it is applied locally. Each peer link
//! receives at most one copy of a change, in the one wire form it is able to
//! understand:
//!
//! | change            | `CLUSTER` link | `ENCAP` link   | neither |
//! |-------------------|----------------|----------------|---------|
//! | permanent create  | legacy         | encapsulated   | nothing |
//! | temporary create  | encapsulated*  | encapsulated   | nothing |
//! | removal           | legacy         | encapsulated   | nothing |
//!
//! (*) only when the link also speaks `ENCAP`; the legacy form has no
//! duration field and would turn a temporary reservation permanent.

use super::wire::{LinkCaps, LinkId, ServerCap, ServerMessage};
use crate::casemap::irc_to_lower;
use crate::config::{ClusterBlock, ShareFlag};
use crate::matcher::Matcher;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A server somewhere on the network and the link it is reached through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServer {
    pub name: String,
    pub link: LinkId,
}

/// Access to the directly connected peer links.
pub trait PeerLinks: Send + Sync {
    /// Every known remote server.
    fn servers(&self) -> Vec<RemoteServer>;

    /// Capabilities negotiated on `link`, if it is still connected.
    fn link_caps(&self, link: &LinkId) -> Option<LinkCaps>;

    /// Queue `msg` on `link`. Returns false if it could not be queued.
    fn send(&self, link: &LinkId, msg: ServerMessage) -> bool;

    /// Queue `msg` on every link carrying `required`, except `exclude`.
    /// Returns the number of links reached.
    fn broadcast(&self, required: ServerCap, exclude: Option<&LinkId>, msg: ServerMessage) -> usize;
}

/// One connected peer.
#[derive(Debug, Clone)]
pub struct PeerLink {
    pub name: String,
    pub caps: LinkCaps,
    pub tx: mpsc::Sender<Arc<ServerMessage>>,
}

/// Concurrent table of peer links and the servers behind them.
#[derive(Debug, Default)]
pub struct LinkTable {
    links: DashMap<LinkId, PeerLink>,
    /// Keyed by case-folded server name.
    servers: DashMap<String, RemoteServer>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directly connected peer. The peer itself is reachable
    /// through its own link.
    pub fn register_link(&self, id: LinkId, name: &str, caps: LinkCaps, tx: mpsc::Sender<Arc<ServerMessage>>) {
        self.introduce_server(name, id.clone());
        self.links.insert(
            id,
            PeerLink {
                name: name.to_string(),
                caps,
                tx,
            },
        );
    }

    /// Record that `name` sits behind `via`.
    pub fn introduce_server(&self, name: &str, via: LinkId) {
        self.servers.insert(
            irc_to_lower(name),
            RemoteServer {
                name: name.to_string(),
                link: via,
            },
        );
    }

    /// Drop a link and every server reached through it.
    pub fn remove_link(&self, id: &LinkId) -> Option<PeerLink> {
        self.servers.retain(|_, server| &server.link != id);
        self.links.remove(id).map(|(_, link)| link)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    fn enqueue(&self, id: &LinkId, peer: &PeerLink, msg: Arc<ServerMessage>) -> bool {
        match peer.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                warn!(link = %id, peer = %peer.name, command = msg.command(), "Link queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(link = %id, peer = %peer.name, "Link closed, dropping message");
                false
            }
        }
    }
}

impl PeerLinks for LinkTable {
    fn servers(&self) -> Vec<RemoteServer> {
        let mut servers: Vec<_> = self.servers.iter().map(|entry| entry.value().clone()).collect();
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        servers
    }

    fn link_caps(&self, link: &LinkId) -> Option<LinkCaps> {
        self.links.get(link).map(|peer| peer.caps)
    }

    fn send(&self, link: &LinkId, msg: ServerMessage) -> bool {
        match self.links.get(link) {
            Some(peer) => self.enqueue(link, &peer, Arc::new(msg)),
            None => {
                debug!(link = %link, "No such link");
                false
            }
        }
    }

    fn broadcast(&self, required: ServerCap, exclude: Option<&LinkId>, msg: ServerMessage) -> usize {
        let msg = Arc::new(msg);
        self.links
            .iter()
            .filter(|entry| Some(entry.key()) != exclude && entry.value().caps.has(required))
            .filter(|entry| self.enqueue(entry.key(), entry.value(), Arc::clone(&msg)))
            .count()
    }
}

/// A reservation change to relay.
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
    Create {
        /// Seconds; zero is permanent.
        duration: u64,
        pattern: &'a str,
        reason: &'a str,
    },
    Remove { pattern: &'a str },
}

/// Wire generation used on one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Legacy,
    Encap,
}

/// Choose the single form `caps` receives for `change`, if any.
pub fn select_form(caps: LinkCaps, change: &Change<'_>) -> Option<Form> {
    let temporary = matches!(change, Change::Create { duration, .. } if *duration > 0);

    if caps.has(ServerCap::Cluster) && !temporary {
        Some(Form::Legacy)
    } else if caps.has(ServerCap::Encap) {
        Some(Form::Encap)
    } else {
        None
    }
}

fn render(form: Form, source: &str, target: &str, change: &Change<'_>) -> ServerMessage {
    let (source, target) = (source.to_string(), target.to_string());
    match (form, *change) {
        (
            Form::Legacy,
            Change::Create {
                pattern, reason, ..
            },
        ) => ServerMessage::Resv {
            source,
            target,
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        },
        (
            Form::Encap,
            Change::Create {
                duration,
                pattern,
                reason,
            },
        ) => ServerMessage::EncapResv {
            source,
            target,
            duration,
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        },
        (Form::Legacy, Change::Remove { pattern }) => ServerMessage::Unresv {
            source,
            target,
            pattern: pattern.to_string(),
        },
        (Form::Encap, Change::Remove { pattern }) => ServerMessage::EncapUnresv {
            source,
            target,
            pattern: pattern.to_string(),
        },
    }
}

/// Relays reservation changes to peers.
pub struct Propagator {
    links: Arc<dyn PeerLinks>,
    matcher: Arc<dyn Matcher>,
}

impl Propagator {
    pub fn new(links: Arc<dyn PeerLinks>, matcher: Arc<dyn Matcher>) -> Self {
        Self { links, matcher }
    }

    pub fn links(&self) -> &Arc<dyn PeerLinks> {
        &self.links
    }

    /// Send `change` to every link leading to a server matching `target`,
    /// skipping `from` and links already in `seen`.
    fn send_to_matching_peers(
        &self,
        source: &str,
        from: Option<&LinkId>,
        target: &str,
        change: &Change<'_>,
        seen: &mut HashSet<LinkId>,
    ) -> usize {
        let mut sent = 0;

        for server in self.links.servers() {
            if Some(&server.link) == from
                || seen.contains(&server.link)
                || !self.matcher.matches(target, &server.name)
            {
                continue;
            }
            seen.insert(server.link.clone());

            let Some(caps) = self.links.link_caps(&server.link) else {
                continue;
            };
            let Some(form) = select_form(caps, change) else {
                debug!(link = %server.link, server = %server.name, "Peer cannot carry this change, skipping");
                continue;
            };

            if self.links.send(&server.link, render(form, source, target, change)) {
                sent += 1;
            }
        }

        sent
    }

    /// Relay a new reservation to the servers matching `target`.
    pub fn propagate_to_target(
        &self,
        source: &str,
        from: Option<&LinkId>,
        target: &str,
        duration: u64,
        pattern: &str,
        reason: &str,
    ) -> usize {
        let change = Change::Create {
            duration,
            pattern,
            reason,
        };
        self.send_to_matching_peers(source, from, target, &change, &mut HashSet::new())
    }

    /// Relay a removal to the servers matching `target`.
    pub fn propagate_removal(&self, source: &str, from: Option<&LinkId>, target: &str, pattern: &str) -> usize {
        let change = Change::Remove { pattern };
        self.send_to_matching_peers(source, from, target, &change, &mut HashSet::new())
    }

    /// Relay a new reservation to every cluster block whose flags cover it.
    pub fn propagate_to_cluster(
        &self,
        source: &str,
        clusters: &[ClusterBlock],
        duration: u64,
        pattern: &str,
        reason: &str,
    ) -> usize {
        let change = Change::Create {
            duration,
            pattern,
            reason,
        };
        self.cluster(source, clusters, ShareFlag::for_duration(duration), &change)
    }

    /// Relay a removal to every cluster block carrying `unresv`.
    pub fn cluster_removal(&self, source: &str, clusters: &[ClusterBlock], pattern: &str) -> usize {
        self.cluster(source, clusters, ShareFlag::Unresv, &Change::Remove { pattern })
    }

    fn cluster(&self, source: &str, clusters: &[ClusterBlock], flag: ShareFlag, change: &Change<'_>) -> usize {
        let mut seen = HashSet::new();
        clusters
            .iter()
            .filter(|block| {
                let allowed = block.flags.allows(flag);
                if !allowed {
                    debug!(server = %block.server, ?flag, "Cluster block does not share this change");
                }
                allowed
            })
            .map(|block| self.send_to_matching_peers(source, None, &block.server, change, &mut seen))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShareFlags;
    use crate::matcher::IrcGlob;

    struct Net {
        table: Arc<LinkTable>,
        rx: Vec<(LinkId, mpsc::Receiver<Arc<ServerMessage>>)>,
    }

    impl Net {
        fn new(peers: &[(&str, &str, &[ServerCap])]) -> Self {
            let table = Arc::new(LinkTable::new());
            let mut rx = Vec::new();
            for (id, name, caps) in peers {
                let (tx, r) = mpsc::channel(8);
                let id = LinkId::new(*id);
                table.register_link(id.clone(), name, caps.iter().copied().collect(), tx);
                rx.push((id, r));
            }
            Self { table, rx }
        }

        fn propagator(&self) -> Propagator {
            Propagator::new(self.table.clone(), Arc::new(IrcGlob))
        }

        fn drain(&mut self, id: &str) -> Vec<String> {
            let (_, rx) = self
                .rx
                .iter_mut()
                .find(|(link, _)| link.as_str() == id)
                .unwrap();
            let mut out = Vec::new();
            while let Ok(msg) = rx.try_recv() {
                out.push(msg.to_string());
            }
            out
        }
    }

    const CLUSTER: &[ServerCap] = &[ServerCap::Cluster];
    const ENCAP: &[ServerCap] = &[ServerCap::Encap];
    const BOTH: &[ServerCap] = &[ServerCap::Cluster, ServerCap::Encap];

    #[test]
    fn form_selection_is_exclusive() {
        let perm = Change::Create {
            duration: 0,
            pattern: "#x",
            reason: "r",
        };
        let temp = Change::Create {
            duration: 60,
            pattern: "#x",
            reason: "r",
        };
        let both: LinkCaps = BOTH.iter().copied().collect();
        let cluster: LinkCaps = CLUSTER.iter().copied().collect();
        let encap: LinkCaps = ENCAP.iter().copied().collect();

        assert_eq!(select_form(both, &perm), Some(Form::Legacy));
        assert_eq!(select_form(both, &temp), Some(Form::Encap));
        assert_eq!(select_form(cluster, &temp), None);
        assert_eq!(select_form(encap, &perm), Some(Form::Encap));
        assert_eq!(select_form(LinkCaps::empty(), &perm), None);
        assert_eq!(select_form(cluster, &Change::Remove { pattern: "#x" }), Some(Form::Legacy));
    }

    #[test]
    fn targeted_create_reaches_matching_peers_once() {
        let mut net = Net::new(&[
            ("1", "hub.example.net", BOTH),
            ("2", "leaf.example.net", ENCAP),
            ("3", "old.other.org", CLUSTER),
        ]);
        net.table.introduce_server("leaf2.example.net", LinkId::new("1"));

        let sent = net
            .propagator()
            .propagate_to_target("oper", None, "*.example.net", 0, "#spam", "no spam");
        assert_eq!(sent, 2);

        assert_eq!(net.drain("1"), vec![":oper RESV *.example.net #spam :no spam"]);
        assert_eq!(
            net.drain("2"),
            vec![":oper ENCAP *.example.net RESV 0 #spam 0 :no spam"]
        );
        assert!(net.drain("3").is_empty());
    }

    #[test]
    fn temporary_create_never_uses_legacy_form() {
        let mut net = Net::new(&[("1", "hub.example.net", BOTH), ("2", "old.example.net", CLUSTER)]);

        let sent = net
            .propagator()
            .propagate_to_target("oper", None, "*", 600, "bad*", "go");
        assert_eq!(sent, 1);
        assert_eq!(net.drain("1"), vec![":oper ENCAP * RESV 600 bad* 0 :go"]);
        assert!(net.drain("2").is_empty());
    }

    #[test]
    fn arrival_link_is_excluded() {
        let mut net = Net::new(&[("1", "a.example.net", CLUSTER), ("2", "b.example.net", CLUSTER)]);

        let from = LinkId::new("1");
        net.propagator()
            .propagate_removal("oper", Some(&from), "*", "#spam");
        assert!(net.drain("1").is_empty());
        assert_eq!(net.drain("2"), vec![":oper UNRESV * #spam"]);
    }

    #[test]
    fn cluster_flags_gate_sends() {
        let mut net = Net::new(&[("1", "a.example.net", ENCAP), ("2", "b.other.org", ENCAP)]);
        let clusters = vec![
            ClusterBlock {
                server: "*.example.net".into(),
                flags: ShareFlags::new([ShareFlag::Tresv]),
            },
            ClusterBlock {
                server: "*.other.org".into(),
                flags: ShareFlags::new([ShareFlag::Presv, ShareFlag::Unresv]),
            },
        ];
        let prop = net.propagator();

        assert_eq!(prop.propagate_to_cluster("oper", &clusters, 0, "#x", "r"), 1);
        assert!(net.drain("1").is_empty());
        assert_eq!(net.drain("2").len(), 1);

        assert_eq!(prop.propagate_to_cluster("oper", &clusters, 60, "#x", "r"), 1);
        assert_eq!(net.drain("1"), vec![":oper ENCAP *.example.net RESV 60 #x 0 :r"]);

        assert_eq!(prop.cluster_removal("oper", &clusters, "#x"), 1);
        assert_eq!(net.drain("2"), vec![":oper ENCAP *.other.org UNRESV #x"]);
    }

    #[test]
    fn overlapping_cluster_blocks_send_once_per_link() {
        let mut net = Net::new(&[("1", "a.example.net", ENCAP)]);
        let clusters = vec![
            ClusterBlock {
                server: "*".into(),
                flags: ShareFlags::new([ShareFlag::All]),
            },
            ClusterBlock {
                server: "a.example.net".into(),
                flags: ShareFlags::new([ShareFlag::All]),
            },
        ];

        assert_eq!(net.propagator().cluster_removal("oper", &clusters, "#x"), 1);
        assert_eq!(net.drain("1").len(), 1);
    }

    #[test]
    fn full_queue_is_dropped_not_awaited() {
        let table = LinkTable::new();
        let (tx, _rx) = mpsc::channel(1);
        table.register_link(LinkId::new("1"), "a.example.net", ENCAP.iter().copied().collect(), tx);

        let msg = ServerMessage::Part {
            uid: "001AAAAAA".into(),
            channel: "#x".into(),
        };
        assert!(table.send(&LinkId::new("1"), msg.clone()));
        assert!(!table.send(&LinkId::new("1"), msg));
    }

    #[test]
    fn removing_link_forgets_servers_behind_it() {
        let table = LinkTable::new();
        let (tx, _rx) = mpsc::channel(1);
        table.register_link(LinkId::new("1"), "hub.example.net", LinkCaps::empty(), tx);
        table.introduce_server("leaf.example.net", LinkId::new("1"));
        assert_eq!(table.servers().len(), 2);

        assert!(table.remove_link(&LinkId::new("1")).is_some());
        assert!(table.servers().is_empty());
        assert_eq!(table.link_count(), 0);
    }
}
