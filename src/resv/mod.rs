//! Channel and nickname reservations (RESV/UNRESV).
//!
//! - [`store`]: active reservations, exact channel index and ordered nick globs
//! - [`persist`]: the reservation file and its atomic rewrite
//! - [`wire`], [`propagate`]: relaying changes to peer servers
//! - [`enforce`]: forced part of members of a newly reserved channel
//! - [`request`], [`authority`], [`service`]: command entry points

pub mod authority;
pub mod enforce;
pub mod notify;
pub mod persist;
pub mod propagate;
pub mod record;
pub mod request;
pub mod service;
pub mod store;
pub mod wire;

pub use authority::{OperPrivs, Source, SourceKind};
pub use enforce::{ChannelDirectory, LocalMember};
pub use notify::{NoticeScope, Notifier};
pub use persist::ResvFile;
pub use propagate::{LinkTable, PeerLinks, Propagator, RemoteServer};
pub use record::{ResvKind, ResvRecord};
pub use request::{Origin, ResvRequest, Verb};
pub use service::{LoadSummary, ResvService, ResvStats, spawn_expiry_task};
pub use store::ResvStore;
pub use wire::{LinkCaps, LinkId, ServerCap, ServerMessage};
