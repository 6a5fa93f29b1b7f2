//! Integration test common infrastructure.
//!
//! Provides in-memory stand-ins for the daemon pieces the reservation
//! service talks to, and a harness wiring them to a [`ResvService`].

pub mod fakes;
pub mod harness;

#[allow(unused_imports)]
pub use fakes::{FakeChannels, RecordingNotifier, member};
#[allow(unused_imports)]
pub use harness::{Harness, oper, remote_user};
