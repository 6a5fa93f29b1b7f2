//! slircd-resv - channel and nickname reservations for slircd-ng.
//!
//! Operators reserve channel names and nickname patterns with `RESV` and
//! lift them with `UNRESV`. Reservations are shared with peer servers,
//! permanent ones are kept in a text file, and members of a newly reserved
//! channel are parted.

pub mod casemap;
pub mod config;
pub mod error;
pub mod matcher;
pub mod reply;
pub mod resv;

pub use config::Config;
pub use error::{PersistError, ResvError, ResvResult, ValidationError};
pub use matcher::{IrcGlob, Matcher};
pub use reply::Reply;
pub use resv::ResvService;
