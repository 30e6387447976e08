//! Worker tasks that back the peer orchestration.
//!
//! The peer worker owns the replication bus; everything else talks to it
//! through channels.

mod peer;

pub use peer::{PeerCommand, PeerWorker};
