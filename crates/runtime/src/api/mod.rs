//! Public synchronization API surface.
//!
//! This module gathers the types exposed to consumers of the crate so other
//! layers can stay focused on replication, workers, or transports.

pub mod errors;
pub mod handle;
pub mod host;

pub use errors::{Result, SyncError};
pub use handle::PeerHandle;
pub use host::{ExecutionReport, SimulationHost, Transport};
