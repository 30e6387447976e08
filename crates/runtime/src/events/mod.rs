//! Topic-based event bus for synchronization events.
//!
//! Events are published to specific topics, and consumers subscribe only to
//! the topics they need.

mod bus;
mod types;

pub use bus::{EventBus, SyncEvent, Topic};
pub use types::{DesyncCause, RecoveryEvent, ReplicationEvent};
