//! Host-authoritative replication for two-peer duels.
//!
//! One peer (the authority) sequences, validates and executes every command;
//! the other (the subordinate) executes its own commands optimistically,
//! submits them as intents, and converges on the authority's state through
//! confirmations, entity-id reconciliation and, when fingerprints diverge,
//! full snapshot recovery.
//!
//! Modules are organized by responsibility:
//! - [`bus`] hosts the synchronous replication state machine
//! - [`runtime`] hosts the async peer orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides a topic-based event bus for sync events
//! - [`wire`] defines the peer-to-peer messages
//! - [`transport`] provides an in-process transport
//! - [`workers`] keeps background tasks internal to the crate
pub mod api;
pub mod bus;
pub mod config;
pub mod events;
pub mod runtime;
pub mod transport;
pub mod wire;

mod workers;

pub use api::{ExecutionReport, PeerHandle, Result, SimulationHost, SyncError, Transport};
pub use bus::{
    ActionBus, ActionLog, Dispatched, GateOutcome, IntentOrderingGate, LogEntry, PendingIntent,
    PendingIntents, SyncPhase, SyncStatus,
};
pub use config::SyncConfig;
pub use events::{DesyncCause, EventBus, RecoveryEvent, ReplicationEvent, SyncEvent, Topic};
pub use runtime::{Peer, PeerBuilder};
pub use transport::{MemoryTransport, forward_link, memory_link};
pub use wire::{
    ConfirmedCommand, IntentId, IntentRejected, RecoveryRequest, RecoveryResponse, Seq,
    SubmitIntent, WireError, WireMessage,
};
