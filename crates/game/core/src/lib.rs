//! Deterministic duel state and the pure halves of peer synchronization.
//!
//! `duel-core` defines the replicated [`GameState`], the command model, and
//! the side-effect-free functions both peers must agree on: the state
//! [`fingerprint`], the authority's [`validate`] pass and the command
//! [`codec`]. Rule engines and the synchronization runtime depend on the types
//! re-exported here.
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod fingerprint;
#[cfg(feature = "serde")]
pub mod host;
pub mod role;
#[cfg(feature = "serde")]
pub mod snapshot;
pub mod state;
pub mod validation;

pub use codec::{decode, encode, resolve};
pub use command::{
    AttackTarget, Command, CommandKind, CommandOf, EntityRef, EntitySlot, Value, WireCommand, keys,
};
pub use config::DuelConfig;
pub use error::{ErrorSeverity, ExecutionError};
pub use fingerprint::{Fingerprint, canonical_encoding, fingerprint};
#[cfg(feature = "serde")]
pub use host::{ExecutionReport, SimulationHost};
pub use role::{Role, RoleError, SessionMetadata};
#[cfg(feature = "serde")]
pub use snapshot::{ApplyOptions, Snapshot, SnapshotError};
pub use state::{
    CardId, Entity, EntityId, EntityKind, GameState, Location, ParticipantState, PeerId, Phase,
    PhaseSet, Slot, TurnState, ZoneKind, Zones,
};
pub use validation::{CommandRule, Rejection, rule_for, validate};
