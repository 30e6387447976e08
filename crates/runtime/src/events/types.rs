//! Event payloads published by the synchronization layer.

use duel_core::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::bus::LogEntry;
use crate::wire::{IntentId, Seq};

/// Why a peer decided its replica diverged from the authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum DesyncCause {
    /// Local fingerprint differs from the authority's after a confirmation.
    FingerprintMismatch {
        seq: Seq,
        expected: Fingerprint,
        actual: Fingerprint,
    },
    /// An optimistically applied intent was refused.
    IntentRejected { intent_id: IntentId },
    /// No verdict arrived for an intent before its deadline.
    IntentTimeout { intent_id: IntentId },
    /// A confirmed command failed to execute locally.
    RemoteExecutionFailed { seq: Seq },
    /// Too many confirmations buffered behind a missing one.
    ConfirmationGap { last_seq: Seq, buffered: usize },
    /// The host application asked for a resync.
    Requested,
}

/// Replication events (commands confirmed or refused).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationEvent {
    CommandConfirmed(LogEntry),
    CommandRejected { intent_id: IntentId, reason: String },
}

/// Recovery lifecycle events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryEvent {
    DesyncDetected {
        last_seq: Seq,
        mismatch_count: u32,
        cause: DesyncCause,
    },
    /// A snapshot was installed. `converged` is false when the local
    /// fingerprint still differs from the authority's afterwards.
    RecoveryCompleted { authority_seq: Seq, converged: bool },
    /// Every recovery request went unanswered.
    RecoveryStalled { last_seq: Seq, attempts: u32 },
}
