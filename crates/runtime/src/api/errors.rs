//! Unified error types surfaced by the synchronization API.
//!
//! Wraps rule-engine, role, snapshot and framing failures together with
//! worker coordination errors so clients can bubble them up with consistent
//! context.
use thiserror::Error;
use tokio::sync::oneshot;

use duel_core::{ExecutionError, RoleError, SnapshotError};

use crate::wire::WireError;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("a desync recovery is in progress; dispatch is suspended")]
    RecoveryInProgress,

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("peer worker command channel closed")]
    CommandChannelClosed,

    #[error("peer worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("peer worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("peer requires a simulation host before building")]
    MissingHost,

    #[error("peer requires a transport before building")]
    MissingTransport,
}
