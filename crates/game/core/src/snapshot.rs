//! Full-state snapshots used by desync recovery.
//!
//! A snapshot is the bincode encoding of a [`GameState`] plus a format version
//! and the fingerprint of the captured state. Restoring verifies both, so a
//! snapshot corrupted in transit is refused instead of silently installed.

use crate::fingerprint::{Fingerprint, fingerprint};
use crate::state::GameState;

/// Errors raised while capturing, restoring or applying a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(String),

    #[error("snapshot decoding failed: {0}")]
    Decode(String),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("snapshot fingerprint {declared} does not match decoded state {actual}")]
    Corrupted {
        declared: Fingerprint,
        actual: Fingerprint,
    },

    #[error("snapshot refused by the simulation: {0}")]
    Refused(String),
}

/// Serializable image of the complete game state.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub version: u16,
    /// Fingerprint of the captured state.
    pub fingerprint: Fingerprint,
    pub bytes: Vec<u8>,
}

impl Snapshot {
    pub const FORMAT_VERSION: u16 = 1;

    /// Captures `state`.
    pub fn capture(state: &GameState) -> Result<Self, SnapshotError> {
        let bytes =
            bincode::serialize(state).map_err(|err| SnapshotError::Encode(err.to_string()))?;
        Ok(Self {
            version: Self::FORMAT_VERSION,
            fingerprint: fingerprint(state),
            bytes,
        })
    }

    /// Decodes the captured state, verifying version and fingerprint.
    pub fn restore(&self) -> Result<GameState, SnapshotError> {
        if self.version != Self::FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                expected: Self::FORMAT_VERSION,
            });
        }

        let state: GameState = bincode::deserialize(&self.bytes)
            .map_err(|err| SnapshotError::Decode(err.to_string()))?;

        let actual = fingerprint(&state);
        if actual != self.fingerprint {
            return Err(SnapshotError::Corrupted {
                declared: self.fingerprint,
                actual,
            });
        }
        Ok(state)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Options controlling how a simulation installs a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Bypass every protective check (e.g. "never overwrite my own private
    /// zones") and replace the state wholesale.
    pub force: bool,
}

impl ApplyOptions {
    pub const FORCE: Self = Self { force: true };
}
