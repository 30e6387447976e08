//! Append-only record of confirmed commands.
//!
//! Kept on both peers for diagnostics. Recovery ships full state and never
//! replays the log.

use chrono::{DateTime, Utc};
use duel_core::{EntityId, Fingerprint, PeerId, WireCommand};
use serde::{Deserialize, Serialize};

use crate::wire::{IntentId, Seq};

/// One confirmed command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: Seq,
    pub command: WireCommand,
    /// Authority fingerprint after the command.
    pub fingerprint: Fingerprint,
    pub timestamp: DateTime<Utc>,
    /// Peer that originated the command.
    pub origin: PeerId,
    #[serde(default)]
    pub intent_id: Option<IntentId>,
    #[serde(default)]
    pub created_entity_ids: Vec<EntityId>,
}

#[derive(Clone, Debug, Default)]
pub struct ActionLog {
    entries: Vec<LogEntry>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        debug_assert!(
            self.entries.last().is_none_or(|last| last.seq < entry.seq),
            "log entries must be appended in sequence order"
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Used when a snapshot supersedes local history.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
