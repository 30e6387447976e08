//! Interface the synchronization layer drives a rule engine through.
//!
//! The engine owns the [`GameState`] and gives commands their meaning. The
//! synchronization layer only needs to execute a command, read the state,
//! rename ids in place, and swap the state for a snapshot.

use crate::command::Command;
use crate::error::ExecutionError;
use crate::snapshot::{ApplyOptions, Snapshot, SnapshotError};
use crate::state::{EntityId, GameState};

/// Outcome of a successfully executed command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Ids of entities created by the command, in creation order.
    pub created: Vec<EntityId>,
}

impl ExecutionReport {
    pub fn with_created(created: Vec<EntityId>) -> Self {
        Self { created }
    }
}

/// A deterministic executor holding one replica of the game.
pub trait SimulationHost {
    /// Applies `command` to the replica.
    ///
    /// A failed command must leave the state untouched.
    fn execute(&mut self, command: &Command) -> Result<ExecutionReport, ExecutionError>;

    fn state(&self) -> &GameState;

    fn state_mut(&mut self) -> &mut GameState;

    /// Captures the full replica.
    fn build_snapshot(&self) -> Result<Snapshot, SnapshotError> {
        Snapshot::capture(self.state())
    }

    /// Installs a snapshot.
    ///
    /// Without [`ApplyOptions::force`] an engine may keep parts of its own
    /// replica (e.g. its private zones). With it, the state is replaced
    /// wholesale.
    fn apply_snapshot(
        &mut self,
        snapshot: &Snapshot,
        options: ApplyOptions,
    ) -> Result<(), SnapshotError>;
}
