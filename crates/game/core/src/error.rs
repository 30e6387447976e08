//! Common error infrastructure for duel-core.
//!
//! [`ExecutionError`] is the failure type rule engines report when a command
//! cannot be applied. It lives here, next to the state model, so that every
//! executor and the synchronization layer agree on it.
//!
//! # Design Principles
//!
//! - **Type Safety**: variants carry the ids involved, not formatted strings
//! - **Severity Classification**: callers decide between "reject the input"
//!   and "the replica is inconsistent" without string matching

use crate::command::CommandKind;
use crate::state::{CardId, EntityId, Phase, ZoneKind};

/// Severity level of an execution error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Invalid input for the current state; rejecting it is sufficient.
    ///
    /// Examples: deck empty, card not in hand
    Validation,

    /// Unexpected state inconsistency; the replica may have diverged.
    ///
    /// Examples: unknown card definition, entity referenced by a confirmed
    /// command does not exist
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

/// Reasons a rule engine can refuse to apply a command.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionError {
    #[error("entity {entity} not found")]
    EntityNotFound { entity: EntityId },

    #[error("entity {entity} is not in the {zone} zone")]
    NotInZone { entity: EntityId, zone: ZoneKind },

    #[error("payload field '{key}' is missing or malformed")]
    InvalidPayload { key: String },

    #[error("deck is empty")]
    DeckEmpty,

    #[error("{zone} zone is full")]
    ZoneFull { zone: ZoneKind },

    #[error("the {phase} phase cannot be ended with {kind}")]
    PhaseCannotAdvance { phase: Phase, kind: CommandKind },

    #[error("the game is over")]
    GameOver,

    #[error("card definition '{card}' is unknown")]
    UnknownCard { card: CardId },
}

impl ExecutionError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExecutionError::UnknownCard { .. } => ErrorSeverity::Internal,
            ExecutionError::EntityNotFound { .. }
            | ExecutionError::NotInZone { .. }
            | ExecutionError::InvalidPayload { .. }
            | ExecutionError::DeckEmpty
            | ExecutionError::ZoneFull { .. }
            | ExecutionError::PhaseCannotAdvance { .. }
            | ExecutionError::GameOver => ErrorSeverity::Validation,
        }
    }

    /// Returns a static string identifier for this error variant.
    pub const fn error_code(&self) -> &'static str {
        match self {
            ExecutionError::EntityNotFound { .. } => "entity_not_found",
            ExecutionError::NotInZone { .. } => "not_in_zone",
            ExecutionError::InvalidPayload { .. } => "invalid_payload",
            ExecutionError::DeckEmpty => "deck_empty",
            ExecutionError::ZoneFull { .. } => "zone_full",
            ExecutionError::PhaseCannotAdvance { .. } => "phase_cannot_advance",
            ExecutionError::GameOver => "game_over",
            ExecutionError::UnknownCard { .. } => "unknown_card",
        }
    }
}
