pub mod common;
pub mod entities;
pub mod turn;

// Re-export identifiers
pub use common::{CardId, EntityId, PeerId, Slot};

// Re-export entity and zone types
pub use entities::{Entity, EntityKind, Location, ParticipantState, ZoneKind, Zones};

// Re-export turn state
pub use turn::{Phase, PhaseSet, TurnState};
