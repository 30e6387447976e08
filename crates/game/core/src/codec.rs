//! Command codec - live entities to wire references and back.
//!
//! Encoding never fails: every live entity becomes an [`EntityRef`] carrying
//! the entity's current location as a search hint. Decoding never fails
//! either: references that do not resolve against the receiver's state become
//! [`EntitySlot::Missing`], so the command is rejected later by validation or
//! execution instead of crashing the receiver.

use crate::command::{Command, EntityRef, EntitySlot, WireCommand};
use crate::state::{Entity, GameState, Location};

/// Converts a local command into its network form.
///
/// `state` is the sender's state; it only supplies zone hints.
pub fn encode(command: &Command, state: &GameState) -> WireCommand {
    command.map_slots(|slot| match slot {
        EntitySlot::Live(entity) => EntityRef::to(entity, state.locate(entity.id)),
        EntitySlot::Missing(reference) => reference.clone(),
    })
}

/// Converts a wire command into a local command, resolving references
/// against the receiver's `state`.
pub fn decode(wire: &WireCommand, state: &GameState) -> Command {
    wire.map_slots(|reference| match resolve(reference, state) {
        Some(entity) => EntitySlot::Live(entity.clone()),
        None => EntitySlot::Missing(reference.clone()),
    })
}

/// Resolves a reference to at most one live entity.
///
/// Lookup order:
/// 1. `entity_id` in the hinted location
/// 2. `entity_id` anywhere
/// 3. `secondary_id` (with matching kind) in the hinted location
/// 4. `secondary_id` (with matching kind) anywhere, first in canonical order
pub fn resolve<'a>(reference: &EntityRef, state: &'a GameState) -> Option<&'a Entity> {
    let by_id = |entity: &&Entity| entity.id == reference.entity_id;
    if let Some(entity) = scan(state, reference.zone_hint, by_id) {
        return Some(entity);
    }

    let secondary = reference.secondary_id.as_ref()?;
    let by_secondary =
        |entity: &&Entity| &entity.card == secondary && entity.kind == reference.kind;
    scan(state, reference.zone_hint, by_secondary)
}

fn scan<'a>(
    state: &'a GameState,
    hint: Option<Location>,
    predicate: impl Fn(&&'a Entity) -> bool,
) -> Option<&'a Entity> {
    if let Some(location) = hint {
        let hinted = state
            .participant(location.owner)
            .zones
            .zone(location.zone)
            .iter()
            .find(&predicate);
        if hinted.is_some() {
            return hinted;
        }
    }
    state.entities().map(|(_, entity)| entity).find(&predicate)
}
