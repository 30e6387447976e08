//! Payload value tree with a pluggable entity slot.
//!
//! The same tree shape carries live entities on the sending side
//! ([`EntitySlot`]) and entity references on the wire ([`EntityRef`]); the
//! codec converts between the two by mapping slots.

use std::collections::BTreeMap;

use crate::state::{CardId, Entity, EntityId, EntityKind, Location};

/// A node of a command payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Value<S> {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<Value<S>>),
    Map(BTreeMap<String, Value<S>>),
    Entity(S),
}

impl<S> Value<S> {
    /// Rebuilds the tree, converting every entity slot with `f`.
    pub fn map_slots<T>(&self, f: &mut impl FnMut(&S) -> T) -> Value<T> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(value) => Value::Bool(*value),
            Value::Int(value) => Value::Int(*value),
            Value::Text(value) => Value::Text(value.clone()),
            Value::List(items) => Value::List(items.iter().map(|item| item.map_slots(f)).collect()),
            Value::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.map_slots(f)))
                    .collect(),
            ),
            Value::Entity(slot) => Value::Entity(f(slot)),
        }
    }

    /// Visits every entity slot mutably, depth-first.
    pub fn for_each_slot_mut(&mut self, f: &mut impl FnMut(&mut S)) {
        match self {
            Value::List(items) => items.iter_mut().for_each(|item| item.for_each_slot_mut(f)),
            Value::Map(entries) => entries
                .values_mut()
                .for_each(|value| value.for_each_slot_mut(f)),
            Value::Entity(slot) => f(slot),
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Text(_) => {}
        }
    }

    /// Visits every entity slot, depth-first.
    pub fn for_each_slot(&self, f: &mut impl FnMut(&S)) {
        match self {
            Value::List(items) => items.iter().for_each(|item| item.for_each_slot(f)),
            Value::Map(entries) => entries.values().for_each(|value| value.for_each_slot(f)),
            Value::Entity(slot) => f(slot),
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Text(_) => {}
        }
    }

    pub fn as_entity(&self) -> Option<&S> {
        match self {
            Value::Entity(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }
}

/// Network-safe stand-in for a live entity.
///
/// Resolved on the receiver by `entity_id` first, then by `secondary_id`.
/// `zone_hint` only orders the search.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityRef {
    pub entity_id: EntityId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub secondary_id: Option<CardId>,
    pub kind: EntityKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub zone_hint: Option<Location>,
}

impl EntityRef {
    /// Builds a reference to `entity`, optionally hinting where it lives.
    pub fn to(entity: &Entity, zone_hint: Option<Location>) -> Self {
        Self {
            entity_id: entity.id,
            secondary_id: Some(entity.card.clone()),
            kind: entity.kind,
            zone_hint,
        }
    }
}

/// Entity position in a local or decoded command.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntitySlot {
    /// A live entity from the local state.
    Live(Entity),
    /// A reference that did not resolve against the receiver's state.
    Missing(EntityRef),
}

impl EntitySlot {
    pub fn live(&self) -> Option<&Entity> {
        match self {
            EntitySlot::Live(entity) => Some(entity),
            EntitySlot::Missing(_) => None,
        }
    }

    /// Id the slot points at, resolved or not.
    pub fn entity_id(&self) -> EntityId {
        match self {
            EntitySlot::Live(entity) => entity.id,
            EntitySlot::Missing(reference) => reference.entity_id,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, EntitySlot::Missing(_))
    }
}

impl From<Entity> for EntitySlot {
    fn from(entity: Entity) -> Self {
        EntitySlot::Live(entity)
    }
}
