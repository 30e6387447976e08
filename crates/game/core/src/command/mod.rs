//! Command domain - what a participant asks the simulation to do.
//!
//! A command is a routing [`CommandKind`] plus a payload tree. The
//! synchronization layer never interprets a payload beyond the entity slots
//! inside it; rule engines give commands their meaning.
//!
//! # Module Structure
//!
//! - `value`: payload tree, entity slots and entity references
//!
//! [`Command`] is the local form (live entities), [`WireCommand`] the network
//! form (entity references only). See [`crate::codec`] for the conversion.

pub mod value;

use std::collections::BTreeMap;

pub use value::{EntityRef, EntitySlot, Value};

use crate::state::{Entity, Slot};

/// Well-known payload keys.
pub mod keys {
    /// Entity played from the sender's hand.
    pub const CARD: &str = "card";
    /// Board entity performing an attack.
    pub const ATTACKER: &str = "attacker";
    /// Attack target: an opposing board entity or [`HERO`].
    pub const TARGET: &str = "target";
    /// Free-form text of an emote.
    pub const TEXT: &str = "text";
    /// Seat issuing a concession.
    pub const SEAT: &str = "seat";

    /// Target marker for attacking the opposing hero directly.
    pub const HERO: &str = "hero";
}

/// Closed set of command kinds understood by the validator and rule engines.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CommandKind {
    DrawCard,
    PlayCard,
    Attack,
    EndPhase,
    EndTurn,
    Concede,
    Emote,
}

/// A command whose entity slots are of type `S`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandOf<S> {
    pub kind: CommandKind,
    #[cfg_attr(feature = "serde", serde(default = "BTreeMap::new"))]
    pub payload: BTreeMap<String, Value<S>>,
}

/// Local command holding live (or missing) entities.
pub type Command = CommandOf<EntitySlot>;

/// Network form of a command holding only entity references.
pub type WireCommand = CommandOf<EntityRef>;

impl<S> CommandOf<S> {
    /// Creates a command with an empty payload.
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            payload: BTreeMap::new(),
        }
    }

    /// Inserts a payload entry (builder pattern).
    #[must_use]
    pub fn with(mut self, key: &str, value: Value<S>) -> Self {
        self.payload.insert(key.to_owned(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value<S>> {
        self.payload.get(key)
    }

    /// Entity slot stored directly under `key`.
    pub fn entity(&self, key: &str) -> Option<&S> {
        self.get(key).and_then(Value::as_entity)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    /// Visits every entity slot in the payload.
    pub fn for_each_slot(&self, mut f: impl FnMut(&S)) {
        for value in self.payload.values() {
            value.for_each_slot(&mut f);
        }
    }

    pub fn for_each_slot_mut(&mut self, mut f: impl FnMut(&mut S)) {
        for value in self.payload.values_mut() {
            value.for_each_slot_mut(&mut f);
        }
    }

    /// Rebuilds the command with converted entity slots.
    pub fn map_slots<T>(&self, mut f: impl FnMut(&S) -> T) -> CommandOf<T> {
        CommandOf {
            kind: self.kind,
            payload: self
                .payload
                .iter()
                .map(|(key, value)| (key.clone(), value.map_slots(&mut f)))
                .collect(),
        }
    }
}

/// Target of an attack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttackTarget {
    Hero,
    Entity(Entity),
}

impl Command {
    pub fn draw_card() -> Self {
        Self::new(CommandKind::DrawCard)
    }

    pub fn play_card(card: Entity) -> Self {
        Self::new(CommandKind::PlayCard).with(keys::CARD, Value::Entity(card.into()))
    }

    pub fn attack(attacker: Entity, target: AttackTarget) -> Self {
        let target = match target {
            AttackTarget::Hero => Value::Text(keys::HERO.to_owned()),
            AttackTarget::Entity(entity) => Value::Entity(entity.into()),
        };
        Self::new(CommandKind::Attack)
            .with(keys::ATTACKER, Value::Entity(attacker.into()))
            .with(keys::TARGET, target)
    }

    pub fn end_phase() -> Self {
        Self::new(CommandKind::EndPhase)
    }

    pub fn end_turn() -> Self {
        Self::new(CommandKind::EndTurn)
    }

    pub fn concede(seat: Slot) -> Self {
        Self::new(CommandKind::Concede).with(keys::SEAT, Value::Int(i64::from(seat.0)))
    }

    pub fn emote(text: impl Into<String>) -> Self {
        Self::new(CommandKind::Emote).with(keys::TEXT, Value::Text(text.into()))
    }

    /// Live entity stored under `key`, if it resolved.
    pub fn live_entity(&self, key: &str) -> Option<&Entity> {
        self.entity(key).and_then(EntitySlot::live)
    }

    /// Returns true if any entity slot failed to resolve.
    pub fn has_missing_entities(&self) -> bool {
        let mut missing = false;
        self.for_each_slot(|slot| missing |= slot.is_missing());
        missing
    }

    /// Seat named by the payload, if it is a valid seat index.
    pub fn seat(&self) -> Option<Slot> {
        match self.get(keys::SEAT)?.as_int()? {
            0 => Some(Slot::FIRST),
            1 => Some(Slot::SECOND),
            _ => None,
        }
    }

    /// Resolves the attack target stored in the payload.
    ///
    /// `None` means the target is absent, unresolved, or malformed.
    pub fn attack_target(&self) -> Option<AttackTarget> {
        match self.get(keys::TARGET)? {
            Value::Text(text) if text == keys::HERO => Some(AttackTarget::Hero),
            Value::Entity(EntitySlot::Live(entity)) => Some(AttackTarget::Entity(entity.clone())),
            _ => None,
        }
    }
}
