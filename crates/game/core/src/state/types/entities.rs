use super::{CardId, EntityId, Slot};

/// Broad category of a live entity.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityKind {
    /// A card instantiated from a deck list.
    #[default]
    Card,
    /// An entity created during play (e.g. summoned by another card).
    Token,
}

/// A live simulation entity.
///
/// `attack` and `health` are the two mutable attributes that participate in
/// the state fingerprint. `label` is presentation-only.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub id: EntityId,
    pub card: CardId,
    pub kind: EntityKind,
    pub attack: i32,
    pub health: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
}

impl Entity {
    pub fn new(id: EntityId, card: CardId, attack: i32, health: i32) -> Self {
        Self {
            id,
            card,
            kind: EntityKind::Card,
            attack,
            health,
            label: None,
        }
    }

    /// Marks the entity as a token (builder pattern).
    #[must_use]
    pub fn token(mut self) -> Self {
        self.kind = EntityKind::Token;
        self
    }

    /// Attaches a display label (builder pattern).
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// Named zones owned by each participant, in canonical order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ZoneKind {
    Deck,
    Hand,
    Board,
    Discard,
}

impl ZoneKind {
    /// Canonical zone order used by scans and the fingerprint.
    pub const ALL: [Self; 4] = [Self::Deck, Self::Hand, Self::Board, Self::Discard];

    /// Private zones are hidden from the opponent.
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Deck | Self::Hand)
    }
}

/// Where an entity lives: owning seat plus zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub owner: Slot,
    pub zone: ZoneKind,
}

impl Location {
    pub const fn new(owner: Slot, zone: ZoneKind) -> Self {
        Self { owner, zone }
    }
}

/// Ordered contents of every zone of one participant.
///
/// Order within a zone is meaningful: the deck is drawn from the front and
/// the fingerprint is order-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zones {
    pub deck: Vec<Entity>,
    pub hand: Vec<Entity>,
    pub board: Vec<Entity>,
    pub discard: Vec<Entity>,
}

impl Zones {
    pub fn zone(&self, kind: ZoneKind) -> &Vec<Entity> {
        match kind {
            ZoneKind::Deck => &self.deck,
            ZoneKind::Hand => &self.hand,
            ZoneKind::Board => &self.board,
            ZoneKind::Discard => &self.discard,
        }
    }

    pub fn zone_mut(&mut self, kind: ZoneKind) -> &mut Vec<Entity> {
        match kind {
            ZoneKind::Deck => &mut self.deck,
            ZoneKind::Hand => &mut self.hand,
            ZoneKind::Board => &mut self.board,
            ZoneKind::Discard => &mut self.discard,
        }
    }

    /// Finds an entity by id within one zone.
    pub fn find(&self, kind: ZoneKind, id: EntityId) -> Option<&Entity> {
        self.zone(kind).iter().find(|entity| entity.id == id)
    }

    pub fn contains(&self, kind: ZoneKind, id: EntityId) -> bool {
        self.find(kind, id).is_some()
    }

    /// Removes an entity from a zone, returning it.
    pub fn take(&mut self, kind: ZoneKind, id: EntityId) -> Option<Entity> {
        let zone = self.zone_mut(kind);
        let index = zone.iter().position(|entity| entity.id == id)?;
        Some(zone.remove(index))
    }

    /// Iterates all entities in canonical zone order.
    pub fn iter(&self) -> impl Iterator<Item = (ZoneKind, &Entity)> {
        ZoneKind::ALL
            .into_iter()
            .flat_map(move |kind| self.zone(kind).iter().map(move |entity| (kind, entity)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.deck
            .iter_mut()
            .chain(self.hand.iter_mut())
            .chain(self.board.iter_mut())
            .chain(self.discard.iter_mut())
    }
}

/// Per-seat state: identity, hero life and zones.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticipantState {
    pub identity: super::PeerId,
    pub life: i32,
    pub zones: Zones,
}

impl ParticipantState {
    pub fn new(identity: super::PeerId, life: i32) -> Self {
        Self {
            identity,
            life,
            zones: Zones::default(),
        }
    }
}
