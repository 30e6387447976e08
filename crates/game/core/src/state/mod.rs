//! Replicated game state representation.
//!
//! This module owns the data structures that describe the two seats, their
//! zones and the turn bookkeeping. Rule engines mutate the state through their
//! own command handlers; the synchronization layer only reads it, renames
//! entity ids during reconciliation, and replaces it wholesale on recovery.
pub mod types;

pub use types::{
    CardId, Entity, EntityId, EntityKind, Location, ParticipantState, PeerId, Phase, PhaseSet,
    Slot, TurnState, ZoneKind, Zones,
};

/// Canonical snapshot of the deterministic game state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameState {
    /// RNG seed agreed out-of-band by both peers.
    ///
    /// Set once at game initialization and never modified.
    pub seed: u64,

    /// Sequential entity ID allocator (monotonically increasing, never reused).
    next_entity_id: u32,

    pub turn: TurnState,

    /// Both seats, indexed by [`Slot::index`].
    pub participants: [ParticipantState; 2],

    /// Seat that won the game, once decided.
    #[cfg_attr(feature = "serde", serde(default))]
    pub winner: Option<Slot>,
}

impl GameState {
    /// Creates a fresh state for the two seats.
    pub fn new(seed: u64, first: ParticipantState, second: ParticipantState) -> Self {
        Self {
            seed,
            next_entity_id: 1,
            turn: TurnState::default(),
            participants: [first, second],
            winner: None,
        }
    }

    pub fn participant(&self, slot: Slot) -> &ParticipantState {
        &self.participants[slot.index()]
    }

    pub fn participant_mut(&mut self, slot: Slot) -> &mut ParticipantState {
        &mut self.participants[slot.index()]
    }

    /// Maps a peer identity to its seat.
    pub fn slot_of(&self, identity: &PeerId) -> Option<Slot> {
        Slot::ALL
            .into_iter()
            .find(|slot| &self.participant(*slot).identity == identity)
    }

    /// Next id the allocator will hand out.
    pub fn next_entity_id(&self) -> EntityId {
        EntityId(self.next_entity_id)
    }

    /// Allocates a new unique EntityId.
    ///
    /// # Panics
    ///
    /// Panics if we've exhausted all available IDs.
    pub fn allocate_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id = self
            .next_entity_id
            .checked_add(1)
            .expect("EntityId overflow");
        id
    }

    /// Ensures the allocator never hands out `id` or anything below it.
    ///
    /// Used after adopting ids generated by another replica so later local
    /// allocations cannot collide with them.
    pub fn reserve_entity_ids_through(&mut self, id: EntityId) {
        if self.next_entity_id <= id.0 {
            self.next_entity_id = id.0.saturating_add(1);
        }
    }

    /// Returns the location of a live entity.
    pub fn locate(&self, id: EntityId) -> Option<Location> {
        Slot::ALL.into_iter().find_map(|slot| {
            self.participant(slot)
                .zones
                .iter()
                .find(|(_, entity)| entity.id == id)
                .map(|(zone, _)| Location::new(slot, zone))
        })
    }

    /// Returns a live entity by id, scanning every zone.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities().map(|(_, entity)| entity).find(|entity| entity.id == id)
    }

    /// Returns a live entity by id within one location.
    pub fn entity_at(&self, location: Location, id: EntityId) -> Option<&Entity> {
        self.participant(location.owner).zones.find(location.zone, id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.participants
            .iter_mut()
            .flat_map(|participant| participant.zones.iter_mut())
            .find(|entity| entity.id == id)
    }

    /// Iterates every live entity with its location, seats and zones in
    /// canonical order.
    pub fn entities(&self) -> impl Iterator<Item = (Location, &Entity)> {
        Slot::ALL.into_iter().flat_map(move |slot| {
            self.participant(slot)
                .zones
                .iter()
                .map(move |(zone, entity)| (Location::new(slot, zone), entity))
        })
    }

    /// Renames every live reference to `from` into `to`.
    ///
    /// Returns the number of entities patched. Renaming onto an id already held
    /// by a different entity is refused and patches nothing.
    pub fn rename_entity(&mut self, from: EntityId, to: EntityId) -> usize {
        if from == to {
            return 0;
        }
        if self.entity(to).is_some() {
            return 0;
        }

        let mut patched = 0;
        for entity in self
            .participants
            .iter_mut()
            .flat_map(|participant| participant.zones.iter_mut())
        {
            if entity.id == from {
                entity.id = to;
                patched += 1;
            }
        }

        if patched > 0 {
            self.reserve_entity_ids_through(to);
        }
        patched
    }

    /// True once a winner has been decided.
    pub fn is_over(&self) -> bool {
        self.winner.is_some() || self.turn.phase == Phase::GameOver
    }
}
