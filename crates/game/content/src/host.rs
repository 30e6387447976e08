//! [`SimulationHost`] implementation backed by the reference rules.

use std::sync::Arc;

use duel_core::{
    ApplyOptions, Command, ExecutionError, ExecutionReport, GameState, PeerId, SimulationHost,
    Snapshot, SnapshotError, ZoneKind,
};

use crate::catalog::CardCatalog;
use crate::rules;
use crate::setup::DuelSetup;

/// One replica of a duel, executing commands with the reference rules.
#[derive(Clone, Debug)]
pub struct DuelHost {
    catalog: Arc<CardCatalog>,
    state: GameState,
    /// Identity whose private zones survive a non-forced snapshot.
    local: Option<PeerId>,
}

impl DuelHost {
    pub fn new(catalog: Arc<CardCatalog>, state: GameState) -> Self {
        Self {
            catalog,
            state,
            local: None,
        }
    }

    /// Builds a replica from an agreed setup.
    pub fn from_setup(catalog: Arc<CardCatalog>, setup: &DuelSetup) -> Result<Self, ExecutionError> {
        let state = setup.build(&catalog)?;
        Ok(Self::new(catalog, state))
    }

    /// Binds the replica to the local peer (builder pattern).
    #[must_use]
    pub fn for_peer(mut self, local: impl Into<PeerId>) -> Self {
        self.local = Some(local.into());
        self
    }

    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    pub fn local_peer(&self) -> Option<&PeerId> {
        self.local.as_ref()
    }
}

impl SimulationHost for DuelHost {
    fn execute(&mut self, command: &Command) -> Result<ExecutionReport, ExecutionError> {
        rules::apply(&mut self.state, &self.catalog, command)
    }

    fn state(&self) -> &GameState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    fn apply_snapshot(
        &mut self,
        snapshot: &Snapshot,
        options: ApplyOptions,
    ) -> Result<(), SnapshotError> {
        let mut incoming = snapshot.restore()?;

        let own_slot = self
            .local
            .as_ref()
            .and_then(|peer| self.state.slot_of(peer));
        if let (false, Some(slot)) = (options.force, own_slot) {
            // Keep our own private zones; the sender may not know them.
            let own = &self.state.participant(slot).zones;
            let target = &mut incoming.participant_mut(slot).zones;
            target.deck = own.deck.clone();
            target.hand = own.hand.clone();

            let highest = [ZoneKind::Deck, ZoneKind::Hand]
                .into_iter()
                .flat_map(|zone| own.zone(zone).iter().map(|entity| entity.id))
                .max();
            if let Some(highest) = highest {
                incoming.reserve_entity_ids_through(highest);
            }
        }

        self.state = incoming;
        Ok(())
    }
}
