//! Deterministic game setup.
//!
//! Both peers build the initial [`GameState`] independently from the same
//! [`DuelSetup`]; identical inputs yield identical states and fingerprints.

use duel_core::{CardId, DuelConfig, ExecutionError, GameState, ParticipantState, PeerId, Slot};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::catalog::CardCatalog;

/// Inputs agreed out-of-band before a duel starts.
#[derive(Clone, Debug)]
pub struct DuelSetup {
    pub seed: u64,
    pub first: PeerId,
    pub second: PeerId,
    /// Deck list used by both seats. Empty means the catalog's starter deck.
    pub deck: Vec<CardId>,
    pub config: DuelConfig,
}

impl DuelSetup {
    pub fn new(seed: u64, first: impl Into<PeerId>, second: impl Into<PeerId>) -> Self {
        Self {
            seed,
            first: first.into(),
            second: second.into(),
            deck: Vec::new(),
            config: DuelConfig::default(),
        }
    }

    /// Overrides the deck list (builder pattern).
    #[must_use]
    pub fn with_deck(mut self, deck: Vec<CardId>) -> Self {
        self.deck = deck;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: DuelConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the initial state: decks instantiated seat by seat, shuffled,
    /// opening hands drawn, turn 1 in the main phase with the first seat
    /// active.
    pub fn build(&self, catalog: &CardCatalog) -> Result<GameState, ExecutionError> {
        let mut state = GameState::new(
            self.seed,
            ParticipantState::new(self.first.clone(), self.config.starting_life),
            ParticipantState::new(self.second.clone(), self.config.starting_life),
        );

        let deck_list = if self.deck.is_empty() {
            catalog.starter_deck()
        } else {
            self.deck.as_slice()
        };

        for slot in Slot::ALL {
            let mut deck = Vec::with_capacity(deck_list.len());
            for card in deck_list {
                let definition = catalog
                    .get(card)
                    .ok_or_else(|| ExecutionError::UnknownCard { card: card.clone() })?;
                deck.push(definition.instantiate(state.allocate_entity_id()));
            }

            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(u64::from(slot.0)));
            deck.shuffle(&mut rng);

            let zones = &mut state.participant_mut(slot).zones;
            let opening = self.config.opening_hand.min(deck.len());
            zones.hand = deck.drain(..opening).collect();
            zones.deck = deck;
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::{Phase, fingerprint};

    fn catalog() -> CardCatalog {
        CardCatalog::embedded().expect("catalog")
    }

    #[test]
    fn same_seed_builds_identical_states() {
        let setup = DuelSetup::new(99, "host", "guest");
        let a = setup.build(&catalog()).expect("setup");
        let b = setup.build(&catalog()).expect("setup");
        assert_eq!(a, b);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn seeds_shuffle_differently() {
        let a = DuelSetup::new(1, "host", "guest").build(&catalog()).expect("setup");
        let b = DuelSetup::new(2, "host", "guest").build(&catalog()).expect("setup");
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn opening_hands_are_drawn() {
        let catalog = catalog();
        let state = DuelSetup::new(5, "host", "guest").build(&catalog).expect("setup");
        let deck_size = catalog.starter_deck().len();

        for slot in Slot::ALL {
            let zones = &state.participant(slot).zones;
            assert_eq!(zones.hand.len(), DuelConfig::DEFAULT_OPENING_HAND);
            assert_eq!(zones.deck.len(), deck_size - DuelConfig::DEFAULT_OPENING_HAND);
        }
        assert_eq!(state.turn.number, 1);
        assert_eq!(state.turn.phase, Phase::Main);
        assert_eq!(state.turn.active, Slot::FIRST);
    }

    #[test]
    fn unknown_deck_card_fails() {
        let setup = DuelSetup::new(5, "host", "guest").with_deck(vec![CardId::from("unicorn")]);
        assert!(matches!(
            setup.build(&catalog()),
            Err(ExecutionError::UnknownCard { .. })
        ));
    }
}
