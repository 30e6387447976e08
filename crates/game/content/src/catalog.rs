//! Card catalog loader.
//!
//! Loads card definitions and the starter deck list from RON data.

use std::collections::HashMap;

use duel_core::{CardId, Entity, EntityId};
use serde::Deserialize;

/// Embedded reference catalog.
const EMBEDDED_CATALOG: &str = include_str!("../data/cards.ron");

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to parse card catalog: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("card '{0}' is defined more than once")]
    DuplicateCard(CardId),

    #[error("card '{card}' summons unknown token '{summons}'")]
    UnknownSummon { card: CardId, summons: CardId },

    #[error("deck lists unknown card '{0}'")]
    UnknownDeckCard(CardId),
}

/// Static definition of a card.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CardDefinition {
    pub id: CardId,
    pub name: String,
    pub attack: i32,
    pub health: i32,
    /// Token created on the board when this card is played.
    #[serde(default)]
    pub summons: Option<CardId>,
    /// Tokens only enter play through `summons`.
    #[serde(default)]
    pub token: bool,
}

impl CardDefinition {
    /// Instantiates the definition as a live entity.
    pub fn instantiate(&self, id: EntityId) -> Entity {
        let entity = Entity::new(id, self.id.clone(), self.attack, self.health)
            .with_label(self.name.clone());
        if self.token { entity.token() } else { entity }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    cards: Vec<CardDefinition>,
    #[serde(default)]
    starter_deck: Vec<CardId>,
}

/// Card definitions keyed by [`CardId`].
#[derive(Clone, Debug)]
pub struct CardCatalog {
    cards: HashMap<CardId, CardDefinition>,
    starter_deck: Vec<CardId>,
}

impl CardCatalog {
    /// Loads the catalog shipped with the crate.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_ron_str(EMBEDDED_CATALOG)
    }

    /// Parses a catalog from RON text and checks cross references.
    pub fn from_ron_str(source: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = ron::from_str(source)?;

        let mut cards = HashMap::with_capacity(file.cards.len());
        for definition in file.cards {
            let id = definition.id.clone();
            if cards.insert(id.clone(), definition).is_some() {
                return Err(CatalogError::DuplicateCard(id));
            }
        }

        for definition in cards.values() {
            let Some(summons) = &definition.summons else {
                continue;
            };
            if !cards.contains_key(summons) {
                return Err(CatalogError::UnknownSummon {
                    card: definition.id.clone(),
                    summons: summons.clone(),
                });
            }
        }

        if let Some(unknown) = file.starter_deck.iter().find(|id| !cards.contains_key(*id)) {
            return Err(CatalogError::UnknownDeckCard(unknown.clone()));
        }

        Ok(Self {
            cards,
            starter_deck: file.starter_deck,
        })
    }

    pub fn get(&self, id: &CardId) -> Option<&CardDefinition> {
        self.cards.get(id)
    }

    /// Deck list used when a setup does not name one.
    pub fn starter_deck(&self) -> &[CardId] {
        &self.starter_deck
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_loads() {
        let catalog = CardCatalog::embedded().expect("embedded catalog");
        assert!(catalog.len() >= 5);

        let necromancer = catalog.get(&CardId::from("necromancer")).expect("card");
        assert_eq!(necromancer.summons, Some(CardId::from("skeleton")));

        let skeleton = catalog.get(&CardId::from("skeleton")).expect("token");
        assert!(skeleton.token);
        assert!(
            catalog
                .starter_deck()
                .iter()
                .all(|id| catalog.get(id).is_some_and(|card| !card.token))
        );
    }

    #[test]
    fn dangling_summons_is_an_error() {
        let source = r#"(cards: [(id: "a", name: "A", attack: 1, health: 1, summons: Some("ghost"))])"#;
        assert!(matches!(
            CardCatalog::from_ron_str(source),
            Err(CatalogError::UnknownSummon { .. })
        ));
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let source = r#"(cards: [
            (id: "a", name: "A", attack: 1, health: 1),
            (id: "a", name: "A2", attack: 2, health: 2),
        ])"#;
        assert!(matches!(
            CardCatalog::from_ron_str(source),
            Err(CatalogError::DuplicateCard(_))
        ));
    }
}
