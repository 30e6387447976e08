//! Subordinate-side table of submitted but unresolved intents.

use std::collections::BTreeMap;

use duel_core::{Command, EntityId, EntitySlot};
use tokio::time::Instant;

use crate::wire::IntentId;

/// A command executed optimistically and awaiting the authority's verdict.
#[derive(Clone, Debug)]
pub struct PendingIntent {
    pub intent_id: IntentId,
    pub command: Command,
    /// Always true: intents are applied locally before submission.
    pub optimistic: bool,
    /// Ids the local execution allocated, in creation order.
    pub locally_created: Vec<EntityId>,
    pub submitted_at: Instant,
    pub deadline: Instant,
}

impl PendingIntent {
    fn rename_entity(&mut self, from: EntityId, to: EntityId) {
        for id in &mut self.locally_created {
            if *id == from {
                *id = to;
            }
        }
        self.command.for_each_slot_mut(|slot| {
            if let EntitySlot::Live(entity) = slot {
                if entity.id == from {
                    entity.id = to;
                }
            }
        });
    }
}

/// Pending intents keyed by id. Each intent resolves exactly once: removal is
/// the resolution, and its deadline goes with it.
#[derive(Debug, Default)]
pub struct PendingIntents {
    intents: BTreeMap<IntentId, PendingIntent>,
}

impl PendingIntents {
    pub fn insert(&mut self, intent: PendingIntent) {
        self.intents.insert(intent.intent_id.clone(), intent);
    }

    pub fn remove(&mut self, intent_id: &IntentId) -> Option<PendingIntent> {
        self.intents.remove(intent_id)
    }

    pub fn contains(&self, intent_id: &IntentId) -> bool {
        self.intents.contains_key(intent_id)
    }

    /// Removes and returns every intent whose deadline is at or before `now`.
    pub fn drain_expired(&mut self, now: Instant) -> Vec<PendingIntent> {
        let expired: Vec<IntentId> = self
            .intents
            .values()
            .filter(|intent| intent.deadline <= now)
            .map(|intent| intent.intent_id.clone())
            .collect();
        expired
            .iter()
            .filter_map(|intent_id| self.intents.remove(intent_id))
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.intents.values().map(|intent| intent.deadline).min()
    }

    /// Patches every reference to `from` held by pending intents.
    pub fn rename_entity(&mut self, from: EntityId, to: EntityId) {
        for intent in self.intents.values_mut() {
            intent.rename_entity(from, to);
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &IntentId> {
        self.intents.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingIntent> {
        self.intents.values()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Abandons every intent.
    pub fn clear(&mut self) {
        self.intents.clear();
    }
}
