//! Authority-side per-sender ordering of submitted intents.
//!
//! Intents carry a per-sender counter starting at 1. The gate releases them
//! strictly in counter order regardless of arrival order: early arrivals wait
//! in a bounded buffer until the gap before them fills, late duplicates are
//! dropped.

use std::collections::BTreeMap;

use crate::wire::SubmitIntent;

/// Result of offering an intent to the gate.
#[derive(Debug)]
pub enum GateOutcome {
    /// The offered intent was next in line. Contains it followed by every
    /// buffered intent that became contiguous, in counter order.
    Admitted(Vec<SubmitIntent>),
    /// Arrived early; held until its predecessors are admitted.
    Buffered,
    /// Counter already admitted or already buffered.
    Stale,
    /// Arrived early but the buffer is full; the intent was dropped.
    Overflow,
}

#[derive(Debug)]
pub struct IntentOrderingGate {
    next_expected: u64,
    buffered: BTreeMap<u64, SubmitIntent>,
    capacity: usize,
}

impl IntentOrderingGate {
    pub const FIRST_COUNTER: u64 = 1;

    pub fn new(capacity: usize) -> Self {
        Self {
            next_expected: Self::FIRST_COUNTER,
            buffered: BTreeMap::new(),
            capacity,
        }
    }

    pub fn offer(&mut self, intent: SubmitIntent) -> GateOutcome {
        let counter = intent.intent_id.counter;

        if counter < self.next_expected {
            return GateOutcome::Stale;
        }

        if counter > self.next_expected {
            if self.buffered.contains_key(&counter) {
                return GateOutcome::Stale;
            }
            if self.buffered.len() >= self.capacity {
                return GateOutcome::Overflow;
            }
            self.buffered.insert(counter, intent);
            return GateOutcome::Buffered;
        }

        let mut admitted = vec![intent];
        self.next_expected += 1;
        while let Some(next) = self.buffered.remove(&self.next_expected) {
            admitted.push(next);
            self.next_expected += 1;
        }
        GateOutcome::Admitted(admitted)
    }

    /// Skips ahead to `resume`, dropping buffered intents below it.
    ///
    /// The gate never moves backwards: a `resume` at or below the next
    /// expected counter (a late or repeated request) leaves the sequence
    /// where it is. Returns the number of intents dropped.
    pub fn reset(&mut self, resume: u64) -> usize {
        self.next_expected = self.next_expected.max(resume);
        let next_expected = self.next_expected;
        let before = self.buffered.len();
        self.buffered.retain(|counter, _| *counter >= next_expected);
        before - self.buffered.len()
    }

    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    pub fn buffered(&self) -> usize {
        self.buffered.len()
    }
}
