//! State fingerprinting for cheap divergence detection.
//!
//! The fingerprint is a 32-bit multiplicative hash over a canonical textual
//! encoding of the game-critical subset of [`GameState`]. Collision
//! resistance is not a goal; identical logical state on both peers must
//! always produce the same value, and any change to a fingerprinted field
//! should almost always change it.
//!
//! Fingerprinted fields:
//! - turn number, phase, active seat
//! - per seat (in seat order): hero life, deck size, and the `id:attack:health`
//!   of every entity in hand, board and discard, in zone order
//!
//! Deliberately excluded: entity labels, the RNG seed, the id allocator, and
//! peer identities.

use std::fmt::{self, Write as _};

use crate::state::{Entity, GameState, Slot, ZoneKind};

/// 32-bit digest of the game-critical state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fingerprint(pub u32);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Zones whose contents are encoded entity by entity.
const ENCODED_ZONES: [(ZoneKind, char); 3] = [
    (ZoneKind::Hand, 'H'),
    (ZoneKind::Board, 'B'),
    (ZoneKind::Discard, 'D'),
];

/// Computes the fingerprint of `state`.
pub fn fingerprint(state: &GameState) -> Fingerprint {
    Fingerprint(hash_str(&canonical_encoding(state)))
}

/// Canonical, order-sensitive encoding the fingerprint is computed over.
///
/// Exposed for desync diagnostics: two peers can log and diff it.
pub fn canonical_encoding(state: &GameState) -> String {
    let mut out = String::with_capacity(256);
    // Writing into a String never fails.
    let _ = write!(
        out,
        "t{}|p{}|a{}",
        state.turn.number,
        state.turn.phase.as_ref(),
        state.turn.active.0
    );

    for slot in Slot::ALL {
        let participant = state.participant(slot);
        let _ = write!(
            out,
            "|P{}:l{}:d{}",
            slot.0,
            participant.life,
            participant.zones.deck.len()
        );
        for (zone, tag) in ENCODED_ZONES {
            out.push(':');
            out.push(tag);
            out.push('[');
            encode_zone(&mut out, participant.zones.zone(zone));
            out.push(']');
        }
    }
    out
}

fn encode_zone(out: &mut String, entities: &[Entity]) {
    for (index, entity) in entities.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}:{}:{}", entity.id.0, entity.attack, entity.health);
    }
}

/// Accumulate-and-multiply string hash (`h = h * 31 + byte`, wrapping).
fn hash_str(input: &str) -> u32 {
    input
        .bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(31).wrapping_add(u32::from(byte)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CardId, EntityId, ParticipantState, PeerId, Phase};

    fn base_state() -> GameState {
        let mut state = GameState::new(
            42,
            ParticipantState::new(PeerId::from("host"), 20),
            ParticipantState::new(PeerId::from("guest"), 20),
        );
        for (slot, id) in [(Slot::FIRST, 1), (Slot::FIRST, 2), (Slot::SECOND, 3)] {
            state
                .participant_mut(slot)
                .zones
                .board
                .push(Entity::new(EntityId(id), CardId::from("imp"), 1, 2));
        }
        state
    }

    #[test]
    fn identical_states_share_fingerprint() {
        assert_eq!(fingerprint(&base_state()), fingerprint(&base_state()));
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(hash_str(""), 0);
        assert_eq!(hash_str("a"), 97);
        assert_eq!(hash_str("ab"), 97 * 31 + 98);
    }

    #[test]
    fn encoding_is_order_sensitive() {
        let mut swapped = base_state();
        swapped.participant_mut(Slot::FIRST).zones.board.swap(0, 1);
        assert_ne!(fingerprint(&base_state()), fingerprint(&swapped));
    }

    #[test]
    fn game_critical_fields_change_fingerprint() {
        let base = fingerprint(&base_state());

        let mut damaged = base_state();
        damaged.participant_mut(Slot::SECOND).zones.board[0].health -= 1;
        assert_ne!(base, fingerprint(&damaged));

        let mut phased = base_state();
        phased.turn.phase = Phase::Combat;
        assert_ne!(base, fingerprint(&phased));

        let mut hurt = base_state();
        hurt.participant_mut(Slot::FIRST).life = 19;
        assert_ne!(base, fingerprint(&hurt));
    }

    #[test]
    fn presentation_fields_are_ignored() {
        let mut labelled = base_state();
        labelled.participant_mut(Slot::FIRST).zones.board[0].label = Some("shiny".into());
        labelled.seed = 1234;
        assert_eq!(fingerprint(&base_state()), fingerprint(&labelled));
    }

    #[test]
    fn canonical_encoding_layout() {
        let encoding = canonical_encoding(&base_state());
        assert_eq!(
            encoding,
            "t1|pmain|a0|P0:l20:d0:H[]:B[1:1:2,2:1:2]:D[]|P1:l20:d0:H[]:B[3:1:2]:D[]"
        );
    }
}
