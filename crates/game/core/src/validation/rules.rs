//! Static legality rules per command kind.

use crate::command::{CommandKind, keys};
use crate::state::PhaseSet;

/// Gating rules applied to one command kind before any kind-specific check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandRule {
    /// Only the active seat may issue the command.
    pub turn_gated: bool,
    /// Phases in which the command may be issued.
    pub phases: PhaseSet,
    /// Payload key of an entity the sender claims is in their hand.
    pub hand_entity: Option<&'static str>,
}

impl CommandRule {
    const fn gated(phases: PhaseSet) -> Self {
        Self {
            turn_gated: true,
            phases,
            hand_entity: None,
        }
    }

    const fn open(phases: PhaseSet) -> Self {
        Self {
            turn_gated: false,
            phases,
            hand_entity: None,
        }
    }

    const fn from_hand(mut self, key: &'static str) -> Self {
        self.hand_entity = Some(key);
        self
    }
}

/// Returns the gating rule for `kind`.
pub const fn rule_for(kind: CommandKind) -> CommandRule {
    match kind {
        CommandKind::DrawCard => CommandRule::gated(PhaseSet::MAIN),
        CommandKind::PlayCard => CommandRule::gated(PhaseSet::MAIN).from_hand(keys::CARD),
        CommandKind::Attack => CommandRule::gated(PhaseSet::COMBAT),
        CommandKind::EndPhase => CommandRule::gated(PhaseSet::MAIN.union(PhaseSet::COMBAT)),
        CommandKind::EndTurn => CommandRule::gated(PhaseSet::IN_PLAY),
        CommandKind::Concede => CommandRule::open(PhaseSet::IN_PLAY),
        CommandKind::Emote => CommandRule::open(PhaseSet::IN_PLAY.union(PhaseSet::GAME_OVER)),
    }
}
