use bitflags::bitflags;

use super::Slot;

/// Phase within a turn.
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
pub enum Phase {
    /// Cards are drawn and played.
    #[default]
    Main,
    /// Board entities attack.
    Combat,
    /// Wrap-up; only ending the turn advances play.
    End,
    /// A winner has been decided.
    GameOver,
}

impl Phase {
    /// Returns the single-bit set for this phase.
    pub const fn as_set(self) -> PhaseSet {
        match self {
            Phase::Main => PhaseSet::MAIN,
            Phase::Combat => PhaseSet::COMBAT,
            Phase::End => PhaseSet::END,
            Phase::GameOver => PhaseSet::GAME_OVER,
        }
    }

    /// Next phase reached by ending the current one, if any.
    pub const fn next(self) -> Option<Phase> {
        match self {
            Phase::Main => Some(Phase::Combat),
            Phase::Combat => Some(Phase::End),
            Phase::End | Phase::GameOver => None,
        }
    }
}

bitflags! {
    /// Set of phases in which a command kind may be issued.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PhaseSet: u8 {
        const MAIN      = 1 << 0;
        const COMBAT    = 1 << 1;
        const END       = 1 << 2;
        const GAME_OVER = 1 << 3;

        /// Every phase of a running game.
        const IN_PLAY   = Self::MAIN.bits() | Self::COMBAT.bits() | Self::END.bits();
    }
}

impl PhaseSet {
    pub fn allows(self, phase: Phase) -> bool {
        self.contains(phase.as_set())
    }
}

/// Turn bookkeeping shared by both seats.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnState {
    /// Turn counter, starting at 1.
    pub number: u32,
    pub phase: Phase,
    /// Seat whose turn it is.
    pub active: Slot,
}

impl TurnState {
    pub fn new() -> Self {
        Self {
            number: 1,
            phase: Phase::Main,
            active: Slot::FIRST,
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}
