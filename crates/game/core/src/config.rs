/// Duel rules constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DuelConfig {
    /// Hero life each seat starts with.
    pub starting_life: i32,
    /// Cards drawn by each seat before the first turn.
    pub opening_hand: usize,
}

impl DuelConfig {
    // ===== compile-time limits =====
    pub const MAX_HAND_SIZE: usize = 10;
    pub const MAX_BOARD_SIZE: usize = 7;
    /// Longest emote text the validator accepts, in characters.
    pub const MAX_EMOTE_LEN: usize = 64;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_STARTING_LIFE: i32 = 20;
    pub const DEFAULT_OPENING_HAND: usize = 3;

    pub fn new() -> Self {
        Self {
            starting_life: Self::DEFAULT_STARTING_LIFE,
            opening_hand: Self::DEFAULT_OPENING_HAND,
        }
    }
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self::new()
    }
}
