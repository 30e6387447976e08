//! Legality checks for untrusted commands.
//!
//! Run only by the authority, against its own state, before executing a
//! command submitted by the other peer. The checks are pure and ordered:
//!
//! 1. Sender identity maps to a seat (fail closed otherwise)
//! 2. A finished game only accepts emotes
//! 3. Turn ownership for turn-gated kinds
//! 4. Phase gating per kind
//! 5. Entities claimed to be in the sender's hand really are there
//! 6. Kind-specific checks (attacker on the sender's board, target validity)
//!
//! The [`Rejection`] display text is relayed to the rejected sender for
//! display. Nothing downstream branches on it.

mod rules;

pub use rules::{CommandRule, rule_for};

use crate::command::{AttackTarget, Command, CommandKind, EntitySlot, keys};
use crate::config::DuelConfig;
use crate::state::{EntityId, GameState, Phase, PeerId, Slot, ZoneKind};

/// Reason a command was refused by the validator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("sender {sender} is not seated in this game")]
    UnknownSender { sender: PeerId },

    #[error("the game is over; only emotes are accepted")]
    GameOver,

    #[error("not this sender's turn (active participant is {active})")]
    NotYourTurn { sender: Slot, active: Slot },

    #[error("{kind} is not allowed during the {phase} phase")]
    PhaseNotAllowed { kind: CommandKind, phase: Phase },

    #[error("payload field '{key}' is missing")]
    MissingField { key: &'static str },

    #[error("payload field '{key}' references entity {entity} which does not exist")]
    MissingEntity { key: &'static str, entity: EntityId },

    #[error("entity {entity} is not in the sender's hand")]
    NotInHand { entity: EntityId },

    #[error("attacker {entity} is not on the sender's board")]
    AttackerNotOnBoard { entity: EntityId },

    #[error("attack target is not on the opposing board")]
    InvalidTarget,

    #[error("sender in {sender} cannot concede for {claimed}")]
    SeatMismatch { sender: Slot, claimed: Slot },

    #[error("emote text exceeds {max} characters")]
    EmoteTooLong { max: usize },
}

impl Rejection {
    /// Returns a static string identifier for this rejection.
    pub const fn code(&self) -> &'static str {
        match self {
            Rejection::UnknownSender { .. } => "unknown_sender",
            Rejection::GameOver => "game_over",
            Rejection::NotYourTurn { .. } => "not_your_turn",
            Rejection::PhaseNotAllowed { .. } => "phase_not_allowed",
            Rejection::MissingField { .. } => "missing_field",
            Rejection::MissingEntity { .. } => "missing_entity",
            Rejection::NotInHand { .. } => "not_in_hand",
            Rejection::AttackerNotOnBoard { .. } => "attacker_not_on_board",
            Rejection::InvalidTarget => "invalid_target",
            Rejection::SeatMismatch { .. } => "seat_mismatch",
            Rejection::EmoteTooLong { .. } => "emote_too_long",
        }
    }
}

/// Decides whether `sender` may issue `command` against `state`.
pub fn validate(command: &Command, sender: &PeerId, state: &GameState) -> Result<(), Rejection> {
    // 1. Identity → seat
    let slot = state
        .slot_of(sender)
        .ok_or_else(|| Rejection::UnknownSender {
            sender: sender.clone(),
        })?;

    // 2. Finished game
    if state.is_over() && command.kind != CommandKind::Emote {
        return Err(Rejection::GameOver);
    }

    let rule = rule_for(command.kind);

    // 3. Turn ownership
    if rule.turn_gated && slot != state.turn.active {
        return Err(Rejection::NotYourTurn {
            sender: slot,
            active: state.turn.active,
        });
    }

    // 4. Phase gating
    if !rule.phases.allows(state.turn.phase) {
        return Err(Rejection::PhaseNotAllowed {
            kind: command.kind,
            phase: state.turn.phase,
        });
    }

    // 5. Private-zone claims
    if let Some(key) = rule.hand_entity {
        let entity = required_entity(command, key)?;
        if !state.participant(slot).zones.contains(ZoneKind::Hand, entity) {
            return Err(Rejection::NotInHand { entity });
        }
    }

    // 6. Kind-specific checks
    match command.kind {
        CommandKind::Attack => validate_attack(command, slot, state),
        CommandKind::Concede => validate_concede(command, slot),
        CommandKind::Emote => validate_emote(command),
        CommandKind::DrawCard
        | CommandKind::PlayCard
        | CommandKind::EndPhase
        | CommandKind::EndTurn => Ok(()),
    }
}

/// Returns the id of the live entity stored under `key`.
fn required_entity(command: &Command, key: &'static str) -> Result<EntityId, Rejection> {
    match command.entity(key) {
        Some(EntitySlot::Live(entity)) => Ok(entity.id),
        Some(EntitySlot::Missing(reference)) => Err(Rejection::MissingEntity {
            key,
            entity: reference.entity_id,
        }),
        None => Err(Rejection::MissingField { key }),
    }
}

fn validate_attack(command: &Command, slot: Slot, state: &GameState) -> Result<(), Rejection> {
    let attacker = required_entity(command, keys::ATTACKER)?;
    if !state.participant(slot).zones.contains(ZoneKind::Board, attacker) {
        return Err(Rejection::AttackerNotOnBoard { entity: attacker });
    }

    match command.attack_target() {
        Some(AttackTarget::Hero) => Ok(()),
        Some(AttackTarget::Entity(target))
            if state
                .participant(slot.opponent())
                .zones
                .contains(ZoneKind::Board, target.id) =>
        {
            Ok(())
        }
        _ => Err(Rejection::InvalidTarget),
    }
}

fn validate_concede(command: &Command, slot: Slot) -> Result<(), Rejection> {
    let claimed = command
        .seat()
        .ok_or(Rejection::MissingField { key: keys::SEAT })?;
    if claimed != slot {
        return Err(Rejection::SeatMismatch {
            sender: slot,
            claimed,
        });
    }
    Ok(())
}

fn validate_emote(command: &Command) -> Result<(), Rejection> {
    let text = command
        .text(keys::TEXT)
        .ok_or(Rejection::MissingField { key: keys::TEXT })?;
    if text.chars().count() > DuelConfig::MAX_EMOTE_LEN {
        return Err(Rejection::EmoteTooLong {
            max: DuelConfig::MAX_EMOTE_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CardId, Entity, ParticipantState};

    fn host() -> PeerId {
        PeerId::from("host")
    }

    fn guest() -> PeerId {
        PeerId::from("guest")
    }

    fn entity(id: u32) -> Entity {
        Entity::new(EntityId(id), CardId::from("imp"), 2, 2)
    }

    /// Host (slot 0) holds #1 in hand and #2 on board; guest has #3 on board.
    fn state() -> GameState {
        let mut state = GameState::new(
            3,
            ParticipantState::new(host(), 20),
            ParticipantState::new(guest(), 20),
        );
        state.participant_mut(Slot::FIRST).zones.hand.push(entity(1));
        state.participant_mut(Slot::FIRST).zones.board.push(entity(2));
        state.participant_mut(Slot::SECOND).zones.board.push(entity(3));
        state.reserve_entity_ids_through(EntityId(3));
        state
    }

    #[test]
    fn unknown_sender_fails_closed() {
        let err = validate(&Command::end_turn(), &PeerId::from("mallory"), &state()).unwrap_err();
        assert_eq!(err.code(), "unknown_sender");
    }

    #[test]
    fn turn_gated_command_from_inactive_seat_is_rejected() {
        let err = validate(&Command::end_turn(), &guest(), &state()).unwrap_err();
        assert!(matches!(err, Rejection::NotYourTurn { .. }));
        assert!(err.to_string().contains("not this sender's turn"));
    }

    #[test]
    fn active_seat_in_wrong_phase_is_rejected() {
        // Attacking is combat-only; the game starts in the main phase.
        let command = Command::attack(entity(2), AttackTarget::Hero);
        let err = validate(&command, &host(), &state()).unwrap_err();
        assert!(matches!(
            err,
            Rejection::PhaseNotAllowed {
                kind: CommandKind::Attack,
                phase: Phase::Main
            }
        ));
        assert!(err.to_string().contains("main phase"));
    }

    #[test]
    fn open_commands_skip_turn_gate() {
        assert!(validate(&Command::emote("gg"), &guest(), &state()).is_ok());
        assert!(validate(&Command::concede(Slot::SECOND), &guest(), &state()).is_ok());
    }

    #[test]
    fn played_card_must_be_in_senders_hand() {
        assert!(validate(&Command::play_card(entity(1)), &host(), &state()).is_ok());

        let err = validate(&Command::play_card(entity(2)), &host(), &state()).unwrap_err();
        assert_eq!(err, Rejection::NotInHand { entity: EntityId(2) });
    }

    #[test]
    fn missing_entity_is_rejected_not_panicked() {
        let mut command = Command::play_card(entity(1));
        command.for_each_slot_mut(|slot| {
            let reference = slot.live().map(|entity| crate::EntityRef::to(entity, None));
            if let Some(reference) = reference {
                *slot = EntitySlot::Missing(reference);
            }
        });
        let err = validate(&command, &host(), &state()).unwrap_err();
        assert_eq!(err.code(), "missing_entity");
    }

    #[test]
    fn attack_checks_board_positions() {
        let mut combat = state();
        combat.turn.phase = Phase::Combat;

        let valid = Command::attack(entity(2), AttackTarget::Entity(entity(3)));
        assert!(validate(&valid, &host(), &combat).is_ok());

        let from_hand = Command::attack(entity(1), AttackTarget::Hero);
        assert_eq!(
            validate(&from_hand, &host(), &combat).unwrap_err(),
            Rejection::AttackerNotOnBoard { entity: EntityId(1) }
        );

        let own_target = Command::attack(entity(2), AttackTarget::Entity(entity(2)));
        assert_eq!(
            validate(&own_target, &host(), &combat).unwrap_err(),
            Rejection::InvalidTarget
        );
    }

    #[test]
    fn game_over_only_accepts_emotes() {
        let mut over = state();
        over.turn.phase = Phase::GameOver;
        assert!(validate(&Command::emote("wp"), &guest(), &over).is_ok());
        assert_eq!(
            validate(&Command::concede(Slot::SECOND), &guest(), &over).unwrap_err(),
            Rejection::GameOver
        );

        let mut decided = state();
        decided.winner = Some(Slot::SECOND);
        assert_eq!(
            validate(&Command::end_turn(), &host(), &decided).unwrap_err(),
            Rejection::GameOver
        );
    }

    #[test]
    fn game_over_is_reported_before_turn_ownership() {
        let mut over = state();
        over.winner = Some(Slot::FIRST);
        assert_ne!(over.turn.active, Slot::SECOND);
        assert_eq!(
            validate(&Command::end_turn(), &guest(), &over).unwrap_err(),
            Rejection::GameOver
        );
    }

    #[test]
    fn concession_must_name_the_senders_seat() {
        assert_eq!(
            validate(&Command::concede(Slot::FIRST), &guest(), &state()).unwrap_err(),
            Rejection::SeatMismatch {
                sender: Slot::SECOND,
                claimed: Slot::FIRST
            }
        );
    }

    #[test]
    fn long_emotes_are_rejected() {
        let text = "x".repeat(DuelConfig::MAX_EMOTE_LEN + 1);
        assert!(matches!(
            validate(&Command::emote(text), &host(), &state()).unwrap_err(),
            Rejection::EmoteTooLong { .. }
        ));
    }
}
