//! Reference duel rules.
//!
//! Every handler checks its preconditions before touching the state, so a
//! failed command leaves the replica exactly as it was. Commands act on
//! behalf of the active seat, except concessions, which name their seat.

use duel_core::{
    AttackTarget, Command, CommandKind, DuelConfig, EntityId, EntitySlot, ExecutionError,
    ExecutionReport, GameState, Location, Phase, Slot, ZoneKind, keys,
};

use crate::catalog::CardCatalog;

/// Applies `command` to `state`.
pub fn apply(
    state: &mut GameState,
    catalog: &CardCatalog,
    command: &Command,
) -> Result<ExecutionReport, ExecutionError> {
    if state.is_over() && command.kind != CommandKind::Emote {
        return Err(ExecutionError::GameOver);
    }

    match command.kind {
        CommandKind::DrawCard => draw_card(state),
        CommandKind::PlayCard => play_card(state, catalog, command),
        CommandKind::Attack => attack(state, command),
        CommandKind::EndPhase => end_phase(state),
        CommandKind::EndTurn => end_turn(state),
        CommandKind::Concede => concede(state, command),
        CommandKind::Emote => Ok(ExecutionReport::default()),
    }
}

/// Id of the entity stored under `key`.
fn entity_arg(command: &Command, key: &'static str) -> Result<EntityId, ExecutionError> {
    match command.entity(key) {
        Some(EntitySlot::Live(entity)) => Ok(entity.id),
        Some(EntitySlot::Missing(reference)) => Err(ExecutionError::EntityNotFound {
            entity: reference.entity_id,
        }),
        None => Err(ExecutionError::InvalidPayload {
            key: key.to_owned(),
        }),
    }
}

fn draw_card(state: &mut GameState) -> Result<ExecutionReport, ExecutionError> {
    let active = state.turn.active;
    let zones = &mut state.participant_mut(active).zones;

    if zones.deck.is_empty() {
        return Err(ExecutionError::DeckEmpty);
    }
    if zones.hand.len() >= DuelConfig::MAX_HAND_SIZE {
        return Err(ExecutionError::ZoneFull {
            zone: ZoneKind::Hand,
        });
    }

    let card = zones.deck.remove(0);
    zones.hand.push(card);
    Ok(ExecutionReport::default())
}

fn play_card(
    state: &mut GameState,
    catalog: &CardCatalog,
    command: &Command,
) -> Result<ExecutionReport, ExecutionError> {
    let active = state.turn.active;
    let id = entity_arg(command, keys::CARD)?;
    let not_in_hand = ExecutionError::NotInZone {
        entity: id,
        zone: ZoneKind::Hand,
    };

    let card = state
        .entity_at(Location::new(active, ZoneKind::Hand), id)
        .ok_or_else(|| not_in_hand.clone())?;
    let definition = catalog
        .get(&card.card)
        .ok_or_else(|| ExecutionError::UnknownCard {
            card: card.card.clone(),
        })?;
    let token = match &definition.summons {
        Some(summons) => Some(catalog.get(summons).ok_or_else(|| {
            ExecutionError::UnknownCard {
                card: summons.clone(),
            }
        })?),
        None => None,
    };

    let needed = 1 + usize::from(token.is_some());
    if state.participant(active).zones.board.len() + needed > DuelConfig::MAX_BOARD_SIZE {
        return Err(ExecutionError::ZoneFull {
            zone: ZoneKind::Board,
        });
    }

    {
        let zones = &mut state.participant_mut(active).zones;
        let card = zones.take(ZoneKind::Hand, id).ok_or(not_in_hand)?;
        zones.board.push(card);
    }

    let mut created = Vec::new();
    if let Some(token) = token {
        let token_id = state.allocate_entity_id();
        state
            .participant_mut(active)
            .zones
            .board
            .push(token.instantiate(token_id));
        created.push(token_id);
    }
    Ok(ExecutionReport::with_created(created))
}

fn attack(state: &mut GameState, command: &Command) -> Result<ExecutionReport, ExecutionError> {
    let active = state.turn.active;
    let opponent = active.opponent();

    let attacker_id = entity_arg(command, keys::ATTACKER)?;
    let power = state
        .entity_at(Location::new(active, ZoneKind::Board), attacker_id)
        .map(|attacker| attacker.attack)
        .ok_or(ExecutionError::NotInZone {
            entity: attacker_id,
            zone: ZoneKind::Board,
        })?;

    match command.attack_target() {
        Some(AttackTarget::Hero) => {
            let hero = state.participant_mut(opponent);
            hero.life -= power;
            if hero.life <= 0 {
                state.winner = Some(active);
                state.turn.phase = Phase::GameOver;
            }
        }
        Some(AttackTarget::Entity(target)) => {
            let retaliation = state
                .entity_at(Location::new(opponent, ZoneKind::Board), target.id)
                .map(|defender| defender.attack)
                .ok_or(ExecutionError::NotInZone {
                    entity: target.id,
                    zone: ZoneKind::Board,
                })?;
            damage(state, opponent, target.id, power);
            damage(state, active, attacker_id, retaliation);
        }
        None => {
            return Err(match command.entity(keys::TARGET) {
                Some(slot) => ExecutionError::EntityNotFound {
                    entity: slot.entity_id(),
                },
                None => ExecutionError::InvalidPayload {
                    key: keys::TARGET.to_owned(),
                },
            });
        }
    }
    Ok(ExecutionReport::default())
}

/// Damages a board entity, moving it to the discard pile when it dies.
fn damage(state: &mut GameState, owner: Slot, id: EntityId, amount: i32) {
    let zones = &mut state.participant_mut(owner).zones;
    let Some(entity) = zones.board.iter_mut().find(|entity| entity.id == id) else {
        return;
    };
    entity.health -= amount;
    if entity.is_alive() {
        return;
    }
    if let Some(dead) = zones.take(ZoneKind::Board, id) {
        zones.discard.push(dead);
    }
}

fn end_phase(state: &mut GameState) -> Result<ExecutionReport, ExecutionError> {
    let phase = state.turn.phase;
    state.turn.phase = phase.next().ok_or(ExecutionError::PhaseCannotAdvance {
        phase,
        kind: CommandKind::EndPhase,
    })?;
    Ok(ExecutionReport::default())
}

fn end_turn(state: &mut GameState) -> Result<ExecutionReport, ExecutionError> {
    let next = state.turn.active.opponent();
    state.turn.active = next;
    state.turn.number = state.turn.number.saturating_add(1);
    state.turn.phase = Phase::Main;

    // Turn draw is skipped silently when the deck is empty or the hand full.
    let zones = &mut state.participant_mut(next).zones;
    if !zones.deck.is_empty() && zones.hand.len() < DuelConfig::MAX_HAND_SIZE {
        let card = zones.deck.remove(0);
        zones.hand.push(card);
    }
    Ok(ExecutionReport::default())
}

fn concede(state: &mut GameState, command: &Command) -> Result<ExecutionReport, ExecutionError> {
    let seat = command.seat().ok_or_else(|| ExecutionError::InvalidPayload {
        key: keys::SEAT.to_owned(),
    })?;
    state.winner = Some(seat.opponent());
    state.turn.phase = Phase::GameOver;
    Ok(ExecutionReport::default())
}
