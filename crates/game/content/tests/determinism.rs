//! Property tests for replica determinism.
//!
//! Two replicas built from the same setup apply the same command stream, the
//! second one receiving every command through the wire codec. Their
//! fingerprints must agree after every step, whether the command succeeded or
//! failed.

use std::sync::Arc;

use duel_content::{CardCatalog, DuelHost, DuelSetup};
use duel_core::{
    AttackTarget, Command, GameState, Phase, SimulationHost, Slot, decode, encode, fingerprint,
};
use proptest::prelude::*;

/// Commands worth trying from `state`, legal or not.
fn candidates(state: &GameState) -> Vec<Command> {
    let active = state.turn.active;
    let own = &state.participant(active).zones;
    let theirs = &state.participant(active.opponent()).zones;

    let mut commands = vec![
        Command::draw_card(),
        Command::end_phase(),
        Command::end_turn(),
        Command::emote("hi"),
    ];
    commands.extend(own.hand.iter().cloned().map(Command::play_card));
    for attacker in &own.board {
        commands.push(Command::attack(attacker.clone(), AttackTarget::Hero));
        for defender in &theirs.board {
            commands.push(Command::attack(
                attacker.clone(),
                AttackTarget::Entity(defender.clone()),
            ));
        }
    }
    commands
}

fn replicas(seed: u64) -> (DuelHost, DuelHost) {
    let catalog = Arc::new(CardCatalog::embedded().unwrap_or_else(|e| panic!("catalog: {e}")));
    let setup = DuelSetup::new(seed, "host", "guest");
    let build = || {
        DuelHost::from_setup(Arc::clone(&catalog), &setup)
            .unwrap_or_else(|e| panic!("setup failed: {e}"))
    };
    (build(), build())
}

proptest! {
    #[test]
    fn replicas_agree_after_every_command(
        seed in any::<u64>(),
        picks in proptest::collection::vec(any::<u16>(), 1..120),
    ) {
        let (mut left, mut right) = replicas(seed);
        prop_assert_eq!(fingerprint(left.state()), fingerprint(right.state()));

        for pick in picks {
            let options = candidates(left.state());
            let command = &options[usize::from(pick) % options.len()];

            let wire = encode(command, left.state());
            let received = decode(&wire, right.state());

            let local = left.execute(command);
            let remote = right.execute(&received);

            prop_assert_eq!(&local, &remote);
            prop_assert_eq!(fingerprint(left.state()), fingerprint(right.state()));
            if left.state().turn.phase == Phase::GameOver {
                break;
            }
        }
    }

    #[test]
    fn concession_is_deterministic(seed in any::<u64>(), loser in 0u8..2) {
        let (mut left, mut right) = replicas(seed);
        let command = Command::concede(Slot(loser));

        let received = decode(&encode(&command, left.state()), right.state());
        prop_assert!(left.execute(&command).is_ok());
        prop_assert!(right.execute(&received).is_ok());
        prop_assert_eq!(left.state().winner, Some(Slot(loser).opponent()));
        prop_assert_eq!(fingerprint(left.state()), fingerprint(right.state()));
    }
}
