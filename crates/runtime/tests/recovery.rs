//! Desync detection and snapshot recovery.

mod common;

use std::time::Duration;

use common::*;
use duel_content::DuelHost;
use duel_core::{
    ApplyOptions, Command, ExecutionError, ExecutionReport, GameState, SessionMetadata,
    SimulationHost, Slot, Snapshot, SnapshotError, fingerprint,
};
use duel_sync::{
    ActionBus, DesyncCause, EventBus, RecoveryEvent, ReplicationEvent, SyncConfig, SyncError,
    SyncEvent, SyncPhase, Topic, WireMessage,
};
use tokio::sync::broadcast::Receiver;
use tokio::time::{self, Instant};

fn recovery_events(rx: &mut Receiver<SyncEvent>) -> Vec<RecoveryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SyncEvent::Recovery(event) = event {
            events.push(event);
        }
    }
    events
}

fn recovery_requests(bus: &mut Bus) -> usize {
    bus.transport_mut()
        .drain()
        .iter()
        .filter(|message| matches!(message, WireMessage::RecoveryRequest(_)))
        .count()
}

#[test]
fn rejection_triggers_recovery_and_converges() {
    let setup = setup(5);
    let (mut authority, mut guest) = pair(&setup);
    let mut replication = guest.events().subscribe(Topic::Replication);
    let mut recovery = guest.events().subscribe(Topic::Recovery);

    // Not the guest's turn: applied optimistically, refused by the authority.
    guest.dispatch(Command::draw_card()).expect("optimistic draw");
    assert_ne!(fingerprint_of(&guest), fingerprint_of(&authority));

    pump(&mut guest, &mut authority);
    pump(&mut authority, &mut guest);

    match replication.try_recv().expect("rejection event") {
        SyncEvent::Replication(ReplicationEvent::CommandRejected { intent_id, reason }) => {
            assert_eq!(intent_id.counter, 1);
            assert!(reason.contains("not this sender's turn"), "{reason}");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(guest.sync_phase(), SyncPhase::Recovering);
    assert!(guest.pending_intents().is_empty());
    assert!(matches!(
        guest.dispatch(Command::emote("wait")),
        Err(SyncError::RecoveryInProgress)
    ));

    // Request out, snapshot back.
    settle(&mut authority, &mut guest);

    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
    assert_eq!(fingerprint_of(&guest), fingerprint_of(&authority));
    assert_eq!(guest.last_seq(), authority.last_seq());
    let events = recovery_events(&mut recovery);
    assert!(matches!(
        events.as_slice(),
        [
            RecoveryEvent::DesyncDetected {
                cause: DesyncCause::IntentRejected { .. },
                ..
            },
            RecoveryEvent::RecoveryCompleted {
                converged: true,
                ..
            },
        ]
    ), "{events:?}");
}

#[test]
fn fingerprint_mismatch_triggers_recovery() {
    let setup = setup(13);
    let (mut authority, mut guest) = pair(&setup);
    let mut recovery = guest.events().subscribe(Topic::Recovery);

    // Silent divergence the guest does not know about.
    guest.host_mut().state_mut().participant_mut(Slot::FIRST).life -= 3;

    authority.dispatch(Command::draw_card()).expect("draw");
    pump(&mut authority, &mut guest);

    assert_eq!(guest.sync_phase(), SyncPhase::Recovering);
    assert_eq!(guest.mismatch_count(), 1);
    assert_eq!(guest.last_seq(), 1);
    match recovery_events(&mut recovery).as_slice() {
        [RecoveryEvent::DesyncDetected {
            last_seq: 1,
            mismatch_count: 1,
            cause: DesyncCause::FingerprintMismatch { seq: 1, expected, actual },
        }] => {
            assert_eq!(*expected, fingerprint_of(&authority));
            assert_ne!(expected, actual);
        }
        other => panic!("unexpected events {other:?}"),
    }

    settle(&mut authority, &mut guest);
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
    assert_eq!(guest.mismatch_count(), 0);
    assert_eq!(
        guest.host().state().participant(Slot::FIRST).life,
        authority.host().state().participant(Slot::FIRST).life
    );
}

/// Host whose snapshot installs leave the guest's hero one life short.
struct DriftingHost {
    inner: DuelHost,
}

impl SimulationHost for DriftingHost {
    fn execute(&mut self, command: &Command) -> Result<ExecutionReport, ExecutionError> {
        self.inner.execute(command)
    }

    fn state(&self) -> &GameState {
        self.inner.state()
    }

    fn state_mut(&mut self) -> &mut GameState {
        self.inner.state_mut()
    }

    fn apply_snapshot(
        &mut self,
        snapshot: &Snapshot,
        options: ApplyOptions,
    ) -> Result<(), SnapshotError> {
        self.inner.apply_snapshot(snapshot, options)?;
        self.inner.state_mut().participant_mut(Slot::SECOND).life -= 1;
        Ok(())
    }
}

#[test]
fn divergence_after_snapshot_is_reported_but_not_retried() {
    let setup = setup(43);
    let mut authority = bus_for(&setup, HOST, SyncConfig::default());
    let mut guest = ActionBus::new(
        DriftingHost {
            inner: host_for(&setup, GUEST),
        },
        Outbox::default(),
        SessionMetadata::new(GUEST, HOST),
        SyncConfig::default(),
        EventBus::new(),
    );
    let mut recovery = guest.events().subscribe(Topic::Recovery);

    guest.request_recovery().expect("request");
    for message in guest.transport_mut().drain() {
        authority.handle_message(message).expect("request handled");
    }
    for message in authority.transport_mut().drain() {
        guest.handle_message(message).expect("snapshot installed");
    }

    let events = recovery_events(&mut recovery);
    assert!(matches!(
        events.as_slice(),
        [
            RecoveryEvent::DesyncDetected {
                cause: DesyncCause::Requested,
                ..
            },
            RecoveryEvent::RecoveryCompleted {
                authority_seq: 0,
                converged: false,
            },
        ]
    ), "{events:?}");
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
    assert_eq!(guest.next_deadline(), None);
    assert_ne!(fingerprint(guest.host().state()), fingerprint_of(&authority));
    assert!(
        !guest
            .transport_mut()
            .drain()
            .iter()
            .any(|message| matches!(message, WireMessage::RecoveryRequest(_)))
    );
}

#[test]
fn divergence_hidden_by_pending_intents_is_caught_once_they_resolve() {
    let setup = setup(47);
    let (mut authority, mut guest) = pair(&setup);
    let mut recovery = guest.events().subscribe(Topic::Recovery);

    guest.dispatch(Command::emote("thinking")).expect("dispatch");
    let submitted = guest.transport_mut().drain();
    guest.host_mut().state_mut().participant_mut(Slot::FIRST).life -= 2;

    // Confirmed while the emote is still outstanding: comparison waits.
    authority.dispatch(Command::draw_card()).expect("draw");
    pump(&mut authority, &mut guest);
    assert_eq!(guest.last_seq(), 1);
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
    assert_eq!(guest.mismatch_count(), 0);

    for message in submitted {
        authority.handle_message(message).expect("intent");
    }
    pump(&mut authority, &mut guest);
    assert!(guest.pending_intents().is_empty());
    assert_eq!(guest.sync_phase(), SyncPhase::Recovering);
    assert!(matches!(
        recovery_events(&mut recovery).as_slice(),
        [RecoveryEvent::DesyncDetected {
            mismatch_count: 1,
            cause: DesyncCause::FingerprintMismatch { seq: 2, .. },
            ..
        }]
    ));

    settle(&mut authority, &mut guest);
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
    assert_eq!(fingerprint_of(&guest), fingerprint_of(&authority));
}

#[test]
fn confirmations_received_during_recovery_are_applied_afterwards() {
    let setup = setup(17);
    let (mut authority, mut guest) = pair(&setup);

    guest.request_recovery().expect("request");
    assert_eq!(guest.sync_phase(), SyncPhase::Recovering);
    let request = guest.transport_mut().drain();

    // The authority answers, then keeps playing before the answer lands.
    for message in request {
        authority.handle_message(message).expect("request handled");
    }
    let response = authority.transport_mut().drain();
    authority.dispatch(Command::draw_card()).expect("draw");
    let confirmation = authority.transport_mut().drain();

    for message in confirmation {
        guest.handle_message(message).expect("buffered");
    }
    assert_eq!(guest.last_seq(), 0);

    for message in response {
        guest.handle_message(message).expect("snapshot installed");
    }
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
    assert_eq!(guest.last_seq(), 1);
    assert_eq!(fingerprint_of(&guest), fingerprint_of(&authority));
}

#[test]
fn confirmation_gap_overflow_triggers_recovery() {
    let setup = setup(19);
    let config = SyncConfig {
        max_buffered_confirmations: 2,
        ..SyncConfig::default()
    };
    let (mut authority, mut guest) = pair_with(&setup, config);
    let mut recovery = guest.events().subscribe(Topic::Recovery);

    for _ in 0..4 {
        authority.dispatch(Command::emote("spam")).expect("emote");
    }
    let mut sent = authority.transport_mut().drain();
    sent.remove(0); // seq 1 is lost

    for message in sent {
        guest.handle_message(message).expect("handled");
    }
    assert_eq!(guest.sync_phase(), SyncPhase::Recovering);
    assert!(matches!(
        recovery_events(&mut recovery).as_slice(),
        [RecoveryEvent::DesyncDetected {
            cause: DesyncCause::ConfirmationGap { last_seq: 0, buffered: 3 },
            ..
        }]
    ));

    settle(&mut authority, &mut guest);
    assert_eq!(guest.last_seq(), 4);
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
}

#[test]
fn stale_responses_are_ignored() {
    let setup = setup(23);
    let (mut authority, mut guest) = pair(&setup);

    guest.request_recovery().expect("request");
    settle(&mut authority, &mut guest);
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);

    // A second answer to the same request arrives late.
    authority
        .handle_message(
            duel_sync::RecoveryRequest {
                last_seq: 0,
                sender_id: GUEST.into(),
                resume_intent_counter: 1,
            }
            .into(),
        )
        .expect("request handled");
    authority.dispatch(Command::draw_card()).expect("draw");
    pump(&mut authority, &mut guest);

    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
    assert_eq!(guest.last_seq(), 1);
    assert_eq!(fingerprint_of(&guest), fingerprint_of(&authority));
}

#[tokio::test(start_paused = true)]
async fn intent_timeout_triggers_recovery() {
    let setup = setup(29);
    let (mut authority, mut guest) = pair(&setup);
    let mut recovery = guest.events().subscribe(Topic::Recovery);

    guest.dispatch(Command::emote("anyone there?")).expect("dispatch");
    // The submission is lost.
    guest.transport_mut().drain();

    let deadline = guest.next_deadline().expect("intent deadline");
    assert_eq!(deadline, Instant::now() + Duration::from_secs(15));

    time::advance(Duration::from_secs(14)).await;
    guest.tick(Instant::now());
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);

    time::advance(Duration::from_secs(1)).await;
    guest.tick(Instant::now());
    assert_eq!(guest.sync_phase(), SyncPhase::Recovering);
    assert!(guest.pending_intents().is_empty());
    assert!(matches!(
        recovery_events(&mut recovery).as_slice(),
        [RecoveryEvent::DesyncDetected {
            cause: DesyncCause::IntentTimeout { .. },
            ..
        }]
    ));

    settle(&mut authority, &mut guest);
    assert_eq!(guest.sync_phase(), SyncPhase::Normal);
    assert_eq!(fingerprint_of(&guest), fingerprint_of(&authority));

    // The abandoned counter is skipped; the next intent is admitted.
    guest.dispatch(Command::emote("back")).expect("dispatch");
    settle(&mut authority, &mut guest);
    assert_eq!(authority.last_seq(), 1);
    assert_eq!(guest.last_seq(), 1);
    assert!(guest.pending_intents().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unanswered_recovery_is_resent_then_stalls() {
    let setup = setup(31);
    let (_authority, mut guest) = pair(&setup);
    let mut recovery = guest.events().subscribe(Topic::Recovery);
    let timeout = SyncConfig::default().recovery_timeout;

    guest.request_recovery().expect("request");
    assert_eq!(recovery_requests(&mut guest), 1);

    for _ in 0..2 {
        time::advance(timeout).await;
        guest.tick(Instant::now());
        assert_eq!(recovery_requests(&mut guest), 1);
    }

    time::advance(timeout).await;
    guest.tick(Instant::now());
    assert_eq!(recovery_requests(&mut guest), 0);
    assert_eq!(guest.next_deadline(), None);

    let events = recovery_events(&mut recovery);
    assert!(matches!(
        events.last(),
        Some(RecoveryEvent::RecoveryStalled { attempts: 3, .. })
    ), "{events:?}");
    assert_eq!(guest.sync_phase(), SyncPhase::Recovering);

    // The application can start over.
    guest.request_recovery().expect("retry");
    assert_eq!(recovery_requests(&mut guest), 1);
    assert!(guest.next_deadline().is_some());
}

#[test]
fn recovery_on_the_authority_is_a_no_op() {
    let setup = setup(37);
    let (mut authority, _guest) = pair(&setup);

    authority.request_recovery().expect("request");
    assert_eq!(authority.sync_phase(), SyncPhase::Normal);
    assert_eq!(recovery_requests(&mut authority), 0);
}
