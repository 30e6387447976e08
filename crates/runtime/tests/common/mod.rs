//! Shared fixtures: two buses wired through in-memory outboxes.
#![allow(dead_code)]

use std::sync::Arc;

use duel_content::{CardCatalog, DuelHost, DuelSetup};
use duel_core::{CardId, Fingerprint, SessionMetadata, SimulationHost, fingerprint};
use duel_sync::{ActionBus, EventBus, SyncConfig, Transport, WireMessage};

pub const HOST: &str = "host";
pub const GUEST: &str = "guest";

/// Transport that keeps everything it is asked to send.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<WireMessage>,
}

impl Outbox {
    pub fn drain(&mut self) -> Vec<WireMessage> {
        std::mem::take(&mut self.messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

impl Transport for Outbox {
    fn broadcast(&mut self, message: WireMessage) {
        self.messages.push(message);
    }
}

pub type Bus = ActionBus<DuelHost, Outbox>;

pub fn setup(seed: u64) -> DuelSetup {
    DuelSetup::new(seed, HOST, GUEST)
}

pub fn setup_with_deck(seed: u64, card: &str) -> DuelSetup {
    setup(seed).with_deck(vec![CardId::from(card); 12])
}

pub fn host_for(setup: &DuelSetup, local: &str) -> DuelHost {
    let catalog = Arc::new(CardCatalog::embedded().expect("embedded catalog"));
    DuelHost::from_setup(catalog, setup)
        .expect("setup builds")
        .for_peer(local)
}

pub fn bus_for(setup: &DuelSetup, local: &str, config: SyncConfig) -> Bus {
    ActionBus::new(
        host_for(setup, local),
        Outbox::default(),
        SessionMetadata::new(local, HOST),
        config,
        EventBus::new(),
    )
}

/// Authority and subordinate replicas of the same duel.
pub fn pair(setup: &DuelSetup) -> (Bus, Bus) {
    pair_with(setup, SyncConfig::default())
}

pub fn pair_with(setup: &DuelSetup, config: SyncConfig) -> (Bus, Bus) {
    (
        bus_for(setup, HOST, config.clone()),
        bus_for(setup, GUEST, config),
    )
}

/// Delivers everything `from` has sent to `to`. Returns the message count.
pub fn pump(from: &mut Bus, to: &mut Bus) -> usize {
    let messages = from.transport_mut().drain();
    let count = messages.len();
    for message in messages {
        to.handle_message(message).expect("message handled");
    }
    count
}

/// Pumps both directions until neither side has anything left to say.
pub fn settle(authority: &mut Bus, guest: &mut Bus) {
    loop {
        let sent = pump(authority, guest) + pump(guest, authority);
        if sent == 0 {
            break;
        }
    }
}

pub fn fingerprint_of(bus: &Bus) -> Fingerprint {
    fingerprint(bus.host().state())
}

/// Authority ends its turn and the guest applies the confirmation, making
/// the guest the active seat.
pub fn hand_turn_to_guest(authority: &mut Bus, guest: &mut Bus) {
    authority
        .dispatch(duel_core::Command::end_turn())
        .expect("authority ends its turn");
    pump(authority, guest);
    assert_eq!(guest.last_seq(), authority.last_seq());
}
