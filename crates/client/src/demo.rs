//! Scripted duel between an authority and a guest in one process.
//!
//! Each seat takes simple turns: draw, play the first card in hand, move to
//! combat, attack the opposing hero with everything on board, end the turn.
//! After every command the script waits until both replicas agree.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use duel_content::{CardCatalog, DuelHost, DuelSetup};
use duel_core::{AttackTarget, Command, GameState, SessionMetadata, Slot};
use duel_sync::{
    Peer, PeerHandle, SyncConfig, SyncError, SyncEvent, SyncPhase, SyncStatus, Topic,
    forward_link, memory_link,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::DemoConfig;

const HOST: &str = "host";
const GUEST: &str = "guest";

const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub struct Demo {
    authority: Peer,
    guest: Peer,
    tasks: Vec<JoinHandle<()>>,
}

impl Demo {
    pub fn start(demo: &DemoConfig, sync: SyncConfig) -> Result<Self> {
        let catalog = Arc::new(CardCatalog::embedded().context("failed to load card catalog")?);
        let setup = DuelSetup::new(demo.seed, HOST, GUEST);
        let host_for = |local: &str| -> Result<DuelHost> {
            Ok(DuelHost::from_setup(Arc::clone(&catalog), &setup)
                .context("failed to build duel setup")?
                .for_peer(local))
        };

        let ((authority_tx, authority_rx), (guest_tx, guest_rx)) = memory_link();
        let guest_tx = match demo.drop_guest_frame {
            Some(index) => {
                info!("Guest transport will drop frame {index}");
                guest_tx.dropping_frame(index)
            }
            None => guest_tx,
        };

        let authority = Peer::builder()
            .config(sync.clone())
            .session(SessionMetadata::new(HOST, HOST))
            .host(host_for(HOST)?)
            .transport(authority_tx)
            .build()?;
        let guest = Peer::builder()
            .config(sync)
            .session(SessionMetadata::new(GUEST, HOST))
            .host(host_for(GUEST)?)
            .transport(guest_tx)
            .build()?;

        let tasks = vec![
            forward_link(authority_rx, authority.handle()),
            forward_link(guest_rx, guest.handle()),
            spawn_event_logger("authority", authority.handle()),
            spawn_event_logger("guest", guest.handle()),
        ];

        Ok(Self {
            authority,
            guest,
            tasks,
        })
    }

    pub async fn run(&self, turns: u32) -> Result<()> {
        let authority = self.authority.handle();
        let guest = self.guest.handle();

        for turn in 0..turns {
            let state = authority.query_state().await?;
            if state.is_over() {
                break;
            }
            let (name, peer) = if state.turn.active == Slot::FIRST {
                (HOST, &authority)
            } else {
                (GUEST, &guest)
            };
            info!(turn = turn + 1, seat = name, "playing turn");
            self.play_turn(peer).await?;
        }

        let (status, _) = settle(&authority, &guest).await?;
        let state = authority.query_state().await?;
        summarize(&status, &state);
        Ok(())
    }

    async fn play_turn(&self, peer: &PeerHandle) -> Result<()> {
        let authority = self.authority.handle();
        let guest = self.guest.handle();

        self.step(peer, Command::draw_card()).await?;

        let state = peer.query_state().await?;
        let active = state.turn.active;
        if let Some(card) = state.participant(active).zones.hand.first() {
            self.step(peer, Command::play_card(card.clone())).await?;
        }

        self.step(peer, Command::end_phase()).await?;

        let state = peer.query_state().await?;
        for attacker in state.participant(active).zones.board.clone() {
            self.step(peer, Command::attack(attacker, AttackTarget::Hero))
                .await?;
            if authority.query_state().await?.is_over() {
                return Ok(());
            }
        }

        self.step(peer, Command::end_turn()).await?;
        settle(&authority, &guest).await?;
        Ok(())
    }

    /// Dispatches one command and waits for both replicas to agree.
    async fn step(&self, peer: &PeerHandle, command: Command) -> Result<()> {
        let kind = command.kind;
        match peer.dispatch(command).await {
            Ok(dispatched) => info!(%kind, ?dispatched, "dispatched"),
            Err(SyncError::Execution(error)) => warn!(%kind, %error, "command refused locally"),
            Err(SyncError::RecoveryInProgress) => warn!(%kind, "skipped during recovery"),
            Err(error) => return Err(error.into()),
        }
        settle(&self.authority.handle(), &self.guest.handle()).await?;
        Ok(())
    }

    pub async fn shutdown(self) -> Result<()> {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            let _ = task.await;
        }
        self.authority.shutdown().await?;
        self.guest.shutdown().await?;
        Ok(())
    }
}

/// Waits until the guest has no work in flight and matches the authority.
async fn settle(authority: &PeerHandle, guest: &PeerHandle) -> Result<(SyncStatus, SyncStatus)> {
    timeout(SETTLE_TIMEOUT, converged(authority, guest))
        .await
        .context("peers did not converge in time")?
}

async fn converged(
    authority: &PeerHandle,
    guest: &PeerHandle,
) -> Result<(SyncStatus, SyncStatus)> {
    loop {
        let a = authority.status().await?;
        let g = guest.status().await?;
        if g.phase == SyncPhase::Normal && g.pending_intents == 0 && g.last_seq == a.last_seq {
            if g.fingerprint != a.fingerprint {
                bail!(
                    "replicas disagree at seq {}: {} vs {}",
                    a.last_seq,
                    a.fingerprint,
                    g.fingerprint
                );
            }
            return Ok((a, g));
        }
        sleep(POLL_INTERVAL).await;
    }
}

fn spawn_event_logger(name: &'static str, handle: PeerHandle) -> JoinHandle<()> {
    let mut rx = handle.subscribe(Topic::Recovery);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SyncEvent::Recovery(event)) => info!(peer = name, ?event, "recovery event"),
                Ok(SyncEvent::Replication(_)) => {}
                Err(RecvError::Lagged(skipped)) => warn!(peer = name, skipped, "event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn summarize(status: &SyncStatus, state: &GameState) {
    info!(
        seq = status.last_seq,
        fingerprint = %status.fingerprint,
        turn = state.turn.number,
        "session converged"
    );
    for slot in Slot::ALL {
        let participant = state.participant(slot);
        info!(
            seat = %slot,
            peer = %participant.identity,
            life = participant.life,
            board = participant.zones.board.len(),
            hand = participant.zones.hand.len(),
            "final seat"
        );
    }
    if let Some(winner) = state.winner {
        info!(winner = %state.participant(winner).identity, "game over");
    }
}
