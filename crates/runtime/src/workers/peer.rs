//! Peer worker that owns one [`ActionBus`].
//!
//! Receives commands from [`PeerHandle`](crate::PeerHandle) and frames from the
//! transport on a single queue, and drives the bus timers from the same loop,
//! so the bus never needs a lock.

use std::future;

use duel_core::{Command, GameState, SimulationHost};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::api::{Result, Transport};
use crate::bus::{ActionBus, Dispatched, LogEntry, SyncStatus};
use crate::wire::WireMessage;

/// Commands that can be sent to the peer worker
pub enum PeerCommand {
    /// Execute a locally issued command.
    Dispatch {
        command: Command,
        reply: oneshot::Sender<Result<Dispatched>>,
    },
    /// A message received from the other peer.
    Deliver { message: WireMessage },
    /// Start a new recovery round.
    RequestRecovery { reply: oneshot::Sender<Result<()>> },
    /// Query the current game state (read-only).
    QueryState { reply: oneshot::Sender<GameState> },
    QueryStatus {
        reply: oneshot::Sender<Result<SyncStatus>>,
    },
    QueryLog { reply: oneshot::Sender<Vec<LogEntry>> },
}

/// Background task that processes peer commands and bus timers.
pub struct PeerWorker<H, T> {
    bus: ActionBus<H, T>,
    command_rx: mpsc::Receiver<PeerCommand>,
}

impl<H, T> PeerWorker<H, T>
where
    H: SimulationHost,
    T: Transport,
{
    pub fn new(bus: ActionBus<H, T>, command_rx: mpsc::Receiver<PeerCommand>) -> Self {
        Self { bus, command_rx }
    }

    /// Main worker loop. Ends when every handle has been dropped.
    pub async fn run(mut self) {
        info!(target: "sync::worker", "peer worker started");
        loop {
            let deadline = self.bus.next_deadline();
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = sleep_until(deadline) => {
                    self.bus.tick(Instant::now());
                }
            }
        }
        info!(target: "sync::worker", "peer worker stopped");
    }

    fn handle_command(&mut self, cmd: PeerCommand) {
        match cmd {
            PeerCommand::Dispatch { command, reply } => {
                let result = self.bus.dispatch(command);
                if reply.send(result).is_err() {
                    debug!(target: "sync::worker", "Dispatch reply channel closed (caller dropped)");
                }
            }
            PeerCommand::Deliver { message } => {
                let kind = message.kind();
                if let Err(error) = self.bus.handle_message(message) {
                    warn!(target: "sync::worker", kind, %error, "failed to handle message");
                }
            }
            PeerCommand::RequestRecovery { reply } => {
                let result = self.bus.request_recovery();
                if reply.send(result).is_err() {
                    debug!(target: "sync::worker", "RequestRecovery reply channel closed (caller dropped)");
                }
            }
            PeerCommand::QueryState { reply } => {
                if reply.send(self.bus.host().state().clone()).is_err() {
                    debug!(target: "sync::worker", "QueryState reply channel closed (caller dropped)");
                }
            }
            PeerCommand::QueryStatus { reply } => {
                if reply.send(self.bus.status()).is_err() {
                    debug!(target: "sync::worker", "QueryStatus reply channel closed (caller dropped)");
                }
            }
            PeerCommand::QueryLog { reply } => {
                if reply.send(self.bus.action_log().entries().to_vec()).is_err() {
                    debug!(target: "sync::worker", "QueryLog reply channel closed (caller dropped)");
                }
            }
        }
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
