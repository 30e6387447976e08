//! Cloneable façade for issuing commands to a peer.
//!
//! [`PeerHandle`] hides channel plumbing and offers async helpers for
//! dispatching commands, feeding inbound messages, or streaming events from
//! specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use duel_core::{Command, GameState};

use super::errors::{Result, SyncError};
use crate::bus::{Dispatched, LogEntry, SyncStatus};
use crate::events::{EventBus, SyncEvent, Topic};
use crate::wire::WireMessage;
use crate::workers::PeerCommand;

/// Client-facing handle to interact with a peer
#[derive(Clone)]
pub struct PeerHandle {
    command_tx: mpsc::Sender<PeerCommand>,
    event_bus: EventBus,
}

impl PeerHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<PeerCommand>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    /// Execute a locally issued command
    pub async fn dispatch(&self, command: Command) -> Result<Dispatched> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PeerCommand::Dispatch {
            command,
            reply: reply_tx,
        })
        .await?;

        reply_rx.await.map_err(SyncError::ReplyChannelClosed)?
    }

    /// Hand a message received from the other peer to the worker
    ///
    /// Returns once the message is queued. Handling failures are logged by
    /// the worker.
    pub async fn deliver(&self, message: WireMessage) -> Result<()> {
        self.send(PeerCommand::Deliver { message }).await
    }

    /// Start a new recovery round (e.g. after `RecoveryStalled`)
    pub async fn request_recovery(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PeerCommand::RequestRecovery { reply: reply_tx })
            .await?;

        reply_rx.await.map_err(SyncError::ReplyChannelClosed)?
    }

    /// Query the current game state (read-only snapshot)
    pub async fn query_state(&self) -> Result<GameState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PeerCommand::QueryState { reply: reply_tx })
            .await?;

        reply_rx.await.map_err(SyncError::ReplyChannelClosed)
    }

    pub async fn status(&self) -> Result<SyncStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PeerCommand::QueryStatus { reply: reply_tx })
            .await?;

        reply_rx.await.map_err(SyncError::ReplyChannelClosed)?
    }

    /// Copy of the confirmed-command log
    pub async fn action_log(&self) -> Result<Vec<LogEntry>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PeerCommand::QueryLog { reply: reply_tx }).await?;

        reply_rx.await.map_err(SyncError::ReplyChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Replication` - Confirmed and rejected commands
    /// - `Topic::Recovery` - Desync detection and recovery progress
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SyncEvent> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<SyncEvent>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn send(&self, command: PeerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SyncError::CommandChannelClosed)
    }
}
