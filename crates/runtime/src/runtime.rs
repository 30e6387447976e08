//! High-level peer orchestrator.
//!
//! A [`Peer`] owns the background worker driving one replication bus, wires
//! up command/event channels, and exposes a builder-based API for clients.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use duel_core::{SessionMetadata, SimulationHost};

use crate::api::{PeerHandle, Result, SyncError, Transport};
use crate::bus::ActionBus;
use crate::config::SyncConfig;
use crate::events::{EventBus, SyncEvent, Topic};
use crate::workers::PeerWorker;

/// One side of a synchronized session.
///
/// Design: Peer owns the worker task. [`PeerHandle`] provides a cloneable
/// façade for clients and transports.
pub struct Peer {
    handle: PeerHandle,
    worker_handle: JoinHandle<()>,
}

impl Peer {
    /// Create a new peer builder
    pub fn builder<H, T>() -> PeerBuilder<H, T> {
        PeerBuilder::new()
    }

    /// Get a cloneable handle to this peer
    pub fn handle(&self) -> PeerHandle {
        self.handle.clone()
    }

    /// Subscribe to events from one topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SyncEvent> {
        self.handle.subscribe(topic)
    }

    /// Shutdown the peer gracefully
    ///
    /// The worker stops once every other clone of the handle (including the
    /// ones held by link forwarders) has been dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        self.worker_handle.await.map_err(SyncError::WorkerJoin)
    }
}

/// Builder for [`Peer`] with flexible configuration.
pub struct PeerBuilder<H, T> {
    config: SyncConfig,
    session: SessionMetadata,
    host: Option<H>,
    transport: Option<T>,
}

impl<H, T> PeerBuilder<H, T> {
    fn new() -> Self {
        Self {
            config: SyncConfig::default(),
            session: SessionMetadata::default(),
            host: None,
            transport: None,
        }
    }

    /// Override synchronization configuration
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Identity metadata of the session
    pub fn session(mut self, session: SessionMetadata) -> Self {
        self.session = session;
        self
    }

    /// Set required simulation host
    pub fn host(mut self, host: H) -> Self {
        self.host = Some(host);
        self
    }

    /// Set required transport
    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl<H, T> PeerBuilder<H, T>
where
    H: SimulationHost + Send + 'static,
    T: Transport + Send + 'static,
{
    /// Spawns the worker. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Peer> {
        let host = self.host.ok_or(SyncError::MissingHost)?;
        let transport = self.transport.ok_or(SyncError::MissingTransport)?;

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer_size);
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        tracing::info!(
            target: "sync::peer",
            local = ?self.session.local_identity(),
            authority = ?self.session.authority_identity(),
            "starting peer"
        );

        let bus = ActionBus::new(host, transport, self.session, self.config, event_bus.clone());
        let worker = PeerWorker::new(bus, command_rx);
        let worker_handle = tokio::spawn(worker.run());

        Ok(Peer {
            handle: PeerHandle::new(command_tx, event_bus),
            worker_handle,
        })
    }
}
