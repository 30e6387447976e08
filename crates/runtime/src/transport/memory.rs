//! In-process transport carrying JSON frames over tokio channels.
//!
//! Frames go through the same `to_json`/`from_json` path a network channel
//! would use. A transport can be told to drop selected frames to exercise
//! the timeout and recovery paths.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{PeerHandle, Transport};
use crate::wire::WireMessage;

/// Sending half of one direction of a memory link.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<String>,
    sent: usize,
    drop_frames: Vec<usize>,
}

impl MemoryTransport {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            tx,
            sent: 0,
            drop_frames: Vec::new(),
        }
    }

    /// Silently discards the `index`-th frame (0-based) sent through this
    /// transport.
    pub fn dropping_frame(mut self, index: usize) -> Self {
        self.drop_frames.push(index);
        self
    }

    /// Frames broadcast so far, dropped ones included.
    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl Transport for MemoryTransport {
    fn broadcast(&mut self, message: WireMessage) {
        let index = self.sent;
        self.sent += 1;

        if self.drop_frames.contains(&index) {
            debug!(target: "sync::transport", index, kind = message.kind(), "dropping frame");
            return;
        }

        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(error) => {
                warn!(target: "sync::transport", %error, "failed to frame message");
                return;
            }
        };
        if self.tx.send(frame).is_err() {
            debug!(target: "sync::transport", "link closed; frame discarded");
        }
    }
}

/// Creates a bidirectional link.
///
/// Returns `(a, b)` where each side holds the transport it sends with and the
/// receiver for frames sent by the other side.
pub fn memory_link() -> (
    (MemoryTransport, mpsc::UnboundedReceiver<String>),
    (MemoryTransport, mpsc::UnboundedReceiver<String>),
) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        (MemoryTransport::new(a_tx), a_rx),
        (MemoryTransport::new(b_tx), b_rx),
    )
}

/// Pumps frames from `rx` into the peer behind `handle` until either side
/// closes. Undecodable frames are logged and skipped.
pub fn forward_link(mut rx: mpsc::UnboundedReceiver<String>, handle: PeerHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let message = match WireMessage::from_json(&frame) {
                Ok(message) => message,
                Err(error) => {
                    warn!(target: "sync::transport", %error, "discarding undecodable frame");
                    continue;
                }
            };
            if handle.deliver(message).await.is_err() {
                debug!(target: "sync::transport", "peer stopped; closing link");
                break;
            }
        }
    })
}
