//! Seams the bus is driven through.
//!
//! The simulation seam lives in `duel-core` so rule engines need not depend
//! on this crate; it is re-exported here next to [`Transport`].

pub use duel_core::{ExecutionReport, SimulationHost};

use crate::wire::WireMessage;

/// Outbound half of the peer-to-peer channel.
///
/// Delivery is best-effort: implementations may lose, duplicate or reorder
/// messages, and must not block. Framing failures are the transport's to log.
pub trait Transport {
    fn broadcast(&mut self, message: WireMessage);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn broadcast(&mut self, message: WireMessage) {
        (**self).broadcast(message);
    }
}
