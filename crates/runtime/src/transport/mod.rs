//! Transport implementations.

mod memory;

pub use memory::{MemoryTransport, forward_link, memory_link};
