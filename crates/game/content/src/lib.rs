//! Reference rule engine for a two-seat card duel.
//!
//! This crate houses static content and the rules that give commands their
//! meaning:
//! - Card catalog (data-driven via RON)
//! - Deterministic game setup (seeded deck shuffles)
//! - [`DuelHost`], the executor the synchronization layer drives
//!
//! The synchronization core never depends on this crate; it only sees the
//! [`duel_core::SimulationHost`] interface.

pub mod catalog;
pub mod host;
pub mod rules;
pub mod setup;

pub use catalog::{CardCatalog, CardDefinition, CatalogError};
pub use host::DuelHost;
pub use setup::DuelSetup;
