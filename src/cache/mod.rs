//! Cache Module
//!
//! Store-backed in-memory mirror of the order table, with reconnect handling
//! and per-key write exclusion.

mod inflight;
mod manager;
mod reconnect;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use inflight::{InFlight, InFlightGuard};
pub use manager::CacheManager;
pub use reconnect::{ConnectionState, ProbeOutcome, ReconnectPolicy};
pub use stats::{CacheCounters, CacheStats};
