//! Background Tasks Module
//!
//! Contains the long-running tasks that feed and heal the cache.
//!
//! # Tasks
//! - Ingestion: writes orders arriving on the event stream through the cache
//! - Reconnect: retries the store connection while it is down

mod ingest;
mod reconnect;

pub use ingest::{ingest_message, spawn_ingestion_task};
pub use reconnect::spawn_reconnect_task;
