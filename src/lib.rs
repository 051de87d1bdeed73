//! Order Cache - a store-backed in-memory mirror of the orders table
//!
//! Orders arrive on a NATS subject, are persisted to Postgres and promoted into
//! memory; point lookups are served over HTTP without touching the store on a hit.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheManager;
pub use config::Config;
pub use error::CacheError;
pub use tasks::{spawn_ingestion_task, spawn_reconnect_task};
