//! Durable Store Module
//!
//! Adapters owning the connection to the persistent order table.
//!
//! # Implementations
//! - `PgOrderStore` - PostgreSQL over a single long-lived connection
//! - `MemoryStore` - in-process table with fault injection

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Order;

pub use memory::{MemoryStore, StoreCalls};
pub use postgres::PgOrderStore;

// == Store Error ==
/// Failures reported by a store adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unreachable host, bad credentials, protocol mismatch or lost connection
    #[error("store connection failed: {0}")]
    Connection(String),

    /// No row with this id
    #[error("no order with id {0}")]
    NotFound(String),

    /// A row with this id already exists
    #[error("order {0} already exists")]
    DuplicateKey(String),

    /// Any other store fault, timeouts included
    #[error("store query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// True for failures that call the connection itself into question.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Query(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Order Store Trait ==
/// Contract for the durable order table.
///
/// Implementations own their connection handle; `connect` replaces it in place.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Establishes the connection, closing any previous one.
    async fn connect(&self) -> StoreResult<()>;

    /// Loads every row.
    async fn load_all(&self) -> StoreResult<Vec<Order>>;

    /// Loads a single row by id.
    async fn load_one(&self, id: &str) -> StoreResult<Order>;

    /// Persists a new row. Fails with `DuplicateKey` if the id exists.
    async fn insert(&self, order: &Order) -> StoreResult<()>;

    /// Side-effect-free liveness probe.
    async fn ping(&self) -> bool;

    /// Releases the connection. Calling it twice is a no-op.
    async fn close(&self);
}
