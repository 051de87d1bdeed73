//! In-Memory Store
//!
//! Order table kept in a `HashMap`, with switches to simulate an outage or a
//! one-off query fault. Counts calls per operation so callers can tell whether
//! a lookup reached the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{OrderStore, StoreError, StoreResult};
use crate::models::Order;

// == Call Counters ==
/// Number of calls observed per store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub connect: u64,
    pub load_all: u64,
    pub load_one: u64,
    pub insert: u64,
    pub ping: u64,
}

#[derive(Debug, Default)]
struct Counters {
    connect: AtomicU64,
    load_all: AtomicU64,
    load_one: AtomicU64,
    insert: AtomicU64,
    ping: AtomicU64,
}

// == Memory Store ==
/// Order table held in process memory.
#[derive(Debug)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, Order>>,
    /// When false every call fails as if the host were unreachable
    available: AtomicBool,
    connected: AtomicBool,
    /// Fail the next operation with a query error while staying reachable
    fail_next: AtomicBool,
    calls: Counters,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty, reachable, unconnected store.
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            fail_next: AtomicBool::new(false),
            calls: Counters::default(),
        }
    }

    /// Creates a store pre-populated with `orders`.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        for order in orders {
            store.seed(order);
        }
        store
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<String, Order>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Fault Injection ==
    /// Simulates the store going down (`false`) or coming back (`true`).
    ///
    /// Going down also drops the current connection.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if !available {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    /// Makes the next data operation fail with a query error.
    pub fn fail_next_query(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    // == Direct Access ==
    /// Writes a row behind the cache's back.
    pub fn seed(&self, order: Order) {
        self.rows().insert(order.id.clone(), order);
    }

    /// Reads a row without going through the adapter contract.
    pub fn row(&self, id: &str) -> Option<Order> {
        self.rows().get(id).cloned()
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Snapshot of the call counters.
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            connect: self.calls.connect.load(Ordering::Relaxed),
            load_all: self.calls.load_all.load(Ordering::Relaxed),
            load_one: self.calls.load_one.load(Ordering::Relaxed),
            insert: self.calls.insert.load(Ordering::Relaxed),
            ping: self.calls.ping.load(Ordering::Relaxed),
        }
    }

    /// Common gate for data operations.
    fn check(&self) -> StoreResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store unreachable".to_string()));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store is not connected".to_string()));
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Query("injected query failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn connect(&self) -> StoreResult<()> {
        self.calls.connect.fetch_add(1, Ordering::Relaxed);
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store unreachable".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<Order>> {
        self.calls.load_all.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        Ok(self.rows().values().cloned().collect())
    }

    async fn load_one(&self, id: &str) -> StoreResult<Order> {
        self.calls.load_one.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        self.rows()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, order: &Order) -> StoreResult<()> {
        self.calls.insert.fetch_add(1, Ordering::Relaxed);
        self.check()?;

        let mut rows = self.rows();
        if rows.contains_key(&order.id) {
            return Err(StoreError::DuplicateKey(order.id.clone()));
        }
        rows.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn ping(&self) -> bool {
        self.calls.ping.fetch_add(1, Ordering::Relaxed);
        self.available.load(Ordering::SeqCst) && self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::fixtures::order;

    async fn connected_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.connect().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_and_load_one() {
        let store = connected_store().await;

        store.insert(&order("a")).await.unwrap();
        assert_eq!(store.load_one("a").await.unwrap(), order("a"));
        assert_eq!(store.row_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = connected_store().await;

        store.insert(&order("a")).await.unwrap();
        let result = store.insert(&order("a")).await;
        assert_eq!(result, Err(StoreError::DuplicateKey("a".to_string())));
    }

    #[tokio::test]
    async fn test_load_one_missing() {
        let store = connected_store().await;
        assert!(matches!(store.load_one("nope").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_calls_before_connect_fail() {
        let store = MemoryStore::with_orders([order("a")]);
        assert!(matches!(store.load_all().await, Err(StoreError::Connection(_))));
        assert!(!store.ping().await);
    }

    #[tokio::test]
    async fn test_outage_and_recovery() {
        let store = connected_store().await;

        store.set_available(false);
        assert!(!store.ping().await);
        assert!(store.connect().await.is_err());
        assert!(matches!(store.insert(&order("a")).await, Err(StoreError::Connection(_))));

        store.set_available(true);
        // connection was dropped by the outage
        assert!(!store.ping().await);
        store.connect().await.unwrap();
        assert!(store.ping().await);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let store = connected_store().await;
        store.fail_next_query();

        assert!(matches!(store.load_all().await, Err(StoreError::Query(_))));
        assert!(store.ping().await);
        assert!(store.load_all().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = connected_store().await;
        store.close().await;
        store.close().await;
        assert!(!store.is_connected());
    }
}
