//! Cache Manager Module
//!
//! Owns the in-memory mirror of the order table and mediates every read and
//! write against it and the durable store.
//!
//! # Invariants
//! - Every cached order equals the store row with the same id.
//! - The store is written before the mirror; a failed insert never reaches memory.
//! - At most one insert per id is in flight.
//!
//! # Locking
//! The mapping sits behind an async `RwLock`: reads share it, installs and
//! resyncs take it exclusively. No lock on the mapping is held across a store
//! call. The reconnect policy has its own mutex, held for the whole probe; a
//! failure that finds a probe already running, or the store already marked
//! Reconnecting, is reported without probing again. The connection state is
//! read from a watch channel and never waits for the probe.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::cache::{
    CacheCounters, CacheStats, ConnectionState, InFlight, ProbeOutcome, ReconnectPolicy,
};
use crate::error::{CacheError, Result};
use crate::models::Order;
use crate::store::{OrderStore, StoreError};

// == Cache Manager ==
/// Store-backed mirror of every order.
pub struct CacheManager {
    /// Order id -> order, a subset-or-equal mirror of the store
    entries: RwLock<HashMap<String, Order>>,
    /// Durable store adapter
    store: Arc<dyn OrderStore>,
    /// Connection health state machine
    policy: Mutex<ReconnectPolicy>,
    /// Published connection state
    state: watch::Receiver<ConnectionState>,
    /// Ids with an insert in progress
    in_flight: InFlight,
    /// Performance statistics
    counters: CacheCounters,
    /// Reload everything after each successful reconnect
    resync_on_reconnect: bool,
}

impl CacheManager {
    // == Constructor ==
    /// Creates an empty manager over `store`. Call [`initialize`](Self::initialize) before use.
    pub fn new(store: Arc<dyn OrderStore>, resync_on_reconnect: bool) -> Self {
        let policy = ReconnectPolicy::new();
        let state = policy.watch();
        Self {
            entries: RwLock::new(HashMap::new()),
            store,
            policy: Mutex::new(policy),
            state,
            in_flight: InFlight::new(),
            counters: CacheCounters::new(),
            resync_on_reconnect,
        }
    }

    // == Initialize ==
    /// Connects to the store and warms the mirror with every row.
    ///
    /// A failure here means no cache can exist; callers treat it as fatal.
    pub async fn initialize(&self) -> Result<()> {
        self.store.connect().await?;
        let loaded = self.resync().await?;
        info!("Cache initialized with {} orders", loaded);
        Ok(())
    }

    // == Write ==
    /// Decodes a serialized order and writes it through.
    pub async fn write(&self, payload: &[u8]) -> Result<Order> {
        let order = match Order::from_json(payload) {
            Ok(order) => order,
            Err(e) => {
                self.counters.record_failed_write();
                return Err(e);
            }
        };

        self.write_order(order.clone()).await?;
        Ok(order)
    }

    /// Inserts `order` into the store, then into the mirror.
    ///
    /// Store failures are reported once and never retried. Transport failures
    /// run the reconnect policy first.
    pub async fn write_order(&self, mut order: Order) -> Result<()> {
        order.normalize();
        if let Err(e) = order.validate() {
            self.counters.record_failed_write();
            return Err(e);
        }

        let slot = self.in_flight.acquire(&order.id).await;

        match self.store.insert(&order).await {
            Ok(()) => {
                let id = order.id.clone();
                self.entries.write().await.insert(id.clone(), order);
                drop(slot);

                self.counters.record_write();
                debug!("Order {} written", id);
                Ok(())
            }
            Err(e) => {
                drop(slot);
                self.counters.record_failed_write();
                Err(self.on_store_error(e).await)
            }
        }
    }

    // == Read ==
    /// Returns the order with `id`, filling the mirror from the store on a miss.
    pub async fn read(&self, id: &str) -> Result<Order> {
        let cached = self.entries.read().await.get(id).cloned();
        if let Some(order) = cached {
            self.counters.record_hit();
            return Ok(order);
        }

        self.counters.record_miss();
        match self.store.load_one(id).await {
            Ok(order) => {
                // a concurrent write may have installed it already; both copies match the store
                self.entries
                    .write()
                    .await
                    .entry(order.id.clone())
                    .or_insert_with(|| order.clone());
                self.counters.record_lazy_fill();
                debug!("Order {} lazily filled from store", id);
                Ok(order)
            }
            Err(e) => Err(self.on_store_error(e).await),
        }
    }

    // == Resync ==
    /// Replaces the whole mirror with the store's current contents.
    ///
    /// The old mapping is kept if the reload fails.
    pub async fn resync(&self) -> Result<usize> {
        let orders = self.store.load_all().await?;

        let fresh: HashMap<String, Order> = orders
            .into_iter()
            .map(|order| (order.id.clone(), order))
            .collect();
        let count = fresh.len();

        *self.entries.write().await = fresh;
        self.counters.record_resync();
        info!("Cache resynced: {} orders loaded", count);
        Ok(count)
    }

    // == Reconnect ==
    /// Re-establishes the store connection and returns the state to Healthy.
    pub async fn reconnect(&self) -> Result<()> {
        self.policy
            .lock()
            .await
            .reconnect(self.store.as_ref())
            .await?;
        self.after_reconnect().await;
        Ok(())
    }

    /// Runs the reconnect policy for transport failures and converts the error.
    async fn on_store_error(&self, err: StoreError) -> CacheError {
        if !err.is_transport() {
            return err.into();
        }
        warn!("Store operation failed: {}", err);

        if self.connection_state() == ConnectionState::Reconnecting {
            debug!("Store already marked down, leaving recovery to reconnect");
            return err.into();
        }

        let outcome = match self.policy.try_lock() {
            Ok(mut policy) => policy.on_failure(self.store.as_ref()).await,
            Err(_) => {
                debug!("Probe already running, not starting another");
                return err.into();
            }
        };

        if outcome == ProbeOutcome::Reconnected {
            self.after_reconnect().await;
        }
        err.into()
    }

    async fn after_reconnect(&self) {
        if !self.resync_on_reconnect {
            return;
        }
        if let Err(e) = self.resync().await {
            error!("Resync after reconnect failed: {}", e);
        }
    }

    // == Introspection ==
    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns the cached order with `id` without touching the store.
    pub async fn cached(&self, id: &str) -> Option<Order> {
        self.entries.read().await.get(id).cloned()
    }

    /// Copy of the whole mirror.
    pub async fn snapshot(&self) -> HashMap<String, Order> {
        self.entries.read().await.clone()
    }

    /// Number of cached orders.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let total = self.len().await;
        self.counters.snapshot(total)
    }

    // == Shutdown ==
    /// Releases the store connection.
    pub async fn shutdown(&self) {
        self.store.close().await;
        info!("Cache manager shut down");
    }
}
