//! Reconnect Policy Module
//!
//! State machine deciding what happens after a store operation fails at the
//! transport level.

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::store::{OrderStore, StoreResult};

// == Connection State ==
/// Health of the store connection as seen by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Healthy,
    /// An operation failed; liveness not yet confirmed either way
    Suspect,
    /// Liveness probe failed; waiting for `connect` to succeed
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Healthy => "healthy",
            ConnectionState::Suspect => "suspect",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

// == Probe Outcome ==
/// Result of running the policy after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Ping succeeded, the failure was not a connection fault
    Transient,
    /// Ping failed and a fresh connection was established
    Reconnected,
    /// Ping failed and so did `connect`
    StillDown,
}

// == Reconnect Policy ==
/// Healthy → Suspect → {Healthy | Reconnecting → Healthy}.
///
/// Callers hold the policy behind a mutex for the whole probe so concurrent
/// failures observe one transition at a time. The current state is published
/// on a watch channel so readers never wait for a running probe.
#[derive(Debug)]
pub struct ReconnectPolicy {
    state: watch::Sender<ConnectionState>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectPolicy {
    /// Starts healthy.
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Healthy);
        Self { state }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change without taking the policy lock.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    // == On Failure ==
    /// Runs the probe after a transport-level failure.
    ///
    /// Only a Healthy connection becomes Suspect. While Reconnecting the ping
    /// is skipped and `connect` is retried directly.
    pub async fn on_failure(&mut self, store: &dyn OrderStore) -> ProbeOutcome {
        if self.state() != ConnectionState::Reconnecting {
            self.set_state(ConnectionState::Suspect);

            if store.ping().await {
                info!("Store answered ping, treating failure as transient");
                self.set_state(ConnectionState::Healthy);
                return ProbeOutcome::Transient;
            }

            warn!("Store ping failed, reconnecting");
            self.set_state(ConnectionState::Reconnecting);
        }

        if self.reconnect(store).await.is_ok() {
            ProbeOutcome::Reconnected
        } else {
            ProbeOutcome::StillDown
        }
    }

    // == Reconnect ==
    /// Attempts `connect`; moves to Healthy on success.
    ///
    /// On failure the state is left at Reconnecting.
    pub async fn reconnect(&mut self, store: &dyn OrderStore) -> StoreResult<()> {
        match store.connect().await {
            Ok(()) => {
                info!("Store connection re-established");
                self.set_state(ConnectionState::Healthy);
                Ok(())
            }
            Err(e) => {
                warn!("Reconnect failed: {}", e);
                self.set_state(ConnectionState::Reconnecting);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn connected_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.connect().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_transient_failure_returns_to_healthy() {
        let store = connected_store().await;
        let mut policy = ReconnectPolicy::new();

        let outcome = policy.on_failure(&store).await;

        assert_eq!(outcome, ProbeOutcome::Transient);
        assert_eq!(policy.state(), ConnectionState::Healthy);
        // no reconnect attempted
        assert_eq!(store.calls().connect, 1);
    }

    #[tokio::test]
    async fn test_dead_store_stays_reconnecting() {
        let store = connected_store().await;
        store.set_available(false);
        let mut policy = ReconnectPolicy::new();

        let outcome = policy.on_failure(&store).await;

        assert_eq!(outcome, ProbeOutcome::StillDown);
        assert_eq!(policy.state(), ConnectionState::Reconnecting);
    }

    #[tokio::test]
    async fn test_dropped_connection_is_reestablished() {
        let store = connected_store().await;
        store.close().await;
        let mut policy = ReconnectPolicy::new();

        let outcome = policy.on_failure(&store).await;

        assert_eq!(outcome, ProbeOutcome::Reconnected);
        assert_eq!(policy.state(), ConnectionState::Healthy);
        assert!(store.is_connected());
    }

    #[tokio::test]
    async fn test_reconnect_after_restore() {
        let store = connected_store().await;
        store.set_available(false);
        let mut policy = ReconnectPolicy::new();
        policy.on_failure(&store).await;

        store.set_available(true);
        assert!(policy.reconnect(&store).await.is_ok());
        assert_eq!(policy.state(), ConnectionState::Healthy);
    }

    #[tokio::test]
    async fn test_failure_while_reconnecting_skips_suspect() {
        let store = connected_store().await;
        store.set_available(false);
        let mut policy = ReconnectPolicy::new();
        policy.on_failure(&store).await;
        assert_eq!(store.calls().ping, 1);

        let mut state = policy.watch();
        state.borrow_and_update();
        let outcome = policy.on_failure(&store).await;

        assert_eq!(outcome, ProbeOutcome::StillDown);
        // no detour through Suspect, and no second ping
        assert!(!state.has_changed().unwrap());
        assert_eq!(policy.state(), ConnectionState::Reconnecting);
        assert_eq!(store.calls().ping, 1);
    }

    #[tokio::test]
    async fn test_failure_while_reconnecting_can_heal() {
        let store = connected_store().await;
        store.set_available(false);
        let mut policy = ReconnectPolicy::new();
        policy.on_failure(&store).await;

        store.set_available(true);
        let outcome = policy.on_failure(&store).await;

        assert_eq!(outcome, ProbeOutcome::Reconnected);
        assert_eq!(policy.state(), ConnectionState::Healthy);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(
            serde_json::to_string(&ConnectionState::Healthy).unwrap(),
            "\"healthy\""
        );
    }
}
