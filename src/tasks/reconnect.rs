//! Reconnect Task
//!
//! Background task that keeps retrying the store connection while the cache
//! reports it as down, so recovery does not wait for the next failing request.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheManager, ConnectionState};

/// Spawns a task that calls [`CacheManager::reconnect`] every `interval_secs`
/// seconds while the connection state is `Reconnecting`.
///
/// # Returns
/// A JoinHandle for the spawned task, to be aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_reconnect_task(cache.clone(), 5);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_reconnect_task(cache: Arc<CacheManager>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting reconnect task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            if cache.connection_state() != ConnectionState::Reconnecting {
                continue;
            }

            match cache.reconnect().await {
                Ok(()) => info!("Reconnect task restored the store connection"),
                Err(e) => debug!("Store still unreachable: {}", e),
            }
        }
    })
}
