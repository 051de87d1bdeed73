//! Ingestion Task
//!
//! Consumes serialized orders from the event stream and writes each one
//! through the cache. Failures are logged and the message dropped; the stream
//! is never blocked, retried or nacked.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheManager;
use crate::error::Result;
use crate::models::Order;

/// Writes one stream message through the cache and logs the outcome.
///
/// The result is returned for callers that care; the consumer loop ignores it.
pub async fn ingest_message(cache: &CacheManager, payload: &[u8]) -> Result<Order> {
    match cache.write(payload).await {
        Ok(order) => {
            info!("Order {} ingested", order.id);
            debug!("Ingested payload: {}", String::from_utf8_lossy(payload));
            Ok(order)
        }
        Err(e) => {
            warn!("Dropping stream message: {}", e);
            Err(e)
        }
    }
}

/// Spawns the consumer loop over a stream of serialized orders.
///
/// Up to `concurrency` messages are processed at once, independently of each
/// other. The task ends when the stream does.
///
/// # Arguments
/// * `cache` - Shared cache manager
/// * `messages` - Stream of raw payloads (e.g. a NATS subscription)
/// * `concurrency` - Maximum number of messages in flight
///
/// # Returns
/// A JoinHandle for the spawned task, which can be aborted during shutdown.
pub fn spawn_ingestion_task<S>(
    cache: Arc<CacheManager>,
    messages: S,
    concurrency: usize,
) -> JoinHandle<()>
where
    S: Stream + Send + 'static,
    S::Item: AsRef<[u8]> + Send,
{
    let concurrency = concurrency.max(1);

    tokio::spawn(async move {
        info!(
            "Starting ingestion task with concurrency {}",
            concurrency
        );

        messages
            .for_each_concurrent(concurrency, |payload| {
                let cache = cache.clone();
                async move {
                    let _ = ingest_message(&cache, payload.as_ref()).await;
                }
            })
            .await;

        info!("Ingestion stream closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::models::order::fixtures::order;
    use crate::store::MemoryStore;
    use futures::stream;

    async fn setup() -> (Arc<MemoryStore>, Arc<CacheManager>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheManager::new(store.clone(), true));
        cache.initialize().await.unwrap();
        (store, cache)
    }

    #[tokio::test]
    async fn test_ingest_valid_message() {
        let (store, cache) = setup().await;
        let payload = serde_json::to_vec(&order("in1")).unwrap();

        let ingested = ingest_message(&cache, &payload).await.unwrap();

        assert_eq!(ingested.id, "in1");
        assert!(store.row("in1").is_some());
        assert!(cache.cached("in1").await.is_some());
    }

    #[tokio::test]
    async fn test_ingest_malformed_message() {
        let (store, cache) = setup().await;

        let result = ingest_message(&cache, b"garbage").await;

        assert!(matches!(result, Err(CacheError::MalformedInput(_))));
        assert_eq!(store.row_count(), 0);
    }

    #[tokio::test]
    async fn test_task_drains_stream_and_survives_failures() {
        let (store, cache) = setup().await;

        let mut payloads: Vec<Vec<u8>> = (0..20)
            .map(|i| serde_json::to_vec(&order(&format!("order-{}", i))).unwrap())
            .collect();
        payloads.insert(5, b"not an order".to_vec());
        // redelivery of an already ingested order
        payloads.push(serde_json::to_vec(&order("order-3")).unwrap());

        let handle = spawn_ingestion_task(cache.clone(), stream::iter(payloads), 4);
        handle.await.unwrap();

        assert_eq!(store.row_count(), 20);
        assert_eq!(cache.len().await, 20);
        let stats = cache.stats().await;
        assert_eq!(stats.writes, 20);
        assert_eq!(stats.failed_writes, 2);
    }

    #[tokio::test]
    async fn test_task_keeps_consuming_during_outage() {
        let (store, cache) = setup().await;
        store.set_available(false);

        let payloads = vec![serde_json::to_vec(&order("dropped")).unwrap()];
        spawn_ingestion_task(cache.clone(), stream::iter(payloads), 1)
            .await
            .unwrap();

        store.set_available(true);
        cache.reconnect().await.unwrap();

        let payloads = vec![serde_json::to_vec(&order("kept")).unwrap()];
        spawn_ingestion_task(cache.clone(), stream::iter(payloads), 1)
            .await
            .unwrap();

        assert!(store.row("dropped").is_none());
        assert!(store.row("kept").is_some());
    }
}
