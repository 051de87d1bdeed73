//! API Handlers
//!
//! HTTP request handlers for the order lookup service. Handlers only read;
//! the cache may fill itself from the store on a miss.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use tracing::warn;

use crate::cache::CacheManager;
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, Order, OrderLookup, StatsResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache manager
    pub cache: Arc<CacheManager>,
}

impl AppState {
    /// Creates a new AppState around an initialized cache.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

async fn lookup(state: &AppState, id: &str) -> Result<Json<Order>> {
    match state.cache.read(id).await {
        Ok(order) => Ok(Json(order)),
        Err(e @ CacheError::NotFound(_)) => Err(e),
        Err(e) => {
            warn!("Lookup of order {} failed: {}", id, e);
            Err(e)
        }
    }
}

/// Handler for GET /orders
///
/// The request body is the raw order id.
pub async fn lookup_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<Order>> {
    let body = std::str::from_utf8(&body)
        .map_err(|_| CacheError::MalformedInput("Order id is not valid UTF-8".to_string()))?;
    let request = OrderLookup::from_body(body)?;
    lookup(&state, &request.id).await
}

/// Handler for GET /orders/:id
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let request = OrderLookup::from_body(&id)?;
    lookup(&state, &request.id).await
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats().await.into())
}

/// Handler for GET /health
///
/// Reports the store connection state; always answers 200.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(state.cache.connection_state()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ConnectionState;
    use crate::models::order::fixtures::order;
    use crate::store::MemoryStore;

    async fn state_with(seed: &[&str]) -> (Arc<MemoryStore>, AppState) {
        let store = Arc::new(MemoryStore::with_orders(seed.iter().map(|id| order(id))));
        let cache = CacheManager::new(store.clone(), true);
        cache.initialize().await.unwrap();
        (store, AppState::new(Arc::new(cache)))
    }

    #[tokio::test]
    async fn test_lookup_by_body() {
        let (_store, state) = state_with(&["abc"]).await;

        let response = lookup_handler(State(state), Bytes::from_static(b"abc")).await.unwrap();
        assert_eq!(response.0, order("abc"));
    }

    #[tokio::test]
    async fn test_lookup_by_path() {
        let (_store, state) = state_with(&["abc"]).await;

        let response = get_order_handler(State(state), Path("abc".to_string()))
            .await
            .unwrap();
        assert_eq!(response.id, "abc");
    }

    #[tokio::test]
    async fn test_lookup_missing() {
        let (_store, state) = state_with(&[]).await;

        let result = lookup_handler(State(state), Bytes::from_static(b"nope")).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup_empty_body() {
        let (store, state) = state_with(&[]).await;

        let result = lookup_handler(State(state), Bytes::new()).await;
        assert!(matches!(result, Err(CacheError::MalformedInput(_))));
        assert_eq!(store.calls().load_one, 0);
    }

    #[tokio::test]
    async fn test_lookup_invalid_utf8() {
        let (store, state) = state_with(&[]).await;

        let result = lookup_handler(State(state), Bytes::from_static(&[0xff, 0xfe, b'a'])).await;
        assert!(matches!(result, Err(CacheError::MalformedInput(_))));
        assert_eq!(store.calls().load_one, 0);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (_store, state) = state_with(&["a", "b"]).await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.total_entries, 2);
        assert_eq!(response.resyncs, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let (_store, state) = state_with(&[]).await;

        let response = health_handler(State(state)).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.store, ConnectionState::Healthy);
    }
}
