//! Response DTOs for the query API
//!
//! Successful lookups return the `Order` itself; these cover the service endpoints.

use serde::Serialize;

use crate::cache::{CacheStats, ConnectionState};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Reads answered from memory
    pub hits: u64,
    /// Reads that went to the store
    pub misses: u64,
    /// Misses filled from the store
    pub lazy_fills: u64,
    /// Successful writes
    pub writes: u64,
    /// Rejected or failed writes
    pub failed_writes: u64,
    /// Full reloads performed
    pub resyncs: u64,
    /// Current number of cached orders
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            lazy_fills: stats.lazy_fills,
            writes: stats.writes,
            failed_writes: stats.failed_writes,
            resyncs: stats.resyncs,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" while the store is reachable, "degraded" otherwise
    pub status: String,
    /// Store connection state
    pub store: ConnectionState,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Builds a health report for the given connection state.
    pub fn from_state(store: ConnectionState) -> Self {
        let status = match store {
            ConnectionState::Healthy => "healthy",
            _ => "degraded",
        };
        Self {
            status: status.to_string(),
            store,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_hit_rate() {
        let resp = StatsResponse::from(CacheStats {
            hits: 80,
            misses: 20,
            total_entries: 100,
            ..Default::default()
        });
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.total_entries, 100);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::from(CacheStats::default());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::from_state(ConnectionState::Healthy);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"store\":\"healthy\""));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_health_response_degraded() {
        let resp = HealthResponse::from_state(ConnectionState::Reconnecting);
        assert_eq!(resp.status, "degraded");
    }
}
