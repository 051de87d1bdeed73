//! Error types for the order cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
///
/// Every failure is reported once to the caller; the cache never retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Store transport is down
    #[error("Connection error: {0}")]
    Connection(String),

    /// Payload is not a well-formed order
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Order id already exists in the store
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Order not present in cache or store
    #[error("Order not found: {0}")]
    NotFound(String),

    /// Any other store-level fault, timeouts included
    #[error("Query error: {0}")]
    Query(String),
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(msg) => CacheError::Connection(msg),
            StoreError::NotFound(id) => CacheError::NotFound(id),
            StoreError::DuplicateKey(id) => CacheError::DuplicateKey(id),
            StoreError::Query(msg) => CacheError::Query(msg),
        }
    }
}

impl CacheError {
    /// HTTP status reported to query callers.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::DuplicateKey(_) => StatusCode::CONFLICT,
            CacheError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    /// Errors carry a status code and no body.
    fn into_response(self) -> Response {
        self.status_code().into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
