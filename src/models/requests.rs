//! Request DTOs for the query API
//!
//! The lookup endpoint takes the raw order id as its request body.

use crate::error::{CacheError, Result};

/// Longest order id accepted by the lookup endpoint
pub const MAX_ID_LENGTH: usize = 255;

/// Order id extracted from a lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLookup {
    pub id: String,
}

impl OrderLookup {
    /// Parses a raw request body into an order id.
    ///
    /// Surrounding whitespace is ignored; the id must be non-empty and fit the
    /// `order_uid` column.
    pub fn from_body(body: &str) -> Result<Self> {
        let id = body.trim();
        if id.is_empty() {
            return Err(CacheError::MalformedInput(
                "Order id cannot be empty".to_string(),
            ));
        }
        if id.len() > MAX_ID_LENGTH {
            return Err(CacheError::MalformedInput(format!(
                "Order id exceeds maximum length of {} bytes",
                MAX_ID_LENGTH
            )));
        }
        Ok(Self { id: id.to_string() })
    }
}
