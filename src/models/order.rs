//! Order Record
//!
//! The domain entity mirrored by the cache. Orders are immutable once created:
//! they are inserted and read, never updated.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{CacheError, Result};
use crate::models::requests::MAX_ID_LENGTH;

/// Width of the `VARCHAR(255)` columns
const TEXT_COLUMN_WIDTH: usize = 255;
/// Width of the `VARCHAR(10)` columns
const SHORT_COLUMN_WIDTH: usize = 10;

/// Column list shared by every query that selects a full order row.
///
/// Sub-documents live in JSON columns and are read back as text so they stay opaque.
pub const ORDER_COLUMNS: &str = "order_uid, track_number, entry, delivery::text AS delivery, \
    payment::text AS payment, items::text AS items, locale, internal_signature, customer_id, \
    delivery_service, shardkey, sm_id, date_created, oof_shard";

// == Order ==
/// A single order record.
///
/// `delivery`, `payment` and `items` are serialized JSON documents carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    /// Globally unique order identifier
    #[serde(rename = "order_uid")]
    #[sqlx(rename = "order_uid")]
    pub id: String,
    pub track_number: String,
    pub entry: String,
    /// Serialized delivery sub-document
    pub delivery: String,
    /// Serialized payment sub-document
    pub payment: String,
    /// Serialized item list
    pub items: String,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    #[serde(rename = "shardkey")]
    #[sqlx(rename = "shardkey")]
    pub shard_key: String,
    pub sm_id: i32,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

impl Order {
    // == Decode ==
    /// Decodes a serialized order and checks that it is well-formed.
    ///
    /// Fails with `MalformedInput` when the payload is not a complete order,
    /// the id is blank, or a sub-document is not valid JSON.
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        let mut order: Order = serde_json::from_slice(payload)
            .map_err(|e| CacheError::MalformedInput(e.to_string()))?;
        order.validate()?;
        order.normalize();
        Ok(order)
    }

    // == Normalize ==
    /// Truncates `date_created` to the microsecond precision the store keeps,
    /// so the cached copy compares equal to the persisted row.
    pub fn normalize(&mut self) {
        self.date_created = self.date_created.trunc_subsecs(6);
    }

    // == Validate ==
    /// Checks the invariants the store relies on.
    ///
    /// Text fields must fit their columns and carry no NUL bytes. The id must
    /// equal its trimmed form, since lookups trim the requested id.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CacheError::MalformedInput(
                "order_uid cannot be empty".to_string(),
            ));
        }
        if self.id.trim() != self.id {
            return Err(CacheError::MalformedInput(
                "order_uid cannot start or end with whitespace".to_string(),
            ));
        }
        if self.id.len() > MAX_ID_LENGTH {
            return Err(CacheError::MalformedInput(format!(
                "order_uid exceeds maximum length of {} bytes",
                MAX_ID_LENGTH
            )));
        }

        for (name, value, limit) in self.text_columns() {
            if value.contains('\0') {
                return Err(CacheError::MalformedInput(format!(
                    "{} contains a NUL byte",
                    name
                )));
            }
            if let Some(limit) = limit {
                if value.chars().count() > limit {
                    return Err(CacheError::MalformedInput(format!(
                        "{} exceeds maximum length of {} characters",
                        name, limit
                    )));
                }
            }
        }

        for (name, blob) in [
            ("delivery", &self.delivery),
            ("payment", &self.payment),
            ("items", &self.items),
        ] {
            if serde_json::from_str::<serde::de::IgnoredAny>(blob).is_err() {
                return Err(CacheError::MalformedInput(format!(
                    "{} is not a valid JSON document",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Every text field with its column width; sub-documents are unbounded.
    fn text_columns(&self) -> [(&'static str, &str, Option<usize>); 12] {
        [
            ("order_uid", &self.id, Some(TEXT_COLUMN_WIDTH)),
            ("track_number", &self.track_number, Some(TEXT_COLUMN_WIDTH)),
            ("entry", &self.entry, Some(TEXT_COLUMN_WIDTH)),
            ("delivery", &self.delivery, None),
            ("payment", &self.payment, None),
            ("items", &self.items, None),
            ("locale", &self.locale, Some(SHORT_COLUMN_WIDTH)),
            ("internal_signature", &self.internal_signature, Some(TEXT_COLUMN_WIDTH)),
            ("customer_id", &self.customer_id, Some(TEXT_COLUMN_WIDTH)),
            ("delivery_service", &self.delivery_service, Some(TEXT_COLUMN_WIDTH)),
            ("shardkey", &self.shard_key, Some(SHORT_COLUMN_WIDTH)),
            ("oof_shard", &self.oof_shard, Some(SHORT_COLUMN_WIDTH)),
        ]
    }
}
