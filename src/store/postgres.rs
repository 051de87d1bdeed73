//! PostgreSQL Store
//!
//! Single long-lived `PgConnection` with per-call timeouts. The connection
//! lives behind an async mutex so `connect` can swap it in place.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{OrderStore, StoreError, StoreResult};
use crate::models::{Order, ORDER_COLUMNS};

const INSERT_ORDER: &str = r#"
    INSERT INTO orders (
        order_uid, track_number, entry, delivery, payment, items, locale,
        internal_signature, customer_id, delivery_service, shardkey, sm_id,
        date_created, oof_shard)
    VALUES ($1, $2, $3, $4::json, $5::json, $6::json, $7, $8, $9, $10, $11, $12, $13, $14)
"#;

// == Postgres Order Store ==
/// Order table backed by PostgreSQL.
pub struct PgOrderStore {
    /// Parsed connection options; the raw URL is never logged
    options: PgConnectOptions,
    /// Upper bound for every store call
    timeout: Duration,
    /// Current connection, `None` before `connect` and after `close`
    conn: Mutex<Option<PgConnection>>,
}

impl PgOrderStore {
    /// Creates an unconnected store from a `postgres://` URL.
    pub fn new(url: &str, timeout: Duration) -> StoreResult<Self> {
        let options = PgConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connection(format!("invalid database url: {}", e)))?;

        Ok(Self {
            options,
            timeout,
            conn: Mutex::new(None),
        })
    }

    /// Runs a store call under the configured timeout.
    async fn timed<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(map_sqlx_error),
            Err(_) => Err(StoreError::Query(format!(
                "store call timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

fn not_connected() -> StoreError {
    StoreError::Connection("store is not connected".to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn connect(&self) -> StoreResult<()> {
        let connecting = PgConnection::connect_with(&self.options);
        let fresh = match tokio::time::timeout(self.timeout, connecting).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(StoreError::Connection(e.to_string())),
            Err(_) => {
                return Err(StoreError::Connection(format!(
                    "connect timed out after {:?}",
                    self.timeout
                )))
            }
        };

        let previous = self.conn.lock().await.replace(fresh);
        if let Some(old) = previous {
            if let Err(e) = old.close().await {
                debug!("Closing replaced connection failed: {}", e);
            }
        }

        info!("Connected to order store");
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<Order>> {
        let sql = format!("SELECT {} FROM orders", ORDER_COLUMNS);

        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_connected)?;
        self.timed(sqlx::query_as::<_, Order>(&sql).fetch_all(&mut *conn))
            .await
    }

    async fn load_one(&self, id: &str) -> StoreResult<Order> {
        let sql = format!("SELECT {} FROM orders WHERE order_uid = $1", ORDER_COLUMNS);

        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_connected)?;
        self.timed(
            sqlx::query_as::<_, Order>(&sql)
                .bind(id)
                .fetch_optional(&mut *conn),
        )
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, order: &Order) -> StoreResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_connected)?;

        let query = sqlx::query(INSERT_ORDER)
            .bind(&order.id)
            .bind(&order.track_number)
            .bind(&order.entry)
            .bind(&order.delivery)
            .bind(&order.payment)
            .bind(&order.items)
            .bind(&order.locale)
            .bind(&order.internal_signature)
            .bind(&order.customer_id)
            .bind(&order.delivery_service)
            .bind(&order.shard_key)
            .bind(order.sm_id)
            .bind(order.date_created)
            .bind(&order.oof_shard);

        match tokio::time::timeout(self.timeout, query.execute(&mut *conn)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if is_unique_violation(&e) => {
                Err(StoreError::DuplicateKey(order.id.clone()))
            }
            Ok(Err(e)) => Err(map_sqlx_error(e)),
            Err(_) => Err(StoreError::Query(format!(
                "insert timed out after {:?}",
                self.timeout
            ))),
        }
    }

    async fn ping(&self) -> bool {
        let mut guard = self.conn.lock().await;
        match guard.as_mut() {
            Some(conn) => matches!(
                tokio::time::timeout(self.timeout, conn.ping()).await,
                Ok(Ok(()))
            ),
            None => false,
        }
    }

    async fn close(&self) {
        let taken = self.conn.lock().await.take();
        if let Some(conn) = taken {
            match conn.close().await {
                Ok(()) => info!("Order store connection closed"),
                Err(e) => warn!("Order store connection closed uncleanly: {}", e),
            }
        }
    }
}
