//! Order Cache - a store-backed in-memory mirror of the orders table
//!
//! Consumes orders from NATS, persists them to Postgres and serves point
//! lookups over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_cache::api::create_router;
use order_cache::store::PgOrderStore;
use order_cache::{spawn_ingestion_task, spawn_reconnect_task, AppState, CacheManager, Config};

/// Main entry point for the order cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to Postgres and warm the cache (fatal on failure)
/// 4. Subscribe to the ingestion subject and start the consumer task
/// 5. Start the background reconnect task
/// 6. Serve the lookup API until SIGINT/SIGTERM
/// 7. Stop background tasks and release the store connection
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Order Cache Service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: subject={}, port={}, store_timeout={}ms",
        config.nats_subject, config.server_port, config.store_timeout_ms
    );
    info!(
        "Resync on reconnect: {}, ingest concurrency: {}",
        config.resync_on_reconnect, config.ingest_concurrency
    );

    // No cache can exist without its store
    let store = PgOrderStore::new(&config.database_url, config.store_timeout())
        .context("invalid DATABASE_URL")?;
    let cache = Arc::new(CacheManager::new(
        Arc::new(store),
        config.resync_on_reconnect,
    ));
    cache
        .initialize()
        .await
        .context("initial store connection failed")?;

    let nats = async_nats::connect(config.nats_url.as_str())
        .await
        .context("connecting to NATS")?;
    let subscriber = nats
        .subscribe(config.nats_subject.clone())
        .await
        .context("subscribing to ingestion subject")?;
    info!("Subscribed to NATS subject '{}'", config.nats_subject);

    let ingest_handle = spawn_ingestion_task(
        cache.clone(),
        subscriber.map(|message| message.payload),
        config.ingest_concurrency,
    );
    let reconnect_handle = spawn_reconnect_task(cache.clone(), config.reconnect_interval);

    let app = create_router(AppState::new(cache.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    ingest_handle.abort();
    reconnect_handle.abort();
    cache.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
