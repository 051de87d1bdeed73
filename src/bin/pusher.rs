//! Order Pusher - publishes random orders to the ingestion subject
//!
//! Demo and load tooling; not part of the service.

use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_cache::generator::random_order_json;
use order_cache::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_pusher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let interval = Duration::from_secs(config.push_interval.max(1));

    let client = async_nats::connect(config.nats_url.as_str())
        .await
        .context("connecting to NATS")?;
    info!(
        "Publishing an order to '{}' every {}s",
        config.nats_subject,
        interval.as_secs()
    );

    loop {
        let payload = random_order_json();
        client
            .publish(config.nats_subject.clone(), payload.clone().into())
            .await
            .context("publishing order")?;
        info!("Order published");
        debug!("{}", payload);

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                break;
            }
        }
    }

    client.flush().await.context("flushing NATS client")?;
    Ok(())
}
