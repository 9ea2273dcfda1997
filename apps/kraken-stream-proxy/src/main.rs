//! Kraken Stream Proxy Binary
//!
//! Starts the market ticker stream proxy.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin kraken-stream-proxy
//! ```
//!
//! # Environment Variables
//!
//! All optional; Kraken's public ticker feed needs no credentials.
//!
//! - `KRAKEN_WS_URL`: WebSocket endpoint (default: wss://ws.kraken.com)
//! - `KRAKEN_REST_URL`: REST base URL (default: <https://api.kraken.com/0>)
//! - `KRAKEN_RECONNECT_DELAY_MS`: Reconnect delay (default: 5000)
//! - `KRAKEN_SETTLE_DELAY_MS`: Post-handshake settling delay (default: 2000)
//! - `KRAKEN_TRACKED_PAIR_COUNT`: Pairs to track (default: 20)
//! - `KRAKEN_CATALOG_REFRESH_SECS`: Catalog refresh interval (default: 1800)
//! - `KRAKEN_RECONCILE_INTERVAL_SECS`: Reconciliation interval (default: 60)
//! - `STREAM_PROXY_PRICE_UPDATES_CAPACITY`: Broadcast capacity (default: 10000)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use kraken_stream_proxy::infrastructure::broadcast::{BroadcastConfig, BroadcastHub};
use kraken_stream_proxy::infrastructure::kraken::KrakenClient;
use kraken_stream_proxy::infrastructure::price_store::PriceStore;
use kraken_stream_proxy::infrastructure::telemetry;
use kraken_stream_proxy::{InstrumentCatalog, MarketStream, ProxyConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    telemetry::init();

    tracing::info!("Starting Kraken Stream Proxy");

    let config = ProxyConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Wire up the pipeline: catalog -> store -> broadcast hub.
    let broadcast_hub = Arc::new(BroadcastHub::new(BroadcastConfig::from(
        config.broadcast.clone(),
    )));
    let catalog = Arc::new(InstrumentCatalog::new(config.kraken.tracked_pair_count));
    let store = Arc::new(PriceStore::new(
        Arc::clone(&catalog),
        Arc::clone(&broadcast_hub) as Arc<dyn kraken_stream_proxy::BroadcastGateway>,
    ));

    let client = KrakenClient::new(
        config.kraken.clone(),
        Arc::clone(&catalog),
        Arc::clone(&store),
        shutdown_token.clone(),
    );

    // Open the exchange connection.
    let connect_client = Arc::clone(&client);
    tokio::spawn(async move {
        connect_client.connect().await;
    });

    // Periodic subscription reconciliation.
    let reconcile_client = Arc::clone(&client);
    let reconcile_shutdown = shutdown_token.clone();
    let reconcile_interval = config.kraken.reconcile_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(reconcile_interval);
        interval.tick().await;
        loop {
            tokio::select! {
                () = reconcile_shutdown.cancelled() => {
                    tracing::info!("Reconciliation loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    reconcile_client.reconcile_subscriptions().await;
                }
            }
        }
    });

    // Periodic catalog refresh.
    let refresh_catalog = Arc::clone(&catalog);
    let refresh_shutdown = shutdown_token.clone();
    let refresh_interval = config.kraken.catalog_refresh_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_interval);
        interval.tick().await;
        loop {
            tokio::select! {
                () = refresh_shutdown.cancelled() => {
                    tracing::info!("Catalog refresh loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    refresh_catalog.refresh();
                }
            }
        }
    });

    tracing::info!("Stream proxy ready");

    await_shutdown(shutdown_token).await;

    client.disconnect().await;

    tracing::info!("Stream proxy stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ProxyConfig) {
    tracing::info!(
        ws_url = %config.kraken.ws_url,
        tracked_pairs = config.kraken.tracked_pair_count,
        reconnect_delay_ms = config.kraken.reconnect_delay.as_millis(),
        settle_delay_ms = config.kraken.settle_delay.as_millis(),
        reconcile_interval_secs = config.kraken.reconcile_interval.as_secs(),
        catalog_refresh_secs = config.kraken.catalog_refresh_interval.as_secs(),
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
