//! Proxy Configuration Settings
//!
//! Configuration types for the stream proxy, loaded from environment
//! variables. Kraken's public ticker feed needs no credentials.

use std::time::Duration;

/// Default Kraken public WebSocket endpoint.
const DEFAULT_WS_URL: &str = "wss://ws.kraken.com";

/// Default Kraken REST base URL. Unused by the streaming path; reserved
/// for a future live top-pairs query.
const DEFAULT_REST_URL: &str = "https://api.kraken.com/0";

/// Exchange connection settings.
#[derive(Debug, Clone)]
pub struct KrakenSettings {
    /// WebSocket endpoint for the ticker stream.
    pub ws_url: String,
    /// REST base URL (reserved).
    pub rest_url: String,
    /// Fixed delay before a scheduled reconnect attempt.
    pub reconnect_delay: Duration,
    /// Settling delay between handshake and the first subscribe request.
    pub settle_delay: Duration,
    /// Number of curated pairs to track.
    pub tracked_pair_count: usize,
    /// Interval between catalog refreshes.
    pub catalog_refresh_interval: Duration,
    /// Interval between subscription reconciliation passes.
    pub reconcile_interval: Duration,
}

impl Default for KrakenSettings {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            rest_url: DEFAULT_REST_URL.to_string(),
            reconnect_delay: Duration::from_millis(5000),
            settle_delay: Duration::from_millis(2000),
            tracked_pair_count: 20,
            catalog_refresh_interval: Duration::from_secs(1800),
            reconcile_interval: Duration::from_secs(60),
        }
    }
}

/// Broadcast channel settings.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Capacity of the price-update broadcast channel.
    pub price_updates_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            price_updates_capacity: 10_000,
        }
    }
}

/// Complete proxy configuration.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Exchange connection settings.
    pub kraken: KrakenSettings,
    /// Broadcast channel settings.
    pub broadcast: BroadcastSettings,
}

impl ProxyConfig {
    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL variable is set to an empty string.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = KrakenSettings::default();

        let ws_url = parse_env_string("KRAKEN_WS_URL", &defaults.ws_url);
        if ws_url.is_empty() {
            return Err(ConfigError::EmptyValue("KRAKEN_WS_URL".to_string()));
        }

        let rest_url = parse_env_string("KRAKEN_REST_URL", &defaults.rest_url);
        if rest_url.is_empty() {
            return Err(ConfigError::EmptyValue("KRAKEN_REST_URL".to_string()));
        }

        let kraken = KrakenSettings {
            ws_url,
            rest_url,
            reconnect_delay: parse_env_duration_millis(
                "KRAKEN_RECONNECT_DELAY_MS",
                defaults.reconnect_delay,
            ),
            settle_delay: parse_env_duration_millis(
                "KRAKEN_SETTLE_DELAY_MS",
                defaults.settle_delay,
            ),
            tracked_pair_count: parse_env_usize(
                "KRAKEN_TRACKED_PAIR_COUNT",
                defaults.tracked_pair_count,
            ),
            catalog_refresh_interval: parse_env_duration_secs(
                "KRAKEN_CATALOG_REFRESH_SECS",
                defaults.catalog_refresh_interval,
            ),
            reconcile_interval: parse_env_duration_secs(
                "KRAKEN_RECONCILE_INTERVAL_SECS",
                defaults.reconcile_interval,
            ),
        };

        let broadcast = BroadcastSettings {
            price_updates_capacity: parse_env_usize(
                "STREAM_PROXY_PRICE_UPDATES_CAPACITY",
                BroadcastSettings::default().price_updates_capacity,
            ),
        };

        Ok(Self { kraken, broadcast })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has an empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
