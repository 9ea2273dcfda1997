//! Configuration loading.

mod settings;

pub use settings::{BroadcastSettings, ConfigError, KrakenSettings, ProxyConfig};
