//! Broadcast Channel Adapter
//!
//! Implements [`BroadcastGateway`] on a tokio broadcast channel for
//! efficient fan-out of price updates to multiple subscribers.
//!
//! Every published message carries its topic, so a single channel serves
//! both the per-symbol topics and the aggregate all-prices topic;
//! receivers filter on the topic they care about.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::application::ports::BroadcastGateway;
use crate::infrastructure::config::BroadcastSettings;

// =============================================================================
// Messages
// =============================================================================

/// A price update addressed to one topic.
#[derive(Debug, Clone)]
pub struct PriceBroadcast {
    /// Topic the payload belongs to.
    pub topic: String,
    /// JSON payload: a snapshot on per-symbol topics, a snapshot list on
    /// the aggregate topic.
    pub payload: serde_json::Value,
}

// =============================================================================
// Broadcast Hub
// =============================================================================

/// Configuration for broadcast channel capacity.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastConfig {
    /// Capacity of the price-update channel.
    pub price_updates_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            price_updates_capacity: 10_000,
        }
    }
}

impl From<BroadcastSettings> for BroadcastConfig {
    fn from(settings: BroadcastSettings) -> Self {
        Self {
            price_updates_capacity: settings.price_updates_capacity,
        }
    }
}

/// Central hub for price-update fan-out.
///
/// Supports any number of receivers; a send with no receivers is a no-op,
/// and slow receivers lag rather than block the publisher.
#[derive(Debug)]
pub struct BroadcastHub {
    price_updates_tx: broadcast::Sender<PriceBroadcast>,
}

impl BroadcastHub {
    /// Create a new hub with the given configuration.
    #[must_use]
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            price_updates_tx: broadcast::channel(config.price_updates_capacity).0,
        }
    }

    /// Create a new hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BroadcastConfig::default())
    }

    /// Get a new receiver for price updates.
    #[must_use]
    pub fn price_updates_rx(&self) -> broadcast::Receiver<PriceBroadcast> {
        self.price_updates_tx.subscribe()
    }

    /// Number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.price_updates_tx.receiver_count()
    }

    /// Channel statistics.
    #[must_use]
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            price_updates_receivers: self.receiver_count(),
        }
    }
}

impl BroadcastGateway for BroadcastHub {
    fn publish(&self, topic: &str, payload: serde_json::Value) {
        let message = PriceBroadcast {
            topic: topic.to_string(),
            payload,
        };
        if self.price_updates_tx.send(message).is_err() {
            tracing::trace!(topic, "No active receivers for broadcast");
        }
    }
}

/// Shared broadcast hub reference.
pub type SharedBroadcastHub = Arc<BroadcastHub>;

/// Statistics about broadcast channels.
#[derive(Debug, Clone, Default)]
pub struct BroadcastStats {
    /// Number of active price-update receivers.
    pub price_updates_receivers: usize,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn hub_starts_with_no_receivers() {
        let hub = BroadcastHub::with_defaults();
        assert_eq!(hub.receiver_count(), 0);
    }

    #[test]
    fn receiver_count_tracks_subscriptions() {
        let hub = BroadcastHub::with_defaults();

        let rx1 = hub.price_updates_rx();
        assert_eq!(hub.receiver_count(), 1);

        {
            let _rx2 = hub.price_updates_rx();
            assert_eq!(hub.receiver_count(), 2);
        }

        drop(rx1);
        assert_eq!(hub.receiver_count(), 0);
    }

    #[tokio::test]
    async fn publish_reaches_all_receivers() {
        let hub = BroadcastHub::with_defaults();
        let mut rx1 = hub.price_updates_rx();
        let mut rx2 = hub.price_updates_rx();

        hub.publish("topic/prices/XBT/USD", json!({"last_price": "50000.1"}));

        let m1 = rx1.recv().await.unwrap();
        let m2 = rx2.recv().await.unwrap();
        assert_eq!(m1.topic, "topic/prices/XBT/USD");
        assert_eq!(m1.payload["last_price"], "50000.1");
        assert_eq!(m2.topic, m1.topic);
    }

    #[test]
    fn publish_with_no_receivers_is_a_noop() {
        let hub = BroadcastHub::with_defaults();
        hub.publish("topic/prices", json!([]));
    }

    #[test]
    fn stats_reflect_receivers() {
        let hub = BroadcastHub::with_defaults();
        let _rx = hub.price_updates_rx();
        assert_eq!(hub.stats().price_updates_receivers, 1);
    }

    #[test]
    fn config_from_settings() {
        let settings = BroadcastSettings {
            price_updates_capacity: 128,
        };
        let config = BroadcastConfig::from(settings);
        assert_eq!(config.price_updates_capacity, 128);
    }
}
