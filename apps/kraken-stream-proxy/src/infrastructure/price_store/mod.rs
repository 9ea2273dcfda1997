//! Price Store
//!
//! Concurrent map of symbol to latest ticker snapshot, with fan-out to the
//! broadcast gateway on every update.
//!
//! # Concurrency
//!
//! Entries are replaced whole under a `parking_lot::RwLock`, so readers
//! never observe a partially written snapshot. Publishing happens after
//! the lock is released; `list` copies out under the read lock and never
//! blocks writers beyond that short critical section.
//!
//! # Conflict policy
//!
//! Last-write-wins: an update always overwrites, with no ordering guard on
//! `observed_at`. Stale snapshots remain queryable; nothing is deleted
//! during normal operation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::application::ports::BroadcastGateway;
use crate::domain::instrument::InstrumentCatalog;
use crate::domain::ticker::{TickerSnapshot, TickerUpdate};

/// Aggregate topic carrying the full snapshot list.
pub const ALL_PRICES_TOPIC: &str = "topic/prices";

/// Per-symbol topic for one instrument's updates.
#[must_use]
pub fn symbol_topic(symbol: &str) -> String {
    format!("{ALL_PRICES_TOPIC}/{symbol}")
}

/// Concurrent store of the latest known price per instrument.
pub struct PriceStore {
    catalog: Arc<InstrumentCatalog>,
    gateway: Arc<dyn BroadcastGateway>,
    prices: RwLock<HashMap<String, TickerSnapshot>>,
}

impl PriceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(catalog: Arc<InstrumentCatalog>, gateway: Arc<dyn BroadcastGateway>) -> Self {
        Self {
            catalog,
            gateway,
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Apply an update, creating the snapshot on first sight of the
    /// symbol, and publish the result.
    ///
    /// The updated snapshot goes out on the per-symbol topic. The full
    /// list is additionally republished on [`ALL_PRICES_TOPIC`] while the
    /// store is small (at most 5 symbols) or whenever the symbol count is
    /// an exact multiple of 5, keeping early bootstrap responsive without
    /// flooding once scale grows.
    pub fn update(&self, update: TickerUpdate) -> TickerSnapshot {
        let display_name = self.catalog.name_for(&update.symbol);

        let (snapshot, full_list) = {
            let mut prices = self.prices.write();
            let snapshot = TickerSnapshot {
                symbol: update.symbol.clone(),
                display_name,
                last_price: update.last_price,
                ask_price: update.ask_price,
                bid_price: update.bid_price,
                volume_24h: update.volume_24h,
                observed_at: update.observed_at,
                source: update.source,
            };
            prices.insert(update.symbol, snapshot.clone());

            let tracked = prices.len();
            let full_list = (tracked <= 5 || tracked.is_multiple_of(5))
                .then(|| prices.values().cloned().collect::<Vec<_>>());
            (snapshot, full_list)
        };

        tracing::debug!(
            symbol = %snapshot.symbol,
            price = %snapshot.last_price,
            source = ?snapshot.source,
            "Price updated"
        );

        match serde_json::to_value(&snapshot) {
            Ok(payload) => self.gateway.publish(&symbol_topic(&snapshot.symbol), payload),
            Err(e) => tracing::error!(error = %e, "Failed to serialize snapshot"),
        }

        if let Some(all) = full_list {
            match serde_json::to_value(&all) {
                Ok(payload) => {
                    tracing::debug!(count = all.len(), "Republishing full price list");
                    self.gateway.publish(ALL_PRICES_TOPIC, payload);
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize price list"),
            }
        }

        snapshot
    }

    /// Latest snapshot for a symbol. `None` means unknown, never a
    /// synthetic zero; the caller decides how to react.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<TickerSnapshot> {
        self.prices.read().get(symbol).cloned()
    }

    /// All currently known snapshots, unordered.
    #[must_use]
    pub fn list(&self) -> Vec<TickerSnapshot> {
        self.prices.read().values().cloned().collect()
    }

    /// Number of distinct symbols ever updated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.read().len()
    }

    /// Whether the store has seen no updates yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::application::ports::MockBroadcastGateway;
    use crate::domain::ticker::PriceSource;

    fn update(symbol: &str, price: i64) -> TickerUpdate {
        TickerUpdate::exchange(
            symbol,
            Decimal::new(price, 1),
            None,
            None,
            None,
            Utc::now(),
        )
    }

    fn store_with_silent_gateway() -> PriceStore {
        let mut gateway = MockBroadcastGateway::new();
        gateway.expect_publish().return_const(());
        PriceStore::new(
            Arc::new(InstrumentCatalog::new(20)),
            Arc::new(gateway),
        )
    }

    #[test]
    fn update_creates_then_overwrites() {
        let store = store_with_silent_gateway();

        store.update(update("XBT/USD", 500_001));
        let first = store.get("XBT/USD").unwrap();
        assert_eq!(first.last_price, Decimal::new(500_001, 1));
        assert_eq!(first.display_name, "Bitcoin");

        store.update(update("XBT/USD", 510_000));
        let second = store.get("XBT/USD").unwrap();
        assert_eq!(second.last_price, Decimal::new(510_000, 1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn stale_timestamp_still_overwrites() {
        let store = store_with_silent_gateway();
        let newer = Utc::now();
        let older = newer - chrono::Duration::minutes(5);

        store.update(TickerUpdate::exchange(
            "XBT/USD",
            Decimal::new(1, 0),
            None,
            None,
            None,
            newer,
        ));
        store.update(TickerUpdate::exchange(
            "XBT/USD",
            Decimal::new(2, 0),
            None,
            None,
            None,
            older,
        ));

        let snapshot = store.get("XBT/USD").unwrap();
        assert_eq!(snapshot.last_price, Decimal::new(2, 0));
        assert_eq!(snapshot.observed_at, older);
    }

    #[test]
    fn get_unknown_symbol_is_none() {
        let store = store_with_silent_gateway();
        assert!(store.get("NOPE/USD").is_none());
    }

    #[test]
    fn list_counts_distinct_symbols() {
        let store = store_with_silent_gateway();
        store.update(update("XBT/USD", 1));
        store.update(update("ETH/USD", 2));
        store.update(update("XBT/USD", 3));
        assert_eq!(store.list().len(), 2);
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }

    #[test]
    fn update_publishes_on_symbol_topic() {
        let mut gateway = MockBroadcastGateway::new();
        gateway
            .expect_publish()
            .with(
                predicate::eq("topic/prices/XBT/USD"),
                predicate::always(),
            )
            .times(1)
            .return_const(());
        // Store size 1 <= 5, so the full list goes out too.
        gateway
            .expect_publish()
            .with(predicate::eq(ALL_PRICES_TOPIC), predicate::always())
            .times(1)
            .return_const(());

        let store = PriceStore::new(
            Arc::new(InstrumentCatalog::new(20)),
            Arc::new(gateway),
        );
        store.update(update("XBT/USD", 500_001));
    }

    #[test]
    fn full_list_republish_follows_heuristic() {
        // 7 distinct symbols: the aggregate topic fires for sizes
        // 1..=5 and again at every multiple of 5, but not at 6 or 7.
        let mut gateway = MockBroadcastGateway::new();
        gateway
            .expect_publish()
            .withf(|topic, _| topic != ALL_PRICES_TOPIC)
            .times(7)
            .return_const(());
        gateway
            .expect_publish()
            .with(predicate::eq(ALL_PRICES_TOPIC), predicate::always())
            .times(5)
            .return_const(());

        let store = PriceStore::new(
            Arc::new(InstrumentCatalog::new(20)),
            Arc::new(gateway),
        );
        for (i, symbol) in ["A/USD", "B/USD", "C/USD", "D/USD", "E/USD", "F/USD", "G/USD"]
            .iter()
            .enumerate()
        {
            store.update(update(symbol, i64::try_from(i).unwrap() + 1));
        }
    }

    #[test]
    fn synthetic_source_is_preserved() {
        let store = store_with_silent_gateway();
        store.update(TickerUpdate::synthetic(
            "XBT/USD",
            Decimal::new(100, 0),
            Decimal::new(101, 0),
            Decimal::new(99, 0),
            Decimal::new(1000, 0),
            Utc::now(),
        ));
        assert_eq!(
            store.get("XBT/USD").unwrap().source,
            PriceSource::Synthetic
        );
    }
}
