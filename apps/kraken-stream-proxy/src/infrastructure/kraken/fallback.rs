//! Synthetic Ticker Fallback
//!
//! Generates placeholder price data when no live subscription could be
//! established, so downstream consumers always have something to render.
//! Every update produced here is tagged [`PriceSource::Synthetic`] and is
//! indistinguishable from live data in shape only.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;

use crate::domain::ticker::TickerUpdate;
use crate::infrastructure::price_store::PriceStore;

#[cfg(test)]
use crate::domain::ticker::PriceSource;

/// Pairs covered by the synthetic fallback.
///
/// Mirrors the curated catalog so fallback data lines up with what a live
/// session would track.
const FALLBACK_PAIRS: &[&str] = &[
    "XBT/USD",
    "ETH/USD",
    "XRP/USD",
    "LTC/USD",
    "BCH/USD",
    "ADA/USD",
    "SOL/USD",
    "DOT/USD",
    "DOGE/USD",
    "AVAX/USD",
    "MATIC/USD",
    "LINK/USD",
    "UNI/USD",
    "ATOM/USD",
    "XLM/USD",
    "ALGO/USD",
    "FIL/USD",
    "ETC/USD",
    "XTZ/USD",
    "AAVE/USD",
];

/// One synthetic update per fallback pair.
///
/// Prices are drawn uniformly from 100.00 to 50000.00; ask and bid bracket
/// the price at plus and minus one percent, volume sits between 1000 and
/// 10000 units.
#[must_use]
pub fn synthetic_updates() -> Vec<TickerUpdate> {
    let mut rng = rand::rng();
    let now = Utc::now();

    FALLBACK_PAIRS
        .iter()
        .map(|pair| {
            // Draw in cents so the price lands on two decimal places.
            let price = Decimal::new(rng.random_range(10_000..=5_000_000), 2);
            let ask = (price * Decimal::new(101, 2)).round_dp(2);
            let bid = (price * Decimal::new(99, 2)).round_dp(2);
            let volume = Decimal::new(rng.random_range(100_000..=1_000_000), 2);
            TickerUpdate::synthetic(*pair, price, ask, bid, volume, now)
        })
        .collect()
}

/// Push one synthetic update per fallback pair through the store.
pub fn publish_synthetic(store: &PriceStore) {
    let updates = synthetic_updates();
    tracing::warn!(
        count = updates.len(),
        "No live subscriptions; publishing synthetic ticker data"
    );
    for update in updates {
        store.update(update);
    }
}

// =============================================================================
// Tests
// =============================================================================
