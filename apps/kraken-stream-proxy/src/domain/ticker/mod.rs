//! Ticker Snapshot Types
//!
//! The normalized representation of one instrument's latest price state.
//! All price math uses `rust_decimal::Decimal`; floats never touch money.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Provenance
// =============================================================================

/// Where a price snapshot came from.
///
/// Synthetic data is generated locally when no live subscription exists,
/// purely so downstream consumers have something to render. Consumers can
/// filter on this flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Decoded from a live exchange ticker frame.
    Exchange,
    /// Generated locally as placeholder data.
    Synthetic,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Latest known price state for one instrument.
///
/// `last_price` is always present; ask, bid, and 24h volume are
/// independently optional because the exchange may omit any of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    /// Exchange wire-format pair identifier, e.g. `"XBT/USD"`.
    pub symbol: String,
    /// Human-readable name, e.g. `"Bitcoin"`.
    pub display_name: String,
    /// Last trade price.
    pub last_price: Decimal,
    /// Best ask price, if known.
    pub ask_price: Option<Decimal>,
    /// Best bid price, if known.
    pub bid_price: Option<Decimal>,
    /// Rolling 24-hour volume, if known.
    pub volume_24h: Option<Decimal>,
    /// Wall-clock time the update was applied.
    pub observed_at: DateTime<Utc>,
    /// Provenance of the data.
    pub source: PriceSource,
}

// =============================================================================
// Update
// =============================================================================

/// One inbound price update, before it is merged into the price store.
#[derive(Debug, Clone)]
pub struct TickerUpdate {
    /// Pair identifier the update applies to.
    pub symbol: String,
    /// Last trade price.
    pub last_price: Decimal,
    /// Best ask price, if present in the frame.
    pub ask_price: Option<Decimal>,
    /// Best bid price, if present in the frame.
    pub bid_price: Option<Decimal>,
    /// Rolling 24-hour volume, if present in the frame.
    pub volume_24h: Option<Decimal>,
    /// Wall-clock time the update was observed.
    pub observed_at: DateTime<Utc>,
    /// Provenance of the data.
    pub source: PriceSource,
}

impl TickerUpdate {
    /// Create an update sourced from a decoded exchange frame.
    #[must_use]
    pub fn exchange(
        symbol: impl Into<String>,
        last_price: Decimal,
        ask_price: Option<Decimal>,
        bid_price: Option<Decimal>,
        volume_24h: Option<Decimal>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            last_price,
            ask_price,
            bid_price,
            volume_24h,
            observed_at,
            source: PriceSource::Exchange,
        }
    }

    /// Create a locally generated placeholder update.
    #[must_use]
    pub fn synthetic(
        symbol: impl Into<String>,
        last_price: Decimal,
        ask_price: Decimal,
        bid_price: Decimal,
        volume_24h: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            last_price,
            ask_price: Some(ask_price),
            bid_price: Some(bid_price),
            volume_24h: Some(volume_24h),
            observed_at,
            source: PriceSource::Synthetic,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
