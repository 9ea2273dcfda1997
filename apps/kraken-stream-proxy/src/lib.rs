#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access
    )
)]

//! Kraken Stream Proxy - Market Ticker Fan-Out
//!
//! A proxy service that maintains a single connection to Kraken's public
//! ticker WebSocket, keeps the latest price snapshot per tracked pair, and
//! fans updates out to any number of downstream subscribers.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core types with no transport specifics
//!   - `instrument`: Tracked pair catalog and display names
//!   - `subscription`: Connection lifecycle and subscription set
//!   - `ticker`: Price snapshot and update types
//!
//! - **Application**: Port definitions
//!   - `ports`: Interfaces for the market stream and broadcast gateway
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `kraken`: WebSocket client, wire codec, synthetic fallback
//!   - `price_store`: Latest-snapshot map with publish-on-update
//!   - `broadcast`: Channel-based message distribution
//!   - `config`: Environment-driven configuration
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! Kraken WS ──► Codec ──► Price Store ──► Broadcast Hub ──► Subscriber 1
//!                              │                       └──► Subscriber N
//!                         Catalog (names)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core ticker types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::instrument::{Instrument, InstrumentCatalog};
pub use domain::subscription::{ConnectionState, SubscriptionSet};
pub use domain::ticker::{PriceSource, TickerSnapshot, TickerUpdate};

// Ports
pub use application::ports::{BroadcastGateway, MarketStream};

// Infrastructure config
pub use infrastructure::config::{BroadcastSettings, ConfigError, KrakenSettings, ProxyConfig};

// Broadcast hub (for integration tests)
pub use infrastructure::broadcast::{
    BroadcastConfig, BroadcastHub, BroadcastStats, PriceBroadcast, SharedBroadcastHub,
};

// Kraken adapters
pub use infrastructure::kraken::{KrakenClient, KrakenMessage, TickerWireCodec};

// Price store
pub use infrastructure::price_store::{ALL_PRICES_TOPIC, PriceStore, symbol_topic};
