//! Kraken WebSocket Adapters
//!
//! Implements the exchange-facing side of the proxy:
//!
//! - `codec`: pure translation between wire frames and typed messages
//! - `client`: connection lifecycle, subscriptions, and frame routing
//! - `fallback`: synthetic placeholder data when no live feed exists

pub mod client;
pub mod codec;
pub mod fallback;

pub use client::{KrakenClient, StreamClientError};
pub use codec::{
    CodecError, DecodeDiagnostic, KrakenMessage, TICKER_CHANNEL, TickerMessage, TickerWireCodec,
};
pub use fallback::{publish_synthetic, synthetic_updates};
