//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Broadcast channel adapter for price fan-out.
pub mod broadcast;

/// Configuration loading from the environment.
pub mod config;

/// Kraken WebSocket client adapters.
pub mod kraken;

/// Concurrent store of latest ticker snapshots.
pub mod price_store;

/// Tracing subscriber setup.
pub mod telemetry;
