//! Domain layer.
//!
//! Core types for instruments, subscriptions, and ticker snapshots.
//! No transport or serialization-framework specifics beyond serde derives.

/// Instrument catalog and display names.
pub mod instrument;

/// Subscription tracking and connection lifecycle states.
pub mod subscription;

/// Ticker snapshot and update types.
pub mod ticker;
