//! Application layer.
//!
//! Port definitions that the infrastructure adapters implement.

/// Port interfaces for the streaming transport and outward fan-out.
pub mod ports;
