//! Port Interfaces
//!
//! Contracts between the core and its external collaborators, following
//! the Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`MarketStream`]: capability interface over the exchange streaming
//!   connection; the Kraken WebSocket client is the production variant and
//!   tests may substitute a mock transport.
//! - [`BroadcastGateway`]: fire-and-forget push used to deliver price
//!   updates to remote subscribers. The outward pub/sub transport itself
//!   lives outside this service.

use async_trait::async_trait;

/// Capability interface over the exchange streaming connection.
///
/// All operations are infallible from the caller's perspective: transport
/// and state errors are logged and handled internally (scheduled
/// reconnects, silent no-ops) so that the fan-out pipeline stays up.
#[async_trait]
pub trait MarketStream: Send + Sync {
    /// Open the connection. Idempotent: a no-op while already connecting
    /// or connected.
    async fn connect(&self);

    /// Close the connection locally. Idempotent; no reconnect follows.
    async fn disconnect(&self);

    /// Subscribe to ticker updates for the given pairs, deduplicated
    /// against the live subscription set. No-op when not connected.
    async fn subscribe_to_pairs(&self, pairs: &[String]);

    /// Unsubscribe from the given pairs, filtered to those actually
    /// subscribed. No-op when not connected.
    async fn unsubscribe_from_pairs(&self, pairs: &[String]);

    /// Whether the connection is currently usable.
    fn is_connected(&self) -> bool;
}

/// Fire-and-forget publish to all subscribers of a topic.
#[cfg_attr(test, mockall::automock)]
pub trait BroadcastGateway: Send + Sync {
    /// Push `payload` to every subscriber of `topic`. Delivery is
    /// best-effort; implementations must not block the caller on slow
    /// consumers.
    fn publish(&self, topic: &str, payload: serde_json::Value);
}
