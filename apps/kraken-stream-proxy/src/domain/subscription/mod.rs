//! Subscription Tracking
//!
//! Domain types for the streaming client's connection lifecycle and the
//! set of pairs subscribed on the live connection.
//!
//! # Design
//!
//! `SubscriptionSet` is owned exclusively by the streaming client and is
//! only mutated inside the connection's exclusive section, which prevents
//! double-subscribe races between the reconnect path and the periodic
//! reconciliation path. The exchange does not remember subscriptions
//! across connections, so the set is cleared on every disconnect.

use std::collections::HashSet;

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of the exchange connection.
///
/// There is no terminal state; the client runs for the process lifetime
/// and always works its way back to `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport open.
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Transport open and usable.
    Connected,
    /// Remote peer closed the transport; teardown before a scheduled
    /// reconnect.
    ClosingForReconnect,
}

impl ConnectionState {
    /// Whether the connection is usable for sending requests.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// State name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ClosingForReconnect => "closing_for_reconnect",
        }
    }
}

// =============================================================================
// Subscription Set
// =============================================================================

/// Pairs currently subscribed on the live connection.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    symbols: HashSet<String>,
}

impl SubscriptionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs from `wanted` that are not yet subscribed, preserving input
    /// order. This is the dedup step before sending a subscribe request.
    #[must_use]
    pub fn missing_from(&self, wanted: &[String]) -> Vec<String> {
        wanted
            .iter()
            .filter(|s| !self.symbols.contains(*s))
            .cloned()
            .collect()
    }

    /// Pairs from `candidates` that are currently subscribed, preserving
    /// input order. This is the filter step before an unsubscribe request.
    #[must_use]
    pub fn known(&self, candidates: &[String]) -> Vec<String> {
        candidates
            .iter()
            .filter(|s| self.symbols.contains(*s))
            .cloned()
            .collect()
    }

    /// Record pairs as subscribed. Called only after the wire send
    /// succeeded.
    pub fn insert_all(&mut self, symbols: impl IntoIterator<Item = String>) {
        self.symbols.extend(symbols);
    }

    /// Remove pairs. Called only after the unsubscribe send succeeded.
    pub fn remove_all(&mut self, symbols: &[String]) {
        for symbol in symbols {
            self.symbols.remove(symbol);
        }
    }

    /// Forget everything. Called on every disconnect.
    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    /// Whether a pair is subscribed.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    /// Number of subscribed pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no pairs are subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Owned copy of the subscribed pairs, unordered.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.symbols.iter().cloned().collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn missing_from_dedups_subscribed_pairs() {
        let mut set = SubscriptionSet::new();
        set.insert_all(pairs(&["XBT/USD"]));

        let new = set.missing_from(&pairs(&["XBT/USD", "ETH/USD"]));
        assert_eq!(new, pairs(&["ETH/USD"]));
    }

    #[test]
    fn missing_from_all_subscribed_is_empty() {
        let mut set = SubscriptionSet::new();
        set.insert_all(pairs(&["XBT/USD", "ETH/USD"]));

        assert!(set.missing_from(&pairs(&["XBT/USD", "ETH/USD"])).is_empty());
    }

    #[test]
    fn known_filters_to_subscribed() {
        let mut set = SubscriptionSet::new();
        set.insert_all(pairs(&["XBT/USD"]));

        let known = set.known(&pairs(&["XBT/USD", "ETH/USD"]));
        assert_eq!(known, pairs(&["XBT/USD"]));
    }

    #[test]
    fn remove_all_only_removes_named() {
        let mut set = SubscriptionSet::new();
        set.insert_all(pairs(&["XBT/USD", "ETH/USD"]));
        set.remove_all(&pairs(&["XBT/USD"]));

        assert!(!set.contains("XBT/USD"));
        assert!(set.contains("ETH/USD"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn clear_empties_the_set() {
        let mut set = SubscriptionSet::new();
        set.insert_all(pairs(&["XBT/USD", "ETH/USD"]));
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn connection_state_predicates() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::ClosingForReconnect.is_connected());
        assert_eq!(ConnectionState::Connected.as_str(), "connected");
    }
}
