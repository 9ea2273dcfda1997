//! Instrument Catalog
//!
//! Maintains the set of tracked pairs and their human-readable names.
//! The tracked set comes from a curated top-pairs list (the design permits
//! replacing this with a live top-N-by-volume query later) and is swapped
//! in atomically on refresh so readers never observe a partial list.

use parking_lot::RwLock;

// =============================================================================
// Curated pairs
// =============================================================================

/// Curated top pairs in Kraken's wsname format, with display names.
///
/// The WebSocket API requires the wsname form (e.g. `XBT/USD`, not
/// `BTC/USD`).
const CURATED_PAIRS: &[(&str, &str)] = &[
    ("XBT/USD", "Bitcoin"),
    ("ETH/USD", "Ethereum"),
    ("XRP/USD", "Ripple"),
    ("LTC/USD", "Litecoin"),
    ("BCH/USD", "Bitcoin Cash"),
    ("ADA/USD", "Cardano"),
    ("SOL/USD", "Solana"),
    ("DOT/USD", "Polkadot"),
    ("DOGE/USD", "Dogecoin"),
    ("AVAX/USD", "Avalanche"),
    ("MATIC/USD", "Polygon"),
    ("LINK/USD", "Chainlink"),
    ("UNI/USD", "Uniswap"),
    ("ATOM/USD", "Cosmos"),
    ("XLM/USD", "Stellar"),
    ("ALGO/USD", "Algorand"),
    ("FIL/USD", "Filecoin"),
    ("ETC/USD", "Ethereum Classic"),
    ("XTZ/USD", "Tezos"),
    ("AAVE/USD", "Aave"),
];

// =============================================================================
// Types
// =============================================================================

/// A tracked instrument. Identity is the symbol; copies are cheap and
/// immutable once handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    /// Exchange wire-format pair identifier, e.g. `"XBT/USD"`.
    pub symbol: String,
    /// Human-readable name, e.g. `"Bitcoin"`.
    pub display_name: String,
}

/// Thread-safe catalog of tracked instruments.
///
/// `refresh` rebuilds the tracked set and swaps it in under a single write
/// lock. It never fails; on any internal problem the previous list is
/// retained.
#[derive(Debug)]
pub struct InstrumentCatalog {
    tracked_count: usize,
    instruments: RwLock<Vec<Instrument>>,
}

impl InstrumentCatalog {
    /// Create a catalog tracking up to `tracked_count` pairs and populate
    /// it with an initial refresh.
    #[must_use]
    pub fn new(tracked_count: usize) -> Self {
        let catalog = Self {
            tracked_count,
            instruments: RwLock::new(Vec::new()),
        };
        catalog.refresh();
        catalog
    }

    /// Current tracked instruments, as an owned copy.
    #[must_use]
    pub fn list(&self) -> Vec<Instrument> {
        self.instruments.read().clone()
    }

    /// Rebuild the tracked set and atomically swap it in.
    ///
    /// Returns the new list. Infallible: with a curated source list there
    /// is nothing to go wrong, and a future live top-N query must degrade
    /// to retaining the previous list rather than erroring.
    pub fn refresh(&self) -> Vec<Instrument> {
        let next: Vec<Instrument> = CURATED_PAIRS
            .iter()
            .take(self.tracked_count)
            .map(|(symbol, name)| Instrument {
                symbol: (*symbol).to_string(),
                display_name: (*name).to_string(),
            })
            .collect();

        let mut instruments = self.instruments.write();
        *instruments = next.clone();
        tracing::info!(count = next.len(), "Refreshed tracked instrument list");
        next
    }

    /// Display name for a symbol.
    ///
    /// Falls back to a best-effort derivation from the symbol when no
    /// explicit mapping exists: strips Kraken's leading `X` asset prefix
    /// and the `ZUSD`/`USD` quote suffix. Unknown shapes return the symbol
    /// unchanged; this never fails and never returns an empty string.
    #[must_use]
    pub fn name_for(&self, symbol: &str) -> String {
        if let Some((_, name)) = CURATED_PAIRS.iter().find(|(s, _)| *s == symbol) {
            return (*name).to_string();
        }

        if symbol.to_uppercase().ends_with("USD") {
            let mut base = symbol;
            if let Some(stripped) = base.strip_prefix('X') {
                base = stripped;
            }
            if let Some(stripped) = base.strip_suffix("ZUSD") {
                base = stripped;
            } else if let Some(stripped) = base.strip_suffix("USD") {
                base = stripped;
            }
            let base = base.trim_end_matches('/');
            if !base.is_empty() {
                return base.to_string();
            }
        }

        symbol.to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
