//! Per-tick venue books
//!
//! Holds the normalized snapshot of every venue for the current cycle.

use std::collections::HashMap;
use tracing::debug;

use super::{OrderbookSnapshot, RawSnapshot};

/// Result of offering a raw snapshot to a [`BookSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Snapshot replaced the venue's previous book
    Applied,
    /// Sequence did not advance past the book already held; ignored
    Stale,
}

/// Normalized books keyed by venue id
#[derive(Debug, Default)]
pub struct BookSet {
    books: HashMap<String, OrderbookSnapshot>,
}

impl BookSet {
    /// Create an empty book set
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a raw snapshot and replace the venue's book with it
    pub fn ingest(&mut self, raw: &RawSnapshot) -> IngestOutcome {
        if let Some(current) = self.books.get(&raw.venue) {
            // Check if this snapshot is relevant (not stale)
            if raw.sequence <= current.sequence() {
                debug!(
                    venue = %raw.venue,
                    held = current.sequence(),
                    got = raw.sequence,
                    "Stale snapshot, skipping"
                );
                return IngestOutcome::Stale;
            }
        }

        let snapshot = OrderbookSnapshot::normalize(raw);
        self.books.insert(raw.venue.clone(), snapshot);
        IngestOutcome::Applied
    }

    /// Drop every book, e.g. when the symbol or venue selection changes
    pub fn clear(&mut self) {
        self.books.clear();
    }

    /// Drop the books of venues not in `keep`
    pub fn retain_venues(&mut self, keep: &[&str]) {
        self.books.retain(|venue, _| keep.contains(&venue.as_str()));
    }

    /// Borrow the venue → snapshot map for one computation
    pub fn books(&self) -> &HashMap<String, OrderbookSnapshot> {
        &self.books
    }

    /// Get the book of a specific venue
    pub fn get(&self, venue: &str) -> Option<&OrderbookSnapshot> {
        self.books.get(venue)
    }

    /// Get the last sequence number for a venue
    pub fn last_sequence(&self, venue: &str) -> Option<u64> {
        self.books.get(venue).map(|book| book.sequence())
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::PriceLevel;
    use rust_decimal_macros::dec;

    fn raw(venue: &str, sequence: u64, bid: rust_decimal::Decimal) -> RawSnapshot {
        RawSnapshot {
            venue: venue.to_string(),
            symbol: "BTCUSDT".to_string(),
            bids: vec![PriceLevel::new(bid, dec!(1))],
            asks: vec![PriceLevel::new(bid + dec!(1), dec!(1))],
            timestamp: 1000,
            sequence,
        }
    }

    #[test]
    fn test_replaces_wholesale() {
        let mut set = BookSet::new();
        assert_eq!(set.ingest(&raw("binance", 1, dec!(100))), IngestOutcome::Applied);
        assert_eq!(set.ingest(&raw("binance", 2, dec!(200))), IngestOutcome::Applied);

        let book = set.get("binance").unwrap();
        assert_eq!(book.best_bid(), Some(dec!(200)));
        assert_eq!(book.bids().len(), 1);
        assert_eq!(set.last_sequence("binance"), Some(2));
    }

    #[test]
    fn test_rejects_stale_sequence() {
        let mut set = BookSet::new();
        set.ingest(&raw("okx", 5, dec!(100)));

        assert_eq!(set.ingest(&raw("okx", 5, dec!(150))), IngestOutcome::Stale);
        assert_eq!(set.ingest(&raw("okx", 4, dec!(150))), IngestOutcome::Stale);
        assert_eq!(set.get("okx").unwrap().best_bid(), Some(dec!(100)));
    }

    #[test]
    fn test_clear_and_retain() {
        let mut set = BookSet::new();
        set.ingest(&raw("binance", 1, dec!(100)));
        set.ingest(&raw("okx", 1, dec!(100)));
        set.ingest(&raw("bybit", 1, dec!(100)));

        set.retain_venues(&["okx"]);
        assert_eq!(set.len(), 1);
        assert!(set.get("okx").is_some());

        set.clear();
        assert!(set.is_empty());
        // After a reset any sequence is accepted again
        assert_eq!(set.ingest(&raw("okx", 1, dec!(100))), IngestOutcome::Applied);
    }
}
