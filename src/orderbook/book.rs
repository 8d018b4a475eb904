//! Snapshot normalization
//!
//! Uses BTreeMap for sorted, deduplicated price level management.

use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{OrderbookSnapshot, PriceLevel, RawSnapshot};

impl OrderbookSnapshot {
    /// Normalize a raw snapshot.
    ///
    /// Levels are sorted (bids descending, asks ascending), duplicate prices
    /// are merged by summing their quantities, and levels with a non-positive
    /// price or a non-positive quantity are dropped. A level whose quantity
    /// would push its side's total volume past `Decimal::MAX` is dropped too,
    /// so sums over a normalized side never overflow. No truncation happens
    /// here; consumers take the top N themselves. A missing side stays an
    /// empty vector.
    pub fn normalize(raw: &RawSnapshot) -> Self {
        // Bids sorted by price descending (highest first)
        let mut bids: BTreeMap<Reverse<Decimal>, Decimal> = BTreeMap::new();
        // Asks sorted by price ascending (lowest first)
        let mut asks: BTreeMap<Decimal, Decimal> = BTreeMap::new();

        // Each merged quantity is bounded by its side total, so `+=` cannot overflow
        let mut bid_total = Decimal::ZERO;
        for level in raw.bids.iter().filter(|l| is_valid(&raw.venue, l)) {
            if fits_side_total(&raw.venue, &mut bid_total, level) {
                *bids.entry(Reverse(level.price)).or_insert(Decimal::ZERO) += level.quantity;
            }
        }

        let mut ask_total = Decimal::ZERO;
        for level in raw.asks.iter().filter(|l| is_valid(&raw.venue, l)) {
            if fits_side_total(&raw.venue, &mut ask_total, level) {
                *asks.entry(level.price).or_insert(Decimal::ZERO) += level.quantity;
            }
        }

        let snapshot = Self {
            venue: raw.venue.clone(),
            symbol: raw.symbol.clone(),
            bids: bids
                .into_iter()
                .map(|(Reverse(price), quantity)| PriceLevel { price, quantity })
                .collect(),
            asks: asks
                .into_iter()
                .map(|(price, quantity)| PriceLevel { price, quantity })
                .collect(),
            timestamp: raw.timestamp,
            sequence: raw.sequence,
        };

        if snapshot.is_crossed() {
            warn!(
                venue = %snapshot.venue,
                best_bid = ?snapshot.best_bid(),
                best_ask = ?snapshot.best_ask(),
                "Crossed book"
            );
        }

        snapshot
    }
}

fn is_valid(venue: &str, level: &PriceLevel) -> bool {
    let valid = level.price > Decimal::ZERO && level.quantity > Decimal::ZERO;
    if !valid {
        debug!(
            venue = %venue,
            price = %level.price,
            quantity = %level.quantity,
            "Dropping empty or malformed level"
        );
    }
    valid
}

/// Add the level to the running side total, or refuse it on overflow
fn fits_side_total(venue: &str, total: &mut Decimal, level: &PriceLevel) -> bool {
    match total.checked_add(level.quantity) {
        Some(sum) => {
            *total = sum;
            true
        }
        None => {
            warn!(
                venue = %venue,
                price = %level.price,
                quantity = %level.quantity,
                "Dropping level, side volume overflows"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::Side;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, quantity: Decimal) -> PriceLevel {
        PriceLevel { price, quantity }
    }

    fn raw(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> RawSnapshot {
        RawSnapshot {
            venue: "binance".to_string(),
            symbol: "BTCUSDT".to_string(),
            bids,
            asks,
            timestamp: 1_700_000_000_000,
            sequence: 7,
        }
    }

    #[test]
    fn test_sorts_both_sides() {
        let input = raw(
            vec![level(dec!(99), dec!(1)), level(dec!(101), dec!(2)), level(dec!(100), dec!(3))],
            vec![level(dec!(105), dec!(1)), level(dec!(103), dec!(2)), level(dec!(104), dec!(3))],
        );

        let book = OrderbookSnapshot::normalize(&input);

        let bid_prices: Vec<_> = book.bids().iter().map(|l| l.price).collect();
        let ask_prices: Vec<_> = book.asks().iter().map(|l| l.price).collect();
        assert_eq!(bid_prices, vec![dec!(101), dec!(100), dec!(99)]);
        assert_eq!(ask_prices, vec![dec!(103), dec!(104), dec!(105)]);
        assert_eq!(book.sequence(), 7);
        assert_eq!(book.venue(), "binance");
    }

    #[test]
    fn test_merges_duplicate_prices() {
        let input = raw(
            vec![level(dec!(100), dec!(1.5)), level(dec!(100), dec!(2))],
            vec![],
        );

        let book = OrderbookSnapshot::normalize(&input);

        assert_eq!(book.bids(), &[level(dec!(100), dec!(3.5))]);
    }

    #[test]
    fn test_drops_malformed_levels() {
        let input = raw(
            vec![level(dec!(0), dec!(1)), level(dec!(100), dec!(0)), level(dec!(99), dec!(-1))],
            vec![level(dec!(-5), dec!(1)), level(dec!(101), dec!(1))],
        );

        let book = OrderbookSnapshot::normalize(&input);

        assert!(book.bids().is_empty());
        assert_eq!(book.asks(), &[level(dec!(101), dec!(1))]);
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_input_is_untouched() {
        let input = raw(
            vec![level(dec!(99), dec!(1)), level(dec!(100), dec!(1))],
            vec![level(dec!(102), dec!(1)), level(dec!(101), dec!(1))],
        );
        let before = input.clone();

        let _ = OrderbookSnapshot::normalize(&input);

        assert_eq!(input, before);
    }

    #[test]
    fn test_drops_levels_that_overflow_side_volume() {
        let huge = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        let input = raw(
            vec![level(dec!(100), huge), level(dec!(99), huge), level(dec!(98), dec!(1))],
            vec![level(dec!(101), huge), level(dec!(101), huge)],
        );

        let book = OrderbookSnapshot::normalize(&input);

        assert_eq!(book.bids(), &[level(dec!(100), huge), level(dec!(98), dec!(1))]);
        assert_eq!(book.asks(), &[level(dec!(101), huge)]);
        assert_eq!(book.volume(Side::Bid, 10), huge + dec!(1));
    }

    #[test]
    fn test_crossed_book_is_kept_and_flagged() {
        let input = raw(vec![level(dec!(102), dec!(1))], vec![level(dec!(101), dec!(1))]);

        let book = OrderbookSnapshot::normalize(&input);

        assert!(book.is_crossed());
        assert_eq!(book.best_bid(), Some(dec!(102)));
        assert_eq!(book.best_ask(), Some(dec!(101)));
    }
}
