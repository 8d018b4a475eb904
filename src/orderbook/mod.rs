//! Order book module
//!
//! Normalizes raw per-venue ladders and derives depth, spread and pressure
//! analytics from them. Every computation here is a pure function of its
//! input snapshot(s).

mod book;
mod depth;
mod manager;
mod metrics;
mod pressure;

pub use depth::{cumulative_depth, DepthLevel, VenueMetrics};
pub use manager::{BookSet, IngestOutcome};
pub use metrics::{compute_stats, MarketStats, StatsParams};
pub use pressure::{detect_pressure_zones, PressureZone, DEFAULT_PRESSURE_MULTIPLIER};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

/// A single level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

/// Snapshot as delivered by a feed: levels in arbitrary order, possibly
/// duplicated or malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub venue: String,
    pub symbol: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    /// Milliseconds since epoch
    pub timestamp: u64,
    pub sequence: u64,
}

/// Normalized snapshot of one venue's book.
///
/// Bids are strictly descending and asks strictly ascending by price. Only
/// [`OrderbookSnapshot::normalize`] constructs it, so the ordering holds for
/// every value of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    venue: String,
    symbol: String,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    timestamp: u64,
    sequence: u64,
}

impl OrderbookSnapshot {
    pub fn venue(&self) -> &str {
        &self.venue
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Bid levels, best (highest) first
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    /// Ask levels, best (lowest) first
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Get best bid price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Get best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// True when both sides are present and the best bid is not below the best ask
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(bid), Some(ask)) if bid >= ask)
    }

    /// Sum of quantities over the top `levels` of one side
    pub fn volume(&self, side: Side, levels: usize) -> Decimal {
        self.levels(side)
            .iter()
            .take(levels)
            .fold(Decimal::ZERO, |total, l| total.saturating_add(l.quantity))
    }

    /// Total number of price levels on both sides
    pub fn level_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}
