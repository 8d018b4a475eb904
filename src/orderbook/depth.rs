//! Per-venue depth curves, spread and mid price

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderbookSnapshot, PriceLevel, Side};

/// One point of a cumulative depth curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub quantity: Decimal,
    /// Running total of quantity from the top of the book down to this level
    pub total: Decimal,
}

/// Accumulate quantities over the top `depth` levels, in the order given.
pub fn cumulative_depth(levels: &[PriceLevel], depth: usize) -> Vec<DepthLevel> {
    levels
        .iter()
        .take(depth)
        .scan(Decimal::ZERO, |total, level| {
            *total = total.saturating_add(level.quantity);
            Some(DepthLevel {
                price: level.price,
                quantity: level.quantity,
                total: *total,
            })
        })
        .collect()
}

/// Metrics derived from a single venue snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueMetrics {
    pub venue: String,

    /// Cumulative bid curve, best bid first
    pub bids: Vec<DepthLevel>,

    /// Cumulative ask curve, best ask first
    pub asks: Vec<DepthLevel>,

    /// Best ask minus best bid; `None` when either side is empty
    pub spread: Option<Decimal>,

    /// Average of best bid and best ask; `None` when either side is empty
    pub mid_price: Option<Decimal>,

    /// Total bid volume in the curve
    pub bid_depth: Decimal,

    /// Total ask volume in the curve
    pub ask_depth: Decimal,
}

impl VenueMetrics {
    /// Derive metrics from a snapshot, truncating each curve to `depth` levels
    pub fn from_snapshot(snapshot: &OrderbookSnapshot, depth: usize) -> Self {
        let bids = cumulative_depth(snapshot.levels(Side::Bid), depth);
        let asks = cumulative_depth(snapshot.levels(Side::Ask), depth);

        Self {
            venue: snapshot.venue().to_string(),
            bid_depth: bids.last().map(|l| l.total).unwrap_or_default(),
            ask_depth: asks.last().map(|l| l.total).unwrap_or_default(),
            bids,
            asks,
            spread: spread(snapshot),
            mid_price: mid_price(snapshot),
        }
    }
}

pub(crate) fn spread(snapshot: &OrderbookSnapshot) -> Option<Decimal> {
    match (snapshot.best_bid(), snapshot.best_ask()) {
        (Some(bid), Some(ask)) => Some(ask - bid),
        _ => None,
    }
}

fn mid_price(snapshot: &OrderbookSnapshot) -> Option<Decimal> {
    match (snapshot.best_bid(), snapshot.best_ask()) {
        (Some(bid), Some(ask)) => Some(midpoint(bid, ask)),
        _ => None,
    }
}

/// (a + b) / 2, halving first when the sum would overflow
pub(crate) fn midpoint(a: Decimal, b: Decimal) -> Decimal {
    let two = Decimal::from(2);
    match a.checked_add(b) {
        Some(sum) => sum / two,
        None => (a / two).saturating_add(b / two),
    }
}
