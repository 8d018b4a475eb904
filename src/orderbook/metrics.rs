//! Cross-venue market statistics

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::depth::{midpoint, spread};
use super::{OrderbookSnapshot, Side};
use crate::venues::VenueConfig;

const SCORE_CEILING: Decimal = Decimal::ONE_HUNDRED;

/// Calibration for [`compute_stats`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsParams {
    /// Levels per side counted towards volume
    pub depth: usize,
    /// Total volume that maps to a liquidity score of 1
    pub liquidity_divisor: Decimal,
    /// Smaller-side volume that maps to a depth score of 1
    pub depth_divisor: Decimal,
}

impl Default for StatsParams {
    fn default() -> Self {
        Self {
            depth: 10,
            liquidity_divisor: Decimal::from(100),
            depth_divisor: Decimal::from(50),
        }
    }
}

/// Book-wide statistics across all enabled venues.
///
/// Every field is zero when no enabled venue has data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Sum of top-N bid and ask quantities
    pub total_volume: Decimal,

    pub total_bid_volume: Decimal,

    pub total_ask_volume: Decimal,

    /// Mean spread over venues quoting both sides
    pub avg_spread: Decimal,

    /// Highest bid over all venues
    pub best_bid: Decimal,

    /// Lowest ask over all venues
    pub best_ask: Decimal,

    /// Average of book-wide best bid and best ask, zero unless both exist
    pub mid_price: Decimal,

    /// avg_spread / mid_price * 100
    pub spread_percentage: Decimal,

    /// Total volume normalized into [0, 100]
    pub liquidity_score: Decimal,

    /// Smaller side's volume normalized into [0, 100]
    pub market_depth: Decimal,

    /// Simple imbalance: (bid_vol - ask_vol) / (bid_vol + ask_vol)
    pub imbalance: Option<Decimal>,

    /// Number of enabled venues that supplied a snapshot
    pub active_venues: usize,

    /// Price levels held across those venues
    pub data_points: usize,
}

/// Aggregate statistics over the snapshots of enabled venues.
///
/// Snapshots for disabled or unknown venues are ignored. Venues are visited
/// in registry order.
pub fn compute_stats(
    snapshots: &HashMap<String, OrderbookSnapshot>,
    venues: &[VenueConfig],
    params: &StatsParams,
) -> MarketStats {
    let mut stats = MarketStats::default();
    let mut best_bid: Option<Decimal> = None;
    let mut best_ask: Option<Decimal> = None;
    let mut spread_sum = Decimal::ZERO;
    let mut quoted_venues = 0u32;

    let books = venues
        .iter()
        .filter(|v| v.enabled)
        .filter_map(|v| snapshots.get(&v.id));

    for book in books {
        stats.active_venues += 1;
        stats.data_points += book.level_count();
        stats.total_bid_volume = stats
            .total_bid_volume
            .saturating_add(book.volume(Side::Bid, params.depth));
        stats.total_ask_volume = stats
            .total_ask_volume
            .saturating_add(book.volume(Side::Ask, params.depth));

        if let Some(bid) = book.best_bid() {
            best_bid = Some(best_bid.map_or(bid, |b| b.max(bid)));
        }
        if let Some(ask) = book.best_ask() {
            best_ask = Some(best_ask.map_or(ask, |a| a.min(ask)));
        }
        if let Some(s) = spread(book) {
            spread_sum = spread_sum.saturating_add(s);
            quoted_venues += 1;
        }
    }

    stats.total_volume = stats.total_bid_volume.saturating_add(stats.total_ask_volume);
    stats.best_bid = best_bid.unwrap_or_default();
    stats.best_ask = best_ask.unwrap_or_default();

    if quoted_venues > 0 {
        stats.avg_spread = spread_sum / Decimal::from(quoted_venues);
    }

    if let (Some(bid), Some(ask)) = (best_bid, best_ask) {
        stats.mid_price = midpoint(bid, ask);
    }

    if stats.mid_price > Decimal::ZERO {
        stats.spread_percentage = stats
            .avg_spread
            .checked_div(stats.mid_price)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(if stats.avg_spread.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            });
    }

    stats.liquidity_score = bounded_score(stats.total_volume, params.liquidity_divisor);
    stats.market_depth = bounded_score(
        stats.total_bid_volume.min(stats.total_ask_volume),
        params.depth_divisor,
    );

    // |bid - ask| never exceeds the total, even a saturated one
    if stats.total_volume > Decimal::ZERO {
        stats.imbalance =
            Some((stats.total_bid_volume - stats.total_ask_volume) / stats.total_volume);
    }

    stats
}

/// value / divisor clamped into [0, 100]; zero for a non-positive divisor.
/// Volumes are never negative, so an overflowing quotient maps to the ceiling.
fn bounded_score(value: Decimal, divisor: Decimal) -> Decimal {
    if divisor <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    value
        .checked_div(divisor)
        .unwrap_or(SCORE_CEILING)
        .clamp(Decimal::ZERO, SCORE_CEILING)
}
