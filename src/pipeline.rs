//! One-tick analytics pipeline
//!
//! Recomputes every derived value from the borrowed venue books. Nothing is
//! carried over between calls.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::flow::OrderFlowEvent;
use crate::orderbook::{
    compute_stats, detect_pressure_zones, MarketStats, OrderbookSnapshot, PressureZone, Side,
    StatsParams, VenueMetrics, DEFAULT_PRESSURE_MULTIPLIER,
};
use crate::venues::VenueConfig;

/// Tunables of the analytics pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSettings {
    /// Levels per side in depth curves and volume totals
    pub display_depth: usize,
    /// Levels per side fed to pressure zone detection
    pub pressure_depth: usize,
    pub show_pressure_zones: bool,
    pub pressure_multiplier: Decimal,
    pub liquidity_divisor: Decimal,
    pub depth_divisor: Decimal,
}

impl Default for VisualizationSettings {
    fn default() -> Self {
        let stats = StatsParams::default();
        Self {
            display_depth: stats.depth,
            pressure_depth: 20,
            show_pressure_zones: true,
            pressure_multiplier: DEFAULT_PRESSURE_MULTIPLIER,
            liquidity_divisor: stats.liquidity_divisor,
            depth_divisor: stats.depth_divisor,
        }
    }
}

impl VisualizationSettings {
    fn stats_params(&self) -> StatsParams {
        StatsParams {
            depth: self.display_depth,
            liquidity_divisor: self.liquidity_divisor,
            depth_divisor: self.depth_divisor,
        }
    }
}

/// A pressure zone tagged with the venue it was found on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueZone {
    pub venue: String,
    #[serde(flatten)]
    pub zone: PressureZone,
}

/// Output of one analytics pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub stats: MarketStats,
    /// Per-venue metrics in registry order
    pub venues: Vec<VenueMetrics>,
    /// Zones of every enabled venue, highest intensity first
    pub pressure_zones: Vec<VenueZone>,
}

/// Everything the presentation layer needs for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardFrame {
    /// Tick cycle this frame belongs to
    pub epoch: u64,
    /// Tick counter within the cycle
    pub tick: u64,
    pub symbol: String,
    /// Latest snapshot timestamp in the frame (ms)
    pub timestamp: u64,
    #[serde(flatten)]
    pub analysis: Analysis,
    /// Most recent order flow events, newest first
    pub events: Vec<OrderFlowEvent>,
}

/// Stateless analytics over venue books
#[derive(Debug, Clone, Default)]
pub struct Analytics {
    settings: VisualizationSettings,
}

impl Analytics {
    pub fn new(settings: VisualizationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &VisualizationSettings {
        &self.settings
    }

    /// Run every analytic over the books of enabled venues
    pub fn compute(
        &self,
        books: &HashMap<String, OrderbookSnapshot>,
        venues: &[VenueConfig],
    ) -> Analysis {
        let stats = compute_stats(books, venues, &self.settings.stats_params());

        let enabled: Vec<&OrderbookSnapshot> = venues
            .iter()
            .filter(|v| v.enabled)
            .filter_map(|v| books.get(&v.id))
            .collect();

        let metrics = enabled
            .iter()
            .map(|book| VenueMetrics::from_snapshot(book, self.settings.display_depth))
            .collect();

        let pressure_zones = if self.settings.show_pressure_zones {
            self.pressure_zones(&enabled)
        } else {
            Vec::new()
        };

        Analysis {
            stats,
            venues: metrics,
            pressure_zones,
        }
    }

    fn pressure_zones(&self, books: &[&OrderbookSnapshot]) -> Vec<VenueZone> {
        let mut zones: Vec<VenueZone> = books
            .iter()
            .flat_map(|book| {
                [Side::Bid, Side::Ask].into_iter().flat_map(move |side| {
                    let levels = book.levels(side);
                    let levels = &levels[..levels.len().min(self.settings.pressure_depth)];
                    detect_pressure_zones(
                        levels,
                        side,
                        self.settings.pressure_multiplier,
                        book.timestamp(),
                    )
                    .into_iter()
                    .map(move |zone| VenueZone {
                        venue: book.venue().to_string(),
                        zone,
                    })
                })
            })
            .collect();

        zones.sort_by(|a, b| b.zone.intensity.cmp(&a.zone.intensity));
        zones
    }
}

/// Latest snapshot timestamp among the given books, zero when empty
pub fn latest_timestamp(books: &HashMap<String, OrderbookSnapshot>) -> u64 {
    books.values().map(|b| b.timestamp()).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::{PriceLevel, RawSnapshot};
    use rust_decimal_macros::dec;

    fn venue(id: &str, enabled: bool) -> VenueConfig {
        VenueConfig::new(id, id, "#000000", enabled)
    }

    fn book(venue: &str, timestamp: u64, bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> OrderbookSnapshot {
        let to_levels = |pairs: &[(Decimal, Decimal)]| {
            pairs
                .iter()
                .map(|&(price, quantity)| PriceLevel { price, quantity })
                .collect::<Vec<_>>()
        };
        OrderbookSnapshot::normalize(&RawSnapshot {
            venue: venue.to_string(),
            symbol: "BTCUSDT".to_string(),
            bids: to_levels(bids),
            asks: to_levels(asks),
            timestamp,
            sequence: 1,
        })
    }

    fn books() -> HashMap<String, OrderbookSnapshot> {
        let a = book(
            "binance",
            10,
            &[(dec!(100), dec!(1)), (dec!(99), dec!(1)), (dec!(98), dec!(1)), (dec!(97), dec!(9))],
            &[(dec!(101), dec!(1)), (dec!(102), dec!(1))],
        );
        let b = book(
            "okx",
            20,
            &[(dec!(100), dec!(2))],
            &[(dec!(101), dec!(1)), (dec!(102), dec!(1)), (dec!(103), dec!(1)), (dec!(104), dec!(30))],
        );
        let c = book("bybit", 30, &[(dec!(500), dec!(1))], &[(dec!(501), dec!(1))]);
        [a, b, c].into_iter().map(|b| (b.venue().to_string(), b)).collect()
    }

    fn venues() -> Vec<VenueConfig> {
        vec![venue("binance", true), venue("okx", true), venue("bybit", false)]
    }

    #[test]
    fn test_excludes_disabled_venues() {
        let analysis = Analytics::default().compute(&books(), &venues());

        let ids: Vec<_> = analysis.venues.iter().map(|m| m.venue.as_str()).collect();
        assert_eq!(ids, vec!["binance", "okx"]);
        assert_eq!(analysis.stats.best_bid, dec!(100));
        assert!(analysis.pressure_zones.iter().all(|z| z.venue != "bybit"));
    }

    #[test]
    fn test_zones_ranked_across_venues() {
        let analysis = Analytics::default().compute(&books(), &venues());

        let found: Vec<_> = analysis
            .pressure_zones
            .iter()
            .map(|z| (z.venue.as_str(), z.zone.side, z.zone.price_level))
            .collect();
        // okx ask 104: 30 / 8.25; binance bid 97: 9 / 3
        assert_eq!(found, vec![("okx", Side::Ask, dec!(104)), ("binance", Side::Bid, dec!(97))]);
        assert_eq!(analysis.pressure_zones[0].zone.timestamp, 20);
    }

    #[test]
    fn test_pressure_zones_can_be_disabled() {
        let analytics = Analytics::new(VisualizationSettings {
            show_pressure_zones: false,
            ..Default::default()
        });

        let analysis = analytics.compute(&books(), &venues());

        assert!(analysis.pressure_zones.is_empty());
        assert_eq!(analysis.venues.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let analytics = Analytics::default();
        let books = books();

        let first = analytics.compute(&books, &venues());
        let second = analytics.compute(&books, &venues());

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_books() {
        let analysis = Analytics::default().compute(&HashMap::new(), &venues());

        assert_eq!(analysis, Analysis::default());
        assert_eq!(latest_timestamp(&HashMap::new()), 0);
    }
}
