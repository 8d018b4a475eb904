//! Pressure zone detection
//!
//! Buckets levels into whole-unit prices and flags buckets whose volume
//! stands well above the mean bucket volume.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tracing::warn;

use super::{PriceLevel, Side};

/// Bucket volume must exceed mean * multiplier to count as a zone
pub const DEFAULT_PRESSURE_MULTIPLIER: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// A price bucket holding abnormally concentrated volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureZone {
    /// Bucket price, rounded to the nearest whole unit
    pub price_level: Decimal,

    /// Bucket volume divided by the mean bucket volume
    pub intensity: Decimal,

    /// Aggregated volume in the bucket
    pub volume: Decimal,

    pub side: Side,

    /// Timestamp of the snapshot the zone was detected in (ms)
    pub timestamp: u64,
}

/// Detect pressure zones on one side of a book.
///
/// Zones come back sorted by intensity, highest first; equal intensities
/// keep ascending bucket price order. No occupied buckets means no zones.
/// Bucket sums saturate at `Decimal::MAX`.
pub fn detect_pressure_zones(
    levels: &[PriceLevel],
    side: Side,
    multiplier: Decimal,
    timestamp: u64,
) -> Vec<PressureZone> {
    let mut buckets: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    for level in levels {
        let bucket = level
            .price
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        let volume = buckets.entry(bucket).or_insert(Decimal::ZERO);
        *volume = volume.saturating_add(level.quantity);
    }

    if buckets.is_empty() {
        return Vec::new();
    }

    let total = buckets
        .values()
        .fold(Decimal::ZERO, |total, volume| total.saturating_add(*volume));
    let mean = total / Decimal::from(buckets.len());
    if mean <= Decimal::ZERO {
        return Vec::new();
    }
    let Some(threshold) = mean.checked_mul(multiplier) else {
        // Nothing can exceed a threshold beyond Decimal::MAX
        warn!(%mean, %multiplier, "Pressure threshold overflows, no zones");
        return Vec::new();
    };

    let mut zones: Vec<PressureZone> = buckets
        .into_iter()
        .filter(|(_, volume)| *volume > threshold)
        .map(|(price_level, volume)| PressureZone {
            price_level,
            intensity: volume / mean,
            volume,
            side,
            timestamp,
        })
        .collect();

    // Stable sort keeps ascending price among equal intensities
    zones.sort_by(|a, b| b.intensity.cmp(&a.intensity));
    zones
}
