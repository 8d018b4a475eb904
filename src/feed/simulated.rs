//! Simulated orderbook feed
//!
//! Produces a fresh 20-level book per enabled venue around a base price in
//! [45000, 46000), plus an occasional order flow event.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::trace;

use super::{FeedSource, TickBatch};
use crate::error::Result;
use crate::flow::{FlowEventKind, FlowSide, OrderFlowEvent};
use crate::orderbook::{PriceLevel, RawSnapshot};
use crate::venues::Selection;

const LEVELS_PER_SIDE: usize = 20;
const BASE_PRICE: f64 = 45_000.0;

/// Simulated multi-venue feed
pub struct SimulatedFeed {
    rng: StdRng,
    event_probability: f64,
    sequences: HashMap<String, u64>,
}

impl SimulatedFeed {
    /// Create a feed seeded from OS entropy
    pub fn new(event_probability: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), event_probability)
    }

    /// Create a reproducible feed
    pub fn with_seed(seed: u64, event_probability: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), event_probability)
    }

    fn with_rng(rng: StdRng, event_probability: f64) -> Self {
        Self {
            rng,
            event_probability: if event_probability.is_nan() {
                0.0
            } else {
                event_probability.clamp(0.0, 1.0)
            },
            sequences: HashMap::new(),
        }
    }

    fn next_sequence(&mut self, venue: &str) -> u64 {
        let seq = self.sequences.entry(venue.to_string()).or_insert(0);
        *seq += 1;
        *seq
    }

    fn generate_book(&mut self, venue: &str, symbol: &str, timestamp: u64) -> RawSnapshot {
        let base = BASE_PRICE + self.rng.gen_range(0.0..1000.0);
        let spread = 0.5 + self.rng.gen_range(0.0..2.0);

        let mut bids = Vec::with_capacity(LEVELS_PER_SIDE);
        let mut asks = Vec::with_capacity(LEVELS_PER_SIDE);

        // Step sizes are drawn per level, so levels come out unordered
        for i in 0..LEVELS_PER_SIDE {
            let step = i as f64 * (0.5 + self.rng.gen_range(0.0..2.0));
            let quantity = 0.1 + self.rng.gen_range(0.0..5.0);
            bids.push(level(base - spread / 2.0 - step, quantity));
        }
        for i in 0..LEVELS_PER_SIDE {
            let step = i as f64 * (0.5 + self.rng.gen_range(0.0..2.0));
            let quantity = 0.1 + self.rng.gen_range(0.0..5.0);
            asks.push(level(base + spread / 2.0 + step, quantity));
        }

        RawSnapshot {
            venue: venue.to_string(),
            symbol: symbol.to_string(),
            bids,
            asks,
            timestamp,
            sequence: self.next_sequence(venue),
        }
    }

    fn generate_event(&mut self, venues: &[&str], timestamp: u64) -> Option<OrderFlowEvent> {
        if venues.is_empty() || !self.rng.gen_bool(self.event_probability) {
            return None;
        }

        let venue = venues[self.rng.gen_range(0..venues.len())];
        let kind = FlowEventKind::ALL[self.rng.gen_range(0..FlowEventKind::ALL.len())];
        let side = if self.rng.gen_bool(0.5) {
            FlowSide::Buy
        } else {
            FlowSide::Sell
        };

        Some(OrderFlowEvent {
            id: uuid::Uuid::new_v4().simple().to_string(),
            venue: venue.to_string(),
            kind,
            side,
            price: to_decimal(BASE_PRICE + (self.rng.gen::<f64>() - 0.5) * 1000.0, 2),
            quantity: to_decimal(0.5 + self.rng.gen_range(0.0..10.0), 4),
            timestamp,
            impact: to_decimal(self.rng.gen_range(0.0..0.1), 4),
        })
    }
}

impl FeedSource for SimulatedFeed {
    fn next_tick(&mut self, selection: &Selection) -> Result<Option<TickBatch>> {
        let timestamp = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let venues = selection.enabled_ids();

        let snapshots: Vec<RawSnapshot> = venues
            .iter()
            .map(|venue| self.generate_book(venue, &selection.symbol, timestamp))
            .collect();
        let event = self.generate_event(&venues, timestamp);

        trace!(venues = venues.len(), has_event = event.is_some(), "Simulated tick");

        Ok(Some(TickBatch { snapshots, event }))
    }
}

fn level(price: f64, quantity: f64) -> PriceLevel {
    PriceLevel {
        price: to_decimal(price, 2),
        quantity: to_decimal(quantity, 4),
    }
}

fn to_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(dp)
}
