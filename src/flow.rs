//! Order flow events
//!
//! Discrete classified trading signals, independent of the standing book,
//! kept as a bounded newest-first history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of events retained
pub const DEFAULT_EVENT_HISTORY: usize = 50;

/// Impact above which an event is highlighted (5%)
const HIGH_IMPACT: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Classification of an order flow event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEventKind {
    LargeOrder,
    Sweep,
    Iceberg,
    BlockTrade,
}

impl FlowEventKind {
    pub const ALL: [FlowEventKind; 4] = [
        FlowEventKind::LargeOrder,
        FlowEventKind::Sweep,
        FlowEventKind::Iceberg,
        FlowEventKind::BlockTrade,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FlowEventKind::LargeOrder => "LARGE ORDER",
            FlowEventKind::Sweep => "SWEEP",
            FlowEventKind::Iceberg => "ICEBERG",
            FlowEventKind::BlockTrade => "BLOCK TRADE",
        }
    }
}

/// Aggressor side of an order flow event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowSide {
    Buy,
    Sell,
}

/// A single order flow event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFlowEvent {
    pub id: String,
    pub venue: String,
    #[serde(rename = "type")]
    pub kind: FlowEventKind,
    pub side: FlowSide,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Milliseconds since epoch
    pub timestamp: u64,
    /// Estimated price impact as a fraction (0.01 = 1%)
    pub impact: Decimal,
}

impl OrderFlowEvent {
    pub fn is_high_impact(&self) -> bool {
        self.impact > HIGH_IMPACT
    }
}

/// Bounded event history, newest first
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<OrderFlowEvent>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_HISTORY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an event, evicting the oldest once full
    pub fn push(&mut self, event: OrderFlowEvent) {
        if self.capacity == 0 {
            return;
        }
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }

    /// Up to `n` most recent events, newest first
    pub fn recent(&self, n: usize) -> Vec<OrderFlowEvent> {
        self.events.iter().take(n).cloned().collect()
    }

    /// All retained events, newest first
    pub fn to_vec(&self) -> Vec<OrderFlowEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
