//! Feed sources
//!
//! A feed hands the scheduler one batch of per-venue snapshots per tick. The
//! analytics do not care whether it is simulated or replayed.

mod replay;
mod simulated;

pub use replay::ReplayFeed;
pub use simulated::SimulatedFeed;

use crate::error::Result;
use crate::flow::OrderFlowEvent;
use crate::orderbook::RawSnapshot;
use crate::venues::Selection;

/// Everything a feed produced for one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickBatch {
    /// One snapshot per enabled venue
    pub snapshots: Vec<RawSnapshot>,
    pub event: Option<OrderFlowEvent>,
}

/// Source of tick batches
#[cfg_attr(test, mockall::automock)]
pub trait FeedSource: Send {
    /// Produce the next batch for the current selection.
    ///
    /// `Ok(None)` means the feed is exhausted.
    fn next_tick(&mut self, selection: &Selection) -> Result<Option<TickBatch>>;
}
