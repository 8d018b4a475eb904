//! Tick scheduler
//!
//! Pulls one batch per interval from the feed, recomputes the analytics and
//! hands the resulting frame to the store and publisher. A selection change
//! (symbol or venue set) starts a new cycle: books are dropped, the interval
//! restarts and frames of the old cycle are refused by the store.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::feed::{FeedSource, TickBatch};
use crate::flow::EventLog;
use crate::orderbook::{BookSet, IngestOutcome};
use crate::pipeline::{latest_timestamp, Analytics, DashboardFrame};
use crate::publisher::Publisher;
use crate::telemetry::TickMetrics;
use crate::venues::Selection;

#[derive(Debug, Default)]
struct StoreState {
    epoch: u64,
    frame: Option<Arc<DashboardFrame>>,
}

/// Latest frame of the current cycle, shared with readers
#[derive(Debug, Default)]
pub struct FrameStore {
    state: RwLock<StoreState>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accepting frames of `epoch` only, dropping the current frame
    pub async fn begin_epoch(&self, epoch: u64) {
        let mut state = self.state.write().await;
        state.epoch = epoch;
        state.frame = None;
    }

    /// Store a frame. Frames of any other epoch are rejected.
    pub async fn store(&self, frame: Arc<DashboardFrame>) -> bool {
        let mut state = self.state.write().await;
        if frame.epoch != state.epoch {
            debug!(
                frame_epoch = frame.epoch,
                current_epoch = state.epoch,
                "Discarding frame from superseded cycle"
            );
            return false;
        }
        state.frame = Some(frame);
        true
    }

    pub async fn latest(&self) -> Option<Arc<DashboardFrame>> {
        self.state.read().await.frame.clone()
    }

    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }
}

/// Drives the feed → analytics → presentation cycle
pub struct TickScheduler {
    feed: Box<dyn FeedSource>,
    analytics: Analytics,
    books: BookSet,
    events: EventLog,
    store: Arc<FrameStore>,
    publisher: Option<Arc<Publisher>>,
    metrics: TickMetrics,
    tick_interval: Duration,
    epoch: u64,
    tick: u64,
}

impl TickScheduler {
    pub fn new(
        feed: Box<dyn FeedSource>,
        analytics: Analytics,
        store: Arc<FrameStore>,
        metrics: TickMetrics,
        tick_interval: Duration,
        event_history: usize,
    ) -> Self {
        Self {
            feed,
            analytics,
            books: BookSet::new(),
            events: EventLog::with_capacity(event_history),
            store,
            publisher: None,
            metrics,
            tick_interval,
            epoch: 0,
            tick: 0,
        }
    }

    /// Also publish every frame over IPC
    pub fn with_publisher(mut self, publisher: Arc<Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Run until the selection channel closes or the feed is exhausted
    pub async fn run(&mut self, mut selection_rx: watch::Receiver<Selection>) -> Result<()> {
        let mut selection = selection_rx.borrow_and_update().clone();
        self.start_cycle(&selection).await;

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            symbol = %selection.symbol,
            "Starting tick scheduler"
        );

        loop {
            tokio::select! {
                changed = selection_rx.changed() => {
                    if changed.is_err() {
                        info!("Selection channel closed, stopping scheduler");
                        return Ok(());
                    }
                    selection = selection_rx.borrow_and_update().clone();
                    self.start_cycle(&selection).await;
                    ticker.reset();
                }
                _ = ticker.tick() => {
                    if !self.run_tick(&selection).await? {
                        info!(ticks = self.tick, "Feed exhausted, stopping scheduler");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Invalidate everything derived from the previous selection
    async fn start_cycle(&mut self, selection: &Selection) {
        self.epoch += 1;
        self.tick = 0;
        self.books.clear();
        self.store.begin_epoch(self.epoch).await;

        info!(
            epoch = self.epoch,
            symbol = %selection.symbol,
            venues = ?selection.enabled_ids(),
            "Starting tick cycle"
        );
    }

    /// Returns false once the feed is exhausted
    async fn run_tick(&mut self, selection: &Selection) -> Result<bool> {
        let batch = match self.feed.next_tick(selection) {
            Ok(Some(batch)) => batch,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!(error = %e, epoch = self.epoch, "Feed error, skipping tick");
                return Ok(true);
            }
        };

        let frame = Arc::new(self.apply(selection, batch));
        self.store.store(frame.clone()).await;

        if let Some(publisher) = &self.publisher {
            publisher.publish(&frame).await?;
        }

        Ok(true)
    }

    /// Ingest one batch and recompute every analytic for it
    pub fn apply(&mut self, selection: &Selection, batch: TickBatch) -> DashboardFrame {
        let started = Instant::now();
        self.tick += 1;

        // The batch replaces the previous tick's map wholesale
        let present: Vec<&str> = batch.snapshots.iter().map(|s| s.venue.as_str()).collect();
        self.books.retain_venues(&present);

        for raw in &batch.snapshots {
            if self.books.ingest(raw) == IngestOutcome::Stale {
                self.metrics.stale_snapshots.inc();
            }
        }

        if let Some(event) = batch.event {
            debug!(venue = %event.venue, kind = ?event.kind, "Order flow event");
            self.metrics.flow_events.inc();
            self.events.push(event);
        }

        let analysis = self.analytics.compute(self.books.books(), &selection.venues);

        self.metrics.ticks.inc();
        self.metrics.active_venues.set(analysis.stats.active_venues as i64);
        self.metrics
            .compute_seconds
            .observe(started.elapsed().as_secs_f64());

        DashboardFrame {
            epoch: self.epoch,
            tick: self.tick,
            symbol: selection.symbol.clone(),
            timestamp: latest_timestamp(self.books.books()),
            analysis,
            events: self.events.to_vec(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MockFeedSource;
    use crate::flow::{FlowEventKind, FlowSide, OrderFlowEvent};
    use crate::orderbook::{PriceLevel, RawSnapshot};
    use crate::venues::VenueRegistry;
    use rust_decimal_macros::dec;

    fn snapshot(venue: &str, symbol: &str, sequence: u64) -> RawSnapshot {
        RawSnapshot {
            venue: venue.to_string(),
            symbol: symbol.to_string(),
            bids: vec![PriceLevel::new(dec!(100), dec!(2)), PriceLevel::new(dec!(99), dec!(3))],
            asks: vec![PriceLevel::new(dec!(102), dec!(4)), PriceLevel::new(dec!(101), dec!(1))],
            timestamp: sequence * 500,
            sequence,
        }
    }

    fn event() -> OrderFlowEvent {
        OrderFlowEvent {
            id: "e1".to_string(),
            venue: "binance".to_string(),
            kind: FlowEventKind::LargeOrder,
            side: FlowSide::Sell,
            price: dec!(100),
            quantity: dec!(5),
            timestamp: 0,
            impact: dec!(0.02),
        }
    }

    fn scheduler(feed: MockFeedSource) -> (TickScheduler, Arc<FrameStore>) {
        let store = Arc::new(FrameStore::new());
        let scheduler = TickScheduler::new(
            Box::new(feed),
            Analytics::default(),
            store.clone(),
            TickMetrics::unregistered().unwrap(),
            Duration::from_millis(5),
            50,
        );
        (scheduler, store)
    }

    #[test]
    fn test_apply_computes_frame() {
        let (mut scheduler, _) = scheduler(MockFeedSource::new());
        let selection = Selection::new("BTCUSDT", &VenueRegistry::default());

        let frame = scheduler.apply(
            &selection,
            TickBatch {
                snapshots: vec![snapshot("binance", "BTCUSDT", 1)],
                event: Some(event()),
            },
        );

        assert_eq!(frame.tick, 1);
        assert_eq!(frame.timestamp, 500);
        assert_eq!(frame.analysis.stats.total_volume, dec!(10));
        assert_eq!(frame.analysis.stats.mid_price, dec!(100.5));
        assert_eq!(frame.analysis.venues.len(), 1);
        assert_eq!(frame.events.len(), 1);
    }

    #[test]
    fn test_apply_counts_stale_and_drops_missing_venues() {
        let (mut scheduler, _) = scheduler(MockFeedSource::new());
        let mut registry = VenueRegistry::default();
        registry.set_enabled("okx", true);
        let selection = Selection::new("BTCUSDT", &registry);

        scheduler.apply(
            &selection,
            TickBatch {
                snapshots: vec![snapshot("binance", "BTCUSDT", 3), snapshot("okx", "BTCUSDT", 3)],
                event: None,
            },
        );
        let frame = scheduler.apply(
            &selection,
            TickBatch {
                snapshots: vec![snapshot("binance", "BTCUSDT", 2)],
                event: None,
            },
        );

        assert_eq!(scheduler.metrics.stale_snapshots.get(), 1);
        // okx sent nothing this tick, so it no longer contributes
        assert_eq!(frame.analysis.stats.active_venues, 1);
    }

    #[tokio::test]
    async fn test_store_rejects_superseded_epoch() {
        let store = FrameStore::new();
        store.begin_epoch(1).await;
        let old = DashboardFrame {
            epoch: 1,
            tick: 1,
            symbol: "BTCUSDT".to_string(),
            timestamp: 0,
            analysis: Default::default(),
            events: Vec::new(),
        };
        assert!(store.store(Arc::new(old.clone())).await);

        store.begin_epoch(2).await;
        assert!(store.latest().await.is_none());
        assert!(!store.store(Arc::new(old)).await);
        assert!(store.latest().await.is_none());
        assert_eq!(store.epoch().await, 2);
    }

    #[tokio::test]
    async fn test_selection_change_starts_new_cycle() {
        let mut feed = MockFeedSource::new();
        let mut sequence = 0;
        feed.expect_next_tick().returning(move |selection| {
            sequence += 1;
            Ok(Some(TickBatch {
                snapshots: selection
                    .enabled_ids()
                    .into_iter()
                    .map(|venue| snapshot(venue, &selection.symbol, sequence))
                    .collect(),
                event: None,
            }))
        });
        let (mut scheduler, store) = scheduler(feed);

        let registry = VenueRegistry::default();
        let (tx, rx) = watch::channel(Selection::new("BTCUSDT", &registry));
        let handle = tokio::spawn(async move { scheduler.run(rx).await });

        let first = wait_for(&store, |f| f.symbol == "BTCUSDT").await;
        assert_eq!(first.epoch, 1);

        tx.send(Selection::new("ETHUSDT", &registry)).unwrap();
        let second = wait_for(&store, |f| f.symbol == "ETHUSDT").await;
        assert_eq!(second.epoch, 2);
        assert_eq!(store.epoch().await, 2);

        drop(tx);
        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn test_stops_when_feed_exhausted() {
        let mut feed = MockFeedSource::new();
        feed.expect_next_tick().times(1).returning(|_| Ok(None));
        let (mut scheduler, store) = scheduler(feed);

        let (_tx, rx) = watch::channel(Selection::new("BTCUSDT", &VenueRegistry::default()));
        let result = tokio::time::timeout(Duration::from_secs(1), scheduler.run(rx)).await;

        assert!(matches!(result, Ok(Ok(()))));
        assert!(store.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_feed_error_skips_tick() {
        let mut feed = MockFeedSource::new();
        let mut calls = 0;
        feed.expect_next_tick().returning(move |_| {
            calls += 1;
            match calls {
                1 => Err(crate::error::AnalyticsError::FeedError("boom".to_string())),
                2 => Ok(Some(TickBatch {
                    snapshots: vec![snapshot("binance", "BTCUSDT", 1)],
                    event: None,
                })),
                _ => Ok(None),
            }
        });
        let (mut scheduler, store) = scheduler(feed);

        let (_tx, rx) = watch::channel(Selection::new("BTCUSDT", &VenueRegistry::default()));
        let result = tokio::time::timeout(Duration::from_secs(1), scheduler.run(rx)).await;

        assert!(matches!(result, Ok(Ok(()))));
        let frame = store.latest().await.unwrap();
        assert_eq!(frame.tick, 1);
    }

    async fn wait_for<F>(store: &FrameStore, predicate: F) -> Arc<DashboardFrame>
    where
        F: Fn(&DashboardFrame) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(frame) = store.latest().await {
                if predicate(&frame) {
                    return frame;
                }
            }
            assert!(Instant::now() < deadline, "timed out waiting for frame");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}
