//! Depth analytics library
//!
//! Turns per-venue orderbook snapshots into depth curves, cross-venue market
//! statistics and pressure zones, recomputed from scratch on every tick.

pub mod config;
pub mod control;
pub mod error;
pub mod feed;
pub mod flow;
pub mod http;
pub mod orderbook;
pub mod parser;
pub mod pipeline;
pub mod publisher;
pub mod scheduler;
pub mod telemetry;
pub mod venues;

pub use config::{Config, FeedMode};
pub use control::SelectionControl;
pub use error::{AnalyticsError, Result};
pub use feed::{FeedSource, ReplayFeed, SimulatedFeed, TickBatch};
pub use flow::{EventLog, FlowEventKind, FlowSide, OrderFlowEvent};
pub use http::HttpState;
pub use orderbook::{
    compute_stats, detect_pressure_zones, BookSet, MarketStats, OrderbookSnapshot, PressureZone,
    PriceLevel, RawSnapshot, Side, VenueMetrics,
};
pub use pipeline::{Analysis, Analytics, DashboardFrame, VisualizationSettings};
pub use publisher::Publisher;
pub use scheduler::{FrameStore, TickScheduler};
pub use venues::{Selection, VenueConfig, VenueRegistry};
