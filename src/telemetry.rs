//! Prometheus metrics for the tick loop

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

use crate::error::{AnalyticsError, Result};

/// Counters and gauges updated once per tick
#[derive(Clone)]
pub struct TickMetrics {
    pub ticks: IntCounter,
    pub stale_snapshots: IntCounter,
    pub flow_events: IntCounter,
    pub active_venues: IntGauge,
    pub compute_seconds: Histogram,
}

impl TickMetrics {
    /// Create the metrics and register them with `registry`
    pub fn register(registry: &Registry) -> Result<Self> {
        let metrics = Self::unregistered()?;

        for collector in metrics.collectors() {
            registry.register(collector).map_err(metrics_error)?;
        }

        Ok(metrics)
    }

    /// Metrics that are not exported anywhere, for tests and embedding
    pub fn unregistered() -> Result<Self> {
        Ok(Self {
            ticks: IntCounter::new("ticks_total", "Analytics ticks computed").map_err(metrics_error)?,
            stale_snapshots: IntCounter::new(
                "stale_snapshots_total",
                "Snapshots ignored because their sequence did not advance",
            )
            .map_err(metrics_error)?,
            flow_events: IntCounter::new("order_flow_events_total", "Order flow events recorded")
                .map_err(metrics_error)?,
            active_venues: IntGauge::new("active_venues", "Enabled venues with data in the last tick")
                .map_err(metrics_error)?,
            compute_seconds: Histogram::with_opts(
                HistogramOpts::new("tick_compute_seconds", "Time spent computing one tick")
                    .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
            )
            .map_err(metrics_error)?,
        })
    }

    fn collectors(&self) -> Vec<Box<dyn prometheus::core::Collector>> {
        vec![
            Box::new(self.ticks.clone()),
            Box::new(self.stale_snapshots.clone()),
            Box::new(self.flow_events.clone()),
            Box::new(self.active_venues.clone()),
            Box::new(self.compute_seconds.clone()),
        ]
    }
}

fn metrics_error(err: prometheus::Error) -> AnalyticsError {
    AnalyticsError::ConfigError(format!("Metrics registration failed: {}", err))
}
