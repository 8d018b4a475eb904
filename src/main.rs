//! Depth analytics service
//!
//! Runs the tick loop over a simulated or replayed feed, serves the latest
//! dashboard frame and selection controls over HTTP and publishes every
//! frame over IPC.

use std::sync::Arc;
use std::time::Duration;

use prometheus::Registry;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use depth_analytics::telemetry::TickMetrics;
use depth_analytics::{
    http, Analytics, Config, FeedMode, FeedSource, FrameStore, HttpState, Publisher, ReplayFeed,
    SelectionControl, SimulatedFeed, TickScheduler, VenueRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting depth analytics service");

    // Load configuration
    let config = Config::load()?;
    info!(
        symbol = %config.symbol,
        venues = ?config.enabled_venues,
        feed = ?config.feed,
        "Configuration loaded"
    );

    let control = Arc::new(SelectionControl::new(
        &config.symbol,
        VenueRegistry::with_enabled(&config.enabled_venues),
    ));
    let selection_rx = control.subscribe();

    let feed: Box<dyn FeedSource> = match &config.feed {
        FeedMode::Simulated => Box::new(SimulatedFeed::new(config.event_probability)),
        FeedMode::Replay(path) => Box::new(ReplayFeed::open(path)?),
    };

    let registry = Registry::new();
    let metrics = TickMetrics::register(&registry)?;
    let store = Arc::new(FrameStore::new());
    let publisher = Arc::new(Publisher::new(&config.ipc_socket_path).await?);

    // Start HTTP server
    let http_state = HttpState {
        store: store.clone(),
        registry,
        control: control.clone(),
    };
    let port = config.http_port;
    tokio::spawn(async move {
        if let Err(e) = http::serve(http_state, port).await {
            warn!(error = %e, "HTTP server error");
        }
    });

    let mut scheduler = TickScheduler::new(
        feed,
        Analytics::new(config.settings()),
        store,
        metrics,
        Duration::from_millis(config.tick_interval_ms),
        config.event_history,
    )
    .with_publisher(publisher);

    tokio::select! {
        result = scheduler.run(selection_rx) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    Ok(())
}
