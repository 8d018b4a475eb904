//! Configuration module for the depth analytics service

use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::error::{AnalyticsError, Result};
use crate::flow::DEFAULT_EVENT_HISTORY;
use crate::orderbook::DEFAULT_PRESSURE_MULTIPLIER;
use crate::pipeline::VisualizationSettings;

/// Where tick batches come from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum FeedMode {
    /// Random books generated every tick
    Simulated,
    /// Recorded ticks replayed from a JSON-lines file
    Replay(String),
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Trading symbol to visualize (e.g., "BTCUSDT")
    pub symbol: String,

    /// Venue ids enabled at startup
    pub enabled_venues: Vec<String>,

    /// Tick period in milliseconds
    pub tick_interval_ms: u64,

    /// Levels per side in depth curves and volume totals
    pub display_depth: usize,

    /// Bucket volume / mean volume ratio that marks a pressure zone
    pub pressure_multiplier: Decimal,

    /// Whether pressure zones are computed at all
    pub show_pressure_zones: bool,

    /// Order flow events kept in history
    pub event_history: usize,

    /// Chance per simulated tick of emitting an order flow event
    pub event_probability: f64,

    pub feed: FeedMode,

    /// IPC socket path for publishing frames
    pub ipc_socket_path: String,

    /// Port of the health / metrics / frame HTTP server
    pub http_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled_venues: Vec<String> = lookup("ENABLED_VENUES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.enabled_venues);

        let feed = match lookup("FEED_MODE").as_deref().map(str::trim) {
            None | Some("simulated") => FeedMode::Simulated,
            Some("replay") => {
                let path = lookup("REPLAY_PATH").ok_or_else(|| {
                    AnalyticsError::ConfigError("FEED_MODE=replay requires REPLAY_PATH".to_string())
                })?;
                FeedMode::Replay(path)
            }
            Some(other) => {
                return Err(AnalyticsError::ConfigError(format!(
                    "Unknown FEED_MODE: {}",
                    other
                )))
            }
        };

        let event_probability = parse_or(&lookup, "EVENT_PROBABILITY", defaults.event_probability);

        Ok(Self {
            symbol: lookup("SYMBOL")
                .map(|s| s.trim().to_uppercase())
                .unwrap_or(defaults.symbol),
            enabled_venues,
            tick_interval_ms: parse_or(&lookup, "TICK_INTERVAL_MS", defaults.tick_interval_ms).max(1),
            display_depth: parse_or(&lookup, "DISPLAY_DEPTH", defaults.display_depth),
            pressure_multiplier: parse_or(&lookup, "PRESSURE_MULTIPLIER", defaults.pressure_multiplier),
            show_pressure_zones: parse_or(&lookup, "SHOW_PRESSURE_ZONES", defaults.show_pressure_zones),
            event_history: parse_or(&lookup, "EVENT_HISTORY", defaults.event_history),
            event_probability: if event_probability.is_finite() {
                event_probability.clamp(0.0, 1.0)
            } else {
                defaults.event_probability
            },
            feed,
            ipc_socket_path: lookup("IPC_SOCKET_PATH").unwrap_or(defaults.ipc_socket_path),
            http_port: parse_or(&lookup, "HTTP_PORT", defaults.http_port),
        })
    }

    /// Analytics settings derived from this configuration
    pub fn settings(&self) -> VisualizationSettings {
        VisualizationSettings {
            display_depth: self.display_depth,
            show_pressure_zones: self.show_pressure_zones,
            pressure_multiplier: self.pressure_multiplier,
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            enabled_venues: vec!["binance".to_string()],
            tick_interval_ms: 500,
            display_depth: 10,
            pressure_multiplier: DEFAULT_PRESSURE_MULTIPLIER,
            show_pressure_zones: true,
            event_history: DEFAULT_EVENT_HISTORY,
            event_probability: 0.3,
            feed: FeedMode::Simulated,
            ipc_socket_path: "/tmp/depth-analytics.sock".to_string(),
            http_port: 9090,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
