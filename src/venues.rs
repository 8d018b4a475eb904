//! Venue registry and the current feed selection

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Display and gating configuration of one venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfig {
    pub id: String,
    pub name: String,
    /// Display colour, e.g. "#F0B90B"
    pub color: String,
    /// Disabled venues are excluded from every aggregation
    pub enabled: bool,
}

impl VenueConfig {
    pub fn new(id: &str, name: &str, color: &str, enabled: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            enabled,
        }
    }
}

/// Ordered list of known venues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueRegistry {
    venues: Vec<VenueConfig>,
}

impl Default for VenueRegistry {
    fn default() -> Self {
        Self::new(vec![
            VenueConfig::new("binance", "Binance", "#F0B90B", true),
            VenueConfig::new("okx", "OKX", "#0052FF", false),
            VenueConfig::new("bybit", "Bybit", "#F7931A", false),
        ])
    }
}

impl VenueRegistry {
    /// Build a registry in the given order. Only the first venue with a given
    /// id is kept, so no venue is aggregated twice.
    pub fn new(venues: Vec<VenueConfig>) -> Self {
        let mut unique: Vec<VenueConfig> = Vec::with_capacity(venues.len());
        for venue in venues {
            if unique.iter().any(|v| v.id == venue.id) {
                warn!(venue = %venue.id, "Ignoring duplicate venue id");
                continue;
            }
            unique.push(venue);
        }
        Self { venues: unique }
    }

    /// Default registry with exactly the given ids enabled.
    ///
    /// Ids not in the default set are appended as enabled venues named after the id.
    pub fn with_enabled(ids: &[String]) -> Self {
        let mut registry = Self::default();
        for venue in &mut registry.venues {
            venue.enabled = ids.iter().any(|id| *id == venue.id);
        }
        for id in ids {
            if registry.get(id).is_none() {
                registry.venues.push(VenueConfig::new(id, id, "#888888", true));
            }
        }
        registry
    }

    pub fn venues(&self) -> &[VenueConfig] {
        &self.venues
    }

    pub fn get(&self, id: &str) -> Option<&VenueConfig> {
        self.venues.iter().find(|v| v.id == id)
    }

    /// Enabled venues in registry order
    pub fn enabled(&self) -> impl Iterator<Item = &VenueConfig> {
        self.venues.iter().filter(|v| v.enabled)
    }

    /// Flip a venue's enabled flag. Returns the new state, or `None` for an unknown id.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let venue = self.venues.iter_mut().find(|v| v.id == id)?;
        venue.enabled = !venue.enabled;
        info!(venue = %id, enabled = venue.enabled, "Venue toggled");
        Some(venue.enabled)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Option<bool> {
        let venue = self.venues.iter_mut().find(|v| v.id == id)?;
        venue.enabled = enabled;
        Some(enabled)
    }
}

/// What the feed should currently produce: one symbol across a venue set.
///
/// Any change to it starts a new tick cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub symbol: String,
    pub venues: Vec<VenueConfig>,
}

impl Selection {
    pub fn new(symbol: &str, registry: &VenueRegistry) -> Self {
        Self {
            symbol: symbol.to_string(),
            venues: registry.venues().to_vec(),
        }
    }

    pub fn enabled_ids(&self) -> Vec<&str> {
        self.venues
            .iter()
            .filter(|v| v.enabled)
            .map(|v| v.id.as_str())
            .collect()
    }
}
