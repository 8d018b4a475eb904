//! Runtime control of the feed selection
//!
//! Holds the venue registry and the selected symbol. Every effective change
//! is broadcast as a new [`Selection`], which makes the tick scheduler start
//! a new cycle.

use tokio::sync::{watch, RwLock};
use tracing::info;

use crate::error::{AnalyticsError, Result};
use crate::venues::{Selection, VenueConfig, VenueRegistry};

#[derive(Debug)]
struct ControlState {
    symbol: String,
    registry: VenueRegistry,
}

/// Owner of the current selection
#[derive(Debug)]
pub struct SelectionControl {
    state: RwLock<ControlState>,
    tx: watch::Sender<Selection>,
}

impl SelectionControl {
    pub fn new(symbol: &str, registry: VenueRegistry) -> Self {
        let (tx, _) = watch::channel(Selection::new(symbol, &registry));
        Self {
            state: RwLock::new(ControlState {
                symbol: symbol.to_string(),
                registry,
            }),
            tx,
        }
    }

    /// Receiver for the scheduler; it sees the current selection first
    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Selection {
        self.tx.borrow().clone()
    }

    pub async fn venues(&self) -> Vec<VenueConfig> {
        self.state.read().await.registry.venues().to_vec()
    }

    /// Flip a venue on or off. `None` for an unknown id.
    pub async fn toggle_venue(&self, id: &str) -> Option<VenueConfig> {
        let mut state = self.state.write().await;
        state.registry.toggle(id)?;
        self.broadcast(&state);
        state.registry.get(id).cloned()
    }

    /// Enable or disable a venue; a no-op change keeps the current cycle
    pub async fn set_venue_enabled(&self, id: &str, enabled: bool) -> Option<VenueConfig> {
        let mut state = self.state.write().await;
        let previous = state.registry.get(id)?.enabled;
        if previous != enabled {
            state.registry.set_enabled(id, enabled);
            self.broadcast(&state);
        }
        state.registry.get(id).cloned()
    }

    /// Switch to another symbol. Symbols are upper-cased and must be
    /// non-empty ASCII alphanumerics.
    pub async fn set_symbol(&self, symbol: &str) -> Result<Selection> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AnalyticsError::SelectionError(format!(
                "Invalid symbol: {:?}",
                symbol
            )));
        }

        let mut state = self.state.write().await;
        if state.symbol != symbol {
            state.symbol = symbol;
            self.broadcast(&state);
        }
        Ok(self.current())
    }

    fn broadcast(&self, state: &ControlState) {
        let selection = Selection::new(&state.symbol, &state.registry);
        info!(
            symbol = %selection.symbol,
            venues = ?selection.enabled_ids(),
            "Selection changed"
        );
        self.tx.send_replace(selection);
    }
}
