//! Replay of recorded ticks from a JSON-lines file

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::{debug, info};

use super::{FeedSource, TickBatch};
use crate::error::{AnalyticsError, Result};
use crate::orderbook::RawSnapshot;
use crate::parser::parse_tick;
use crate::venues::Selection;

/// Feed that replays one recorded tick per line.
///
/// Snapshots for venues that are not enabled, or for another symbol, are
/// filtered out so the batch matches the current selection.
pub struct ReplayFeed {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl ReplayFeed {
    /// Open a replay file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AnalyticsError::FeedError(format!("Failed to open {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "Replaying recorded ticks");

        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl FeedSource for ReplayFeed {
    fn next_tick(&mut self, selection: &Selection) -> Result<Option<TickBatch>> {
        loop {
            let line = match self.lines.next() {
                Some(line) => line.map_err(|e| AnalyticsError::ReplayError {
                    line: self.line_no + 1,
                    reason: e.to_string(),
                })?,
                None => return Ok(None),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let record = parse_tick(&line).map_err(|e| AnalyticsError::ReplayError {
                line: self.line_no,
                reason: e.to_string(),
            })?;

            let enabled = selection.enabled_ids();
            let snapshots: Vec<RawSnapshot> = record
                .snapshots
                .into_iter()
                .map(RawSnapshot::from)
                .filter(|s| {
                    let keep = s.symbol == selection.symbol && enabled.contains(&s.venue.as_str());
                    if !keep {
                        debug!(venue = %s.venue, symbol = %s.symbol, "Skipping unselected snapshot");
                    }
                    keep
                })
                .collect();

            return Ok(Some(TickBatch {
                snapshots,
                event: record.event,
            }));
        }
    }
}
