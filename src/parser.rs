//! Parser module for recorded feed data
//!
//! Decodes snapshots and tick records in the dashboard's JSON shape, where
//! each level is a `[price, quantity]` pair of numbers or numeric strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use crate::error::{AnalyticsError, Result};
use crate::flow::OrderFlowEvent;
use crate::orderbook::{PriceLevel, RawSnapshot};

/// Orderbook snapshot as recorded
#[derive(Debug, Clone, Deserialize)]
pub struct WireSnapshot {
    pub venue: String,

    pub symbol: String,

    #[serde(deserialize_with = "deserialize_price_levels", default)]
    pub bids: Vec<PriceLevel>,

    #[serde(deserialize_with = "deserialize_price_levels", default)]
    pub asks: Vec<PriceLevel>,

    /// Milliseconds since epoch
    pub timestamp: u64,

    pub sequence: u64,
}

impl From<WireSnapshot> for RawSnapshot {
    fn from(wire: WireSnapshot) -> Self {
        RawSnapshot {
            venue: wire.venue,
            symbol: wire.symbol,
            bids: wire.bids,
            asks: wire.asks,
            timestamp: wire.timestamp,
            sequence: wire.sequence,
        }
    }
}

/// One recorded tick: every venue's snapshot plus an optional flow event
#[derive(Debug, Clone, Deserialize)]
pub struct TickRecord {
    pub snapshots: Vec<WireSnapshot>,

    #[serde(default)]
    pub event: Option<OrderFlowEvent>,
}

/// Parse a single snapshot
pub fn parse_snapshot(raw: &str) -> Result<RawSnapshot> {
    let wire: WireSnapshot = serde_json::from_str(raw)?;
    Ok(wire.into())
}

/// Parse one line of a replay file
pub fn parse_tick(raw: &str) -> Result<TickRecord> {
    Ok(serde_json::from_str(raw)?)
}

/// Number or numeric string, as found in recorded level pairs
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(serde_json::Number),
    Text(String),
}

impl Numeric {
    fn to_decimal(&self) -> Result<Decimal> {
        let text = match self {
            Numeric::Number(n) => n.to_string(),
            Numeric::Text(s) => s.clone(),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|e| AnalyticsError::ParseError(format!("Invalid number {}: {}", text, e)))
    }
}

/// Custom deserializer for price levels from an array of pairs
fn deserialize_price_levels<'de, D>(deserializer: D) -> std::result::Result<Vec<PriceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<Numeric>> = Deserialize::deserialize(deserializer)?;
    raw.into_iter()
        .map(|pair| {
            if pair.len() != 2 {
                return Err(serde::de::Error::custom("Invalid price level format"));
            }
            Ok(PriceLevel {
                price: pair[0].to_decimal().map_err(serde::de::Error::custom)?,
                quantity: pair[1].to_decimal().map_err(serde::de::Error::custom)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowEventKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_snapshot() {
        let raw = r#"{
            "venue": "binance",
            "symbol": "BTCUSDT",
            "bids": [[45000.5, 1.5], ["44999.00", "2.0"]],
            "asks": [[45001, 1.0], [45002.25, 0.5]],
            "timestamp": 1672531200000,
            "sequence": 105
        }"#;

        let snapshot = parse_snapshot(raw).unwrap();
        assert_eq!(snapshot.venue, "binance");
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.asks.len(), 2);
        assert_eq!(snapshot.bids[0].price, dec!(45000.5));
        assert_eq!(snapshot.bids[1].quantity, dec!(2.0));
        assert_eq!(snapshot.asks[0].price, dec!(45001));
        assert_eq!(snapshot.sequence, 105);
    }

    #[test]
    fn test_missing_side_defaults_to_empty() {
        let raw = r#"{"venue":"okx","symbol":"BTCUSDT","bids":[[100,1]],"timestamp":1,"sequence":1}"#;

        let snapshot = parse_snapshot(raw).unwrap();
        assert!(snapshot.asks.is_empty());
    }

    #[test]
    fn test_rejects_bad_pair() {
        let raw = r#"{"venue":"okx","symbol":"BTCUSDT","bids":[[100]],"asks":[],"timestamp":1,"sequence":1}"#;
        assert!(matches!(parse_snapshot(raw), Err(AnalyticsError::ParseError(_))));

        let raw = r#"{"venue":"okx","symbol":"BTCUSDT","bids":[["abc", 1]],"asks":[],"timestamp":1,"sequence":1}"#;
        assert!(parse_snapshot(raw).is_err());
    }

    #[test]
    fn test_parse_tick_with_event() {
        let raw = r#"{
            "snapshots": [
                {"venue":"binance","symbol":"BTCUSDT","bids":[[100,2]],"asks":[[101,1]],"timestamp":5,"sequence":1}
            ],
            "event": {
                "id": "k3j2h1g0f",
                "venue": "kraken",
                "type": "iceberg",
                "side": "sell",
                "price": "45010.5",
                "quantity": "3.25",
                "timestamp": 5,
                "impact": "0.042"
            }
        }"#;

        let tick = parse_tick(raw).unwrap();
        assert_eq!(tick.snapshots.len(), 1);
        let event = tick.event.unwrap();
        assert_eq!(event.kind, FlowEventKind::Iceberg);
        assert_eq!(event.quantity, dec!(3.25));
        assert!(!event.is_high_impact());
    }

    #[test]
    fn test_parse_tick_without_event() {
        let tick = parse_tick(r#"{"snapshots": []}"#).unwrap();
        assert!(tick.snapshots.is_empty());
        assert!(tick.event.is_none());
    }
}
