//! Binance combined-stream message decoding.
//!
//! The partial depth stream delivers `{"stream": "<sym>@depth20@100ms",
//! "data": {...}}` envelopes whose payload holds an update id and two lists
//! of `[price, quantity]` string pairs. No server timestamp is provided, so
//! the recorder stamps each snapshot with local receipt time.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::record::{Level, Snapshot};

/// Combined-stream envelope. `data` is kept raw until the stream name has
/// identified the payload.
#[derive(Debug, Deserialize)]
pub struct StreamEnvelope {
    pub stream: String,
    pub data: serde_json::Value,
}

/// Partial depth snapshot payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthMessage {
    pub last_update_id: i64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

impl DepthMessage {
    /// Stamp with the locally-observed receipt time and parse the levels.
    pub fn into_snapshot(self, event_time_ms: i64) -> Snapshot {
        Snapshot {
            event_time_ms,
            last_update_id: self.last_update_id,
            bids: parse_levels(&self.bids),
            asks: parse_levels(&self.asks),
        }
    }
}

/// Decode one text message into `(symbol, depth payload)`.
pub fn decode_message(text: &str) -> Result<(String, DepthMessage)> {
    let envelope: StreamEnvelope =
        serde_json::from_str(text).context("combined stream envelope")?;
    let depth: DepthMessage =
        serde_json::from_value(envelope.data).context("depth payload")?;
    Ok((symbol_of_stream(&envelope.stream).to_string(), depth))
}

/// Leading segment of a stream name: `ethusdt@depth20@100ms` -> `ethusdt`.
pub fn symbol_of_stream(stream: &str) -> &str {
    stream.split('@').next().unwrap_or(stream)
}

/// Endpoint for a multi-symbol combined subscription.
pub fn combined_stream_url(base: &str, symbols: &[String], suffix: &str) -> String {
    let streams: Vec<String> = symbols
        .iter()
        .map(|s| format!("{}{}", s.to_lowercase(), suffix))
        .collect();
    format!("{}{}", base, streams.join("/"))
}

/// Unparseable numbers degrade to 0.0 rather than dropping the level, so one
/// bad field cannot shift the rest of the ladder.
fn parse_levels(raw: &[[String; 2]]) -> Vec<Level> {
    raw.iter()
        .map(|[price, quantity]| Level {
            price: price.parse().unwrap_or(0.0),
            quantity: quantity.parse().unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_combined_stream_message() {
        let text = r#"{
            "stream": "ethusdt@depth20@100ms",
            "data": {
                "lastUpdateId": 123456789,
                "bids": [["4312.50", "1.25"], ["4312.00", "0.50"]],
                "asks": [["4313.00", "2.00"]]
            }
        }"#;
        let (symbol, depth) = decode_message(text).unwrap();
        assert_eq!(symbol, "ethusdt");
        assert_eq!(depth.last_update_id, 123_456_789);

        let snap = depth.into_snapshot(1_755_407_586_000);
        assert_eq!(snap.event_time_ms, 1_755_407_586_000);
        assert_eq!(snap.bids.len(), 2);
        assert_eq!(snap.bids[0].price, 4312.5);
        assert_eq!(snap.bids[0].quantity, 1.25);
        assert_eq!(snap.asks[0].price, 4313.0);
    }

    #[test]
    fn rejects_message_without_depth_payload() {
        let text = r#"{"stream": "ethusdt@trade", "data": {"p": "4312.5"}}"#;
        assert!(decode_message(text).is_err());
    }

    #[test]
    fn bad_numbers_degrade_to_zero() {
        let msg = DepthMessage {
            last_update_id: 1,
            bids: vec![["not-a-price".into(), "1.5".into()]],
            asks: vec![],
        };
        let snap = msg.into_snapshot(0);
        assert_eq!(snap.bids[0].price, 0.0);
        assert_eq!(snap.bids[0].quantity, 1.5);
    }

    #[test]
    fn stream_name_yields_symbol() {
        assert_eq!(symbol_of_stream("ethusdt@depth20@100ms"), "ethusdt");
        assert_eq!(symbol_of_stream("bare"), "bare");
    }

    #[test]
    fn builds_combined_url() {
        let url = combined_stream_url(
            "wss://stream.binance.com:9443/stream?streams=",
            &["ETHUSDT".to_string(), "ethbtc".to_string()],
            "@depth20@100ms",
        );
        assert_eq!(
            url,
            "wss://stream.binance.com:9443/stream?streams=ethusdt@depth20@100ms/ethbtc@depth20@100ms"
        );
    }
}
