//! Typed view of kline payloads delivered on `<symbol>@kline_<interval>` streams.
//!
//! The multiplexer hands subscribers raw bytes; consumers that want typed
//! candles call [`KlineEvent::from_slice`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlineEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    /// Event time, epoch milliseconds.
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: Kline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    #[serde(rename = "t")]
    pub open_time: i64,
    #[serde(rename = "T")]
    pub close_time: i64,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o", with = "rust_decimal::serde::str")]
    pub open: Decimal,
    #[serde(rename = "h", with = "rust_decimal::serde::str")]
    pub high: Decimal,
    #[serde(rename = "l", with = "rust_decimal::serde::str")]
    pub low: Decimal,
    #[serde(rename = "c", with = "rust_decimal::serde::str")]
    pub close: Decimal,
    #[serde(rename = "v", with = "rust_decimal::serde::str")]
    pub volume: Decimal,
    #[serde(rename = "n", default)]
    pub trades: u64,
    /// Whether this candle is final.
    #[serde(rename = "x")]
    pub is_closed: bool,
}

impl KlineEvent {
    /// # Errors
    /// Returns an error if `payload` is not a kline event.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PAYLOAD: &str = r#"{
        "e": "kline", "E": 1700000000123, "s": "BTCUSDT",
        "k": {
            "t": 1700000000000, "T": 1700000059999, "s": "BTCUSDT", "i": "1m",
            "f": 100, "L": 200,
            "o": "37000.10", "c": "37010.50", "h": "37020.00", "l": "36990.00",
            "v": "12.345", "n": 101, "x": false,
            "q": "456789.1", "V": "6.1", "Q": "225000.0", "B": "0"
        }
    }"#;

    #[test]
    fn test_parse_kline_event() {
        let event = KlineEvent::from_slice(PAYLOAD.as_bytes()).unwrap();
        assert_eq!(event.symbol, "BTCUSDT");
        assert_eq!(event.kline.interval, "1m");
        assert_eq!(event.kline.open, dec!(37000.10));
        assert_eq!(event.kline.close, dec!(37010.50));
        assert_eq!(event.kline.volume, dec!(12.345));
        assert_eq!(event.kline.trades, 101);
        assert!(!event.kline.is_closed);
    }

    #[test]
    fn test_non_kline_payload_is_rejected() {
        assert!(KlineEvent::from_slice(br#"{"e":"aggTrade","p":"1"}"#).is_err());
    }
}
