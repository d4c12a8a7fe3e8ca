//! Combined-stream wire protocol.
//!
//! ## Outbound control frame
//! ```json
//! {"method": "SUBSCRIBE", "params": ["btcusdt@kline_1m"], "id": 1}
//! ```
//!
//! ## Inbound frames
//! ```json
//! {"stream": "btcusdt@kline_1m", "data": {"e": "kline", ...}}
//! {"result": null, "id": 1}
//! {"error": {"code": 2, "msg": "Invalid request"}, "id": 1}
//! ```
//!
//! Each inbound frame is parsed into exactly one [`InboundFrame`] variant or
//! rejected with a [`FrameError`].

use crate::error::FrameError;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Control methods accepted by the combined-stream endpoint.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    Subscribe,
    Unsubscribe,
    ListSubscriptions,
}

/// Outbound control frame.
#[derive(Debug, Serialize)]
pub struct ControlRequest<'a> {
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a [String]>,
    pub id: u64,
}

impl<'a> ControlRequest<'a> {
    #[must_use]
    pub const fn subscribe(streams: &'a [String], id: u64) -> Self {
        Self {
            method: Method::Subscribe,
            params: Some(streams),
            id,
        }
    }

    #[must_use]
    pub const fn unsubscribe(streams: &'a [String], id: u64) -> Self {
        Self {
            method: Method::Unsubscribe,
            params: Some(streams),
            id,
        }
    }

    #[must_use]
    pub const fn list_subscriptions(id: u64) -> Self {
        Self {
            method: Method::ListSubscriptions,
            params: None,
            id,
        }
    }
}

/// Market data tagged with its originating stream key.
#[derive(Debug, Deserialize)]
pub struct StreamFrame {
    pub stream: String,
    pub data: Box<RawValue>,
}

impl StreamFrame {
    /// Raw bytes of the `data` member, exactly as received.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        self.data.get().as_bytes().to_vec()
    }
}

/// Acknowledgement of a control request.
#[derive(Debug, Deserialize)]
pub struct ControlReply {
    pub result: serde_json::Value,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: i64,
    pub msg: String,
}

/// Rejection of a control request.
#[derive(Debug, Deserialize)]
pub struct ControlError {
    pub error: ErrorBody,
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug)]
pub enum InboundFrame {
    Stream(StreamFrame),
    Reply(ControlReply),
    Error(ControlError),
}

impl InboundFrame {
    /// Parses a text frame into one of the known shapes.
    ///
    /// # Errors
    /// Returns [`FrameError`] when the text matches none of them.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        if let Ok(frame) = serde_json::from_str::<StreamFrame>(text) {
            return Ok(Self::Stream(frame));
        }
        if let Ok(err) = serde_json::from_str::<ControlError>(text) {
            return Ok(Self::Error(err));
        }
        if let Ok(reply) = serde_json::from_str::<ControlReply>(text) {
            return Ok(Self::Reply(reply));
        }
        Err(FrameError {
            snippet: text.chars().take(120).collect(),
        })
    }
}

/// Builds the kline stream key for a symbol, e.g. `BTCUSDT` + `1m` → `btcusdt@kline_1m`.
#[must_use]
pub fn kline_stream(symbol: &str, interval: &str) -> String {
    format!("{}@kline_{}", symbol.to_lowercase(), interval)
}
