//! Error types for the combined-stream client.

use thiserror::Error;

/// Errors surfaced by [`crate::CombinedStreamClient`].
///
/// Read failures on an established connection never appear here; they are
/// absorbed by the reconnect supervisor.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Dialing the endpoint (directly or through a proxy) failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No live socket is available for writing.
    #[error("websocket not connected")]
    NotConnected,

    /// A SUBSCRIBE batch could not be sent. `batch` is 1-based.
    #[error("subscription batch {batch} failed: {source}")]
    BatchFailed {
        /// Index of the failed batch, starting at 1.
        batch: usize,
        /// Underlying send error.
        #[source]
        source: Box<StreamError>,
    },

    /// WebSocket protocol error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON encoding or decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP CONNECT tunnel could not be established.
    #[error("proxy error: {0}")]
    Proxy(String),

    /// Endpoint URL is unusable.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The client has been shut down.
    #[error("client closed")]
    Closed,

    /// The retry policy gave up.
    #[error("reconnect attempts exhausted after {0} tries")]
    RetriesExhausted(u32),
}

impl StreamError {
    pub(crate) fn batch(batch: usize, source: StreamError) -> Self {
        Self::BatchFailed {
            batch,
            source: Box::new(source),
        }
    }
}

/// An inbound text frame matched none of the known shapes.
#[derive(Error, Debug)]
#[error("unrecognized frame: {snippet}")]
pub struct FrameError {
    /// Leading characters of the offending frame.
    pub snippet: String,
}
