//! Error types for the Binance futures REST client.

use thiserror::Error;

/// Errors that can occur when talking to the Binance futures API.
#[derive(Debug, Error)]
pub enum BinanceError {
    /// The API answered with a non-success status.
    #[error("API error: HTTP {status} code {code}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Binance error code; 0 when the body carried none.
        code: i64,
        /// Error message from the API.
        message: String,
    },

    /// Request weight exceeded (HTTP 429 or 418).
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Missing or invalid client configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BinanceError {
    pub fn api(status: u16, code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code,
            message: message.into(),
        }
    }

    /// Returns true if retrying later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result alias for Binance operations.
pub type Result<T> = std::result::Result<T, BinanceError>;
