//! Binance USD-M futures REST client with rate limiting and request signing.
//!
//! # Example
//!
//! ```ignore
//! use perp_trader_binance::{BinanceClientConfig, BinanceFuturesClient, RequestSigner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let signer = RequestSigner::new(std::env::var("BINANCE_API_KEY")?, std::env::var("BINANCE_API_SECRET")?)?;
//!     let client = BinanceFuturesClient::new(BinanceClientConfig::default(), signer)?;
//!
//!     let end = chrono::Utc::now();
//!     let fills = client.user_trades("BTCUSDT", end - chrono::Duration::days(3), end).await?;
//!     println!("{} fills", fills.len());
//!     Ok(())
//! }
//! ```

use crate::error::{BinanceError, Result};
use crate::models::ApiErrorBody;
use crate::signing::{RequestSigner, API_KEY_HEADER};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use perp_trader_core::BinanceSettings;
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Binance USD-M futures production REST endpoint.
pub const BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";

/// Largest page `userTrades` and `income` will return.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Configuration for the futures client.
#[derive(Debug, Clone)]
pub struct BinanceClientConfig {
    pub base_url: String,
    /// Milliseconds a signed request stays valid after its timestamp.
    pub recv_window_ms: u64,
    pub requests_per_second: NonZeroU32,
    pub timeout_secs: u64,
    /// Rows requested per page; capped at [`MAX_PAGE_LIMIT`].
    pub page_limit: u32,
}

impl Default for BinanceClientConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_FUTURES_URL.to_string(),
            recv_window_ms: 5_000,
            requests_per_second: nonzero!(10u32),
            timeout_secs: 30,
            page_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl From<&BinanceSettings> for BinanceClientConfig {
    fn from(settings: &BinanceSettings) -> Self {
        let defaults = Self::default();
        Self {
            base_url: settings.rest_url.trim_end_matches('/').to_string(),
            recv_window_ms: settings.recv_window_ms,
            requests_per_second: NonZeroU32::new(settings.requests_per_second)
                .unwrap_or(defaults.requests_per_second),
            ..defaults
        }
    }
}

impl BinanceClientConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: NonZeroU32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    /// Sets the page size, clamped to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }
}

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Signed REST client for the futures account endpoints.
pub struct BinanceFuturesClient {
    pub(crate) config: BinanceClientConfig,
    http: Client,
    rate_limiter: Arc<DirectLimiter>,
    signer: RequestSigner,
}

impl std::fmt::Debug for BinanceFuturesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceFuturesClient")
            .field("config", &self.config)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl BinanceFuturesClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: BinanceClientConfig, signer: RequestSigner) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        let quota = Quota::per_second(config.requests_per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
            signer,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BinanceClientConfig {
        &self.config
    }

    /// Waits for the rate limiter and sends a signed GET.
    ///
    /// `timestamp` and `recvWindow` are appended to `params`, then the whole
    /// query string is signed and the signature appended last.
    pub(crate) async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let timestamp = chrono::Utc::now().timestamp_millis();
        let query = {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("recvWindow", &self.config.recv_window_ms.to_string());
            query.append_pair("timestamp", &timestamp.to_string());
            query.finish()
        };
        let signature = self.signer.sign(&query)?;

        let url = format!("{}{}?{}&signature={}", self.config.base_url, path, query, signature);
        tracing::debug!(path, query = %query, "GET");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .header(API_KEY_HEADER, self.signer.api_key())
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        // 418 means the IP was banned for ignoring earlier 429s.
        if status.as_u16() == 429 || status.as_u16() == 418 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(BinanceError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let text = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(body) => BinanceError::api(status.as_u16(), body.code, body.msg),
                Err(_) => BinanceError::api(status.as_u16(), 0, text),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            let snippet: String = text.chars().take(120).collect();
            BinanceError::Decode(format!("{e}: {snippet}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = BinanceSettings {
            rest_url: "https://testnet.binancefuture.com/".to_string(),
            recv_window_ms: 10_000,
            requests_per_second: 0,
        };
        let config = BinanceClientConfig::from(&settings);

        assert_eq!(config.base_url, "https://testnet.binancefuture.com");
        assert_eq!(config.recv_window_ms, 10_000);
        assert_eq!(config.requests_per_second.get(), 10);
        assert_eq!(config.page_limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_page_limit_clamped() {
        assert_eq!(BinanceClientConfig::default().with_page_limit(0).page_limit, 1);
        assert_eq!(
            BinanceClientConfig::default().with_page_limit(5_000).page_limit,
            MAX_PAGE_LIMIT
        );
    }

    #[test]
    fn test_debug_omits_secret() {
        let signer = RequestSigner::new("abcdefgh", "hunter2hunter2").unwrap();
        let client = BinanceFuturesClient::new(BinanceClientConfig::default(), signer).unwrap();
        assert!(!format!("{client:?}").contains("hunter2"));
    }
}
