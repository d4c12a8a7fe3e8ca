use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stream: StreamSettings,
    pub analytics: AnalyticsSettings,
    pub binance: BinanceSettings,
    pub decision_log: DecisionLogSettings,
}

/// Combined-stream connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub url: String,
    /// Streams per SUBSCRIBE frame.
    pub batch_size: usize,
    pub inter_batch_delay_ms: u64,
    /// A read that sees nothing for this long is treated as a dead connection.
    pub idle_timeout_secs: u64,
    pub handshake_timeout_secs: u64,
    /// Default bounded-channel size for each subscriber.
    pub subscriber_buffer: usize,
    pub reconnect: ReconnectSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Fraction of each delay randomised, 0.0..=1.0.
    pub jitter: f64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Leverage assumed for reconstructed trades; fills do not carry it.
    pub default_leverage: u32,
    pub quantity_epsilon: f64,
    pub lookback_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceSettings {
    pub rest_url: String,
    pub recv_window_ms: u64,
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionLogSettings {
    pub path: String,
    pub limit: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            url: "wss://fstream.binance.com/stream".to_string(),
            batch_size: 50,
            inter_batch_delay_ms: 100,
            idle_timeout_secs: 60,
            handshake_timeout_secs: 45,
            subscriber_buffer: 100,
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: 0.1,
            max_attempts: None,
        }
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            default_leverage: 5,
            quantity_epsilon: 0.0001,
            lookback_days: 7,
        }
    }
}

impl Default for BinanceSettings {
    fn default() -> Self {
        Self {
            rest_url: "https://fapi.binance.com".to_string(),
            recv_window_ms: 5_000,
            requests_per_second: 10,
        }
    }
}

impl Default for DecisionLogSettings {
    fn default() -> Self {
        Self {
            path: "data/decisions.jsonl".to_string(),
            limit: 100,
        }
    }
}
