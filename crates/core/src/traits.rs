use crate::fill::Fill;
use crate::performance::PerformanceAnalysis;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Source of executed fills from the exchange's REST history.
#[async_trait]
pub trait ExchangeHistory: Send + Sync {
    /// Fills for one symbol over the last `lookback_days`, oldest first.
    async fn fills(&self, symbol: &str, lookback_days: u32) -> Result<Vec<Fill>>;

    /// Fills for every symbol traded in the window, keyed by symbol.
    async fn all_fills(&self, lookback_days: u32) -> Result<BTreeMap<String, Vec<Fill>>>;
}

/// Locally recorded decision outcomes; a lower-fidelity fallback for [`ExchangeHistory`].
#[async_trait]
pub trait DecisionLog: Send + Sync {
    async fn recent_outcomes(&self, limit: usize) -> Result<PerformanceAnalysis>;
}
