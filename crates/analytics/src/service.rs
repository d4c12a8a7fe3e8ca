use crate::metrics::PerformanceAnalyzer;
use crate::reconstruct::TradeReconstructor;
use anyhow::{anyhow, Context, Result};
use perp_trader_core::{DecisionLog, ExchangeHistory, PerformanceAnalysis};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where an analysis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Fills reconstructed from the exchange's trade history.
    Exchange,
    /// Outcomes recorded locally; smaller and less accurate sample.
    DecisionLog,
}

/// An analysis tagged with the data source that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcedAnalysis {
    pub source: DataSource,
    #[serde(flatten)]
    pub analysis: PerformanceAnalysis,
}

/// Exchange-first performance analysis with a local decision-log fallback.
pub struct PerformanceService {
    history: Option<Arc<dyn ExchangeHistory>>,
    decision_log: Arc<dyn DecisionLog>,
    reconstructor: TradeReconstructor,
    decision_limit: usize,
}

impl PerformanceService {
    pub fn new(
        history: Option<Arc<dyn ExchangeHistory>>,
        decision_log: Arc<dyn DecisionLog>,
        reconstructor: TradeReconstructor,
        decision_limit: usize,
    ) -> Self {
        Self {
            history,
            decision_log,
            reconstructor,
            decision_limit,
        }
    }

    /// Analyzes the last `lookback_days` of exchange fills, or the most recent
    /// decision-log outcomes if the exchange path fails.
    ///
    /// # Errors
    /// Returns an error naming both causes when both sources fail.
    pub async fn analyze(&self, lookback_days: u32) -> Result<SourcedAnalysis> {
        let exchange_err = match self.from_exchange(lookback_days).await {
            Ok(analysis) => {
                return Ok(SourcedAnalysis {
                    source: DataSource::Exchange,
                    analysis,
                })
            }
            Err(e) => e,
        };

        tracing::warn!(
            error = %format!("{exchange_err:#}"),
            limit = self.decision_limit,
            "Exchange history unavailable, falling back to local decision log"
        );

        match self.decision_log.recent_outcomes(self.decision_limit).await {
            Ok(analysis) => Ok(SourcedAnalysis {
                source: DataSource::DecisionLog,
                analysis,
            }),
            Err(log_err) => Err(anyhow!(
                "exchange history failed: {exchange_err:#}; decision log failed: {log_err:#}"
            )),
        }
    }

    async fn from_exchange(&self, lookback_days: u32) -> Result<PerformanceAnalysis> {
        let history = self
            .history
            .as_ref()
            .ok_or_else(|| anyhow!("no exchange history client configured"))?;

        let fills = history
            .all_fills(lookback_days)
            .await
            .context("Failed to fetch exchange fill history")?;

        let total: usize = fills.values().map(Vec::len).sum();
        for (symbol, legs) in &fills {
            tracing::debug!(symbol = %symbol, fills = legs.len(), "Fetched fills");
        }
        tracing::info!(symbols = fills.len(), fills = total, lookback_days, "Fetched exchange fill history");

        let reconstruction = self.reconstructor.reconstruct_by_symbol(&fills);
        if !reconstruction.open_positions().is_empty() {
            tracing::debug!(
                open = reconstruction.open_positions().len(),
                "Positions still open at end of window were excluded"
            );
        }
        Ok(PerformanceAnalyzer::analyze(&reconstruction.trades))
    }
}
