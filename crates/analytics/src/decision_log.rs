use crate::metrics::PerformanceAnalyzer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use perp_trader_core::{DecisionLog, PerformanceAnalysis, TradeOutcome};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Append-only JSON Lines file of locally recorded trade outcomes.
///
/// One [`TradeOutcome`] per line, oldest first. Malformed lines are skipped
/// with a warning rather than failing the whole read.
#[derive(Debug, Clone)]
pub struct JsonlDecisionLog {
    path: PathBuf,
}

impl JsonlDecisionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The most recent `limit` outcomes, oldest first. A missing file reads as empty.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub async fn read_recent(&self, limit: usize) -> Result<Vec<TradeOutcome>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Decision log not found, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read decision log: {}", self.path.display())
                })
            }
        };

        let mut outcomes = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<TradeOutcome>(line) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping malformed decision log entry"
                ),
            }
        }

        let skip = outcomes.len().saturating_sub(limit);
        Ok(outcomes.split_off(skip))
    }

    /// Appends one outcome, creating the file and its parent directory if needed.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or written.
    pub async fn append(&self, outcome: &TradeOutcome) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut line = serde_json::to_string(outcome)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open decision log: {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl DecisionLog for JsonlDecisionLog {
    async fn recent_outcomes(&self, limit: usize) -> Result<PerformanceAnalysis> {
        let outcomes = self.read_recent(limit).await?;
        tracing::info!(
            path = %self.path.display(),
            outcomes = outcomes.len(),
            "Analyzing local decision log"
        );
        Ok(PerformanceAnalyzer::analyze(&outcomes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use perp_trader_core::PositionSide;
    use tempfile::TempDir;

    fn outcome(symbol: &str, pnl: f64, close_secs: i64) -> TradeOutcome {
        TradeOutcome {
            symbol: symbol.to_string(),
            side: PositionSide::Short,
            quantity: 1.0,
            leverage: 5,
            open_price: 100.0,
            close_price: 100.0,
            position_value: 100.0,
            margin_used: 20.0,
            pnl,
            pnl_pct: pnl / 20.0 * 100.0,
            open_time: DateTime::<Utc>::from_timestamp(close_secs - 60, 0).unwrap(),
            close_time: DateTime::<Utc>::from_timestamp(close_secs, 0).unwrap(),
            duration_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn test_append_then_read_recent_keeps_tail() {
        let dir = TempDir::new().unwrap();
        let log = JsonlDecisionLog::new(dir.path().join("logs").join("decisions.jsonl"));

        for i in 0..5_i32 {
            log.append(&outcome("BTCUSDT", f64::from(i), 1_000 + i64::from(i)))
                .await
                .unwrap();
        }

        let recent = log.read_recent(3).await.unwrap();
        let pnls: Vec<f64> = recent.iter().map(|o| o.pnl).collect();
        assert_eq!(pnls, vec![2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = JsonlDecisionLog::new(dir.path().join("absent.jsonl"));

        assert!(log.read_recent(10).await.unwrap().is_empty());
        let analysis = log.recent_outcomes(10).await.unwrap();
        assert_eq!(analysis.total_trades, 0);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let good = serde_json::to_string(&outcome("ETHUSDT", 4.0, 2_000)).unwrap();
        std::fs::write(&path, format!("{good}\nnot json\n\n{{\"symbol\":1}}\n{good}\n")).unwrap();

        let log = JsonlDecisionLog::new(&path);
        let analysis = log.recent_outcomes(100).await.unwrap();
        assert_eq!(analysis.total_trades, 2);
        assert_eq!(analysis.winning_trades, 2);
        assert_eq!(analysis.symbol_stats["ETHUSDT"].total_trades, 2);
    }
}
