//! Result types shared by the reconstruction/analysis engine and its consumers.
//!
//! All of these are plain values: a fresh [`PerformanceAnalysis`] is produced by
//! every analysis call and nothing here is mutated after construction.

use crate::fill::PositionSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fully closed position cycle.
///
/// Numeric fields default to zero when absent so that lower-fidelity sources
/// (the local decision log) can still be analyzed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeOutcome {
    pub symbol: String,
    pub side: PositionSide,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub leverage: u32,
    /// Quantity-weighted average entry price.
    #[serde(default)]
    pub open_price: f64,
    /// Price of the fill that closed the cycle.
    #[serde(default)]
    pub close_price: f64,
    /// `open_price * quantity`.
    #[serde(default)]
    pub position_value: f64,
    /// `position_value / leverage`.
    #[serde(default)]
    pub margin_used: f64,
    /// Realized PnL net of commission.
    pub pnl: f64,
    /// `pnl / margin_used * 100`.
    #[serde(default)]
    pub pnl_pct: f64,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: i64,
}

impl TradeOutcome {
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}

/// Per-symbol totals, recomputed from the full outcome set on each analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SymbolPerformance {
    pub symbol: String,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub win_rate: f64,
}

/// Aggregate review statistics over a set of trade outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceAnalysis {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percentage in `[0, 100]`.
    pub win_rate: f64,
    /// Mean PnL of winning trades.
    pub avg_win: f64,
    /// Mean PnL of losing trades (negative).
    pub avg_loss: f64,
    pub total_pnl: f64,
    /// `avg_win / -avg_loss`, capped at 100.
    pub profit_factor: f64,
    /// Trade-level, non-annualized, clipped to `[-3, 3]`.
    pub sharpe_ratio: f64,
    /// Outcomes ordered by close time.
    pub recent_trades: Vec<TradeOutcome>,
    pub symbol_stats: BTreeMap<String, SymbolPerformance>,
}
