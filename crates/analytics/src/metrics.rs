use perp_trader_core::{PerformanceAnalysis, SymbolPerformance, TradeOutcome};
use std::collections::BTreeMap;

/// Profit factor reported when there are wins but no losses.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;
/// Trade-level Sharpe ratios are clipped to `[-SHARPE_CLIP, SHARPE_CLIP]`.
pub const SHARPE_CLIP: f64 = 3.0;

pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    /// Computes aggregate and per-symbol statistics.
    ///
    /// Never fails: an empty slice yields an all-zero analysis.
    #[must_use]
    pub fn analyze(trades: &[TradeOutcome]) -> PerformanceAnalysis {
        let mut recent_trades = trades.to_vec();
        recent_trades.sort_by(|a, b| a.close_time.cmp(&b.close_time));

        let total_trades = trades.len();
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).collect();

        let avg_win = mean(&wins);
        let avg_loss = mean(&losses);
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();

        let returns = Self::per_trade_returns(trades);
        let sharpe_ratio = if total_trades >= 2 {
            Self::sharpe_ratio(&returns)
        } else {
            0.0
        };

        let analysis = PerformanceAnalysis {
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: percentage(wins.len(), total_trades),
            avg_win,
            avg_loss,
            total_pnl,
            profit_factor: Self::profit_factor(wins.len(), losses.len(), avg_win, avg_loss),
            sharpe_ratio,
            symbol_stats: Self::symbol_stats(trades),
            recent_trades,
        };

        tracing::info!(
            trades = analysis.total_trades,
            wins = analysis.winning_trades,
            losses = analysis.losing_trades,
            win_rate = analysis.win_rate,
            profit_factor = analysis.profit_factor,
            sharpe = analysis.sharpe_ratio,
            "Performance analyzed"
        );
        analysis
    }

    /// Return of one trade against its capital base.
    ///
    /// The base is the first positive value among margin used, position value,
    /// and `open_price * quantity / leverage` (the division is skipped when
    /// leverage is zero). `None` when no base is available.
    ///
    /// Bases can differ between trades of one sample, so the resulting Sharpe
    /// is an approximation.
    #[must_use]
    pub fn trade_return(trade: &TradeOutcome) -> Option<f64> {
        let base = if trade.margin_used > 0.0 {
            trade.margin_used
        } else if trade.position_value > 0.0 {
            trade.position_value
        } else if trade.open_price > 0.0 && trade.quantity > 0.0 {
            let notional = trade.open_price * trade.quantity;
            if trade.leverage > 0 {
                notional / f64::from(trade.leverage)
            } else {
                notional
            }
        } else {
            0.0
        };

        if base > 0.0 {
            let r = trade.pnl / base;
            r.is_finite().then_some(r)
        } else {
            None
        }
    }

    /// Per-trade returns in input order, skipping trades without a usable base.
    #[must_use]
    pub fn per_trade_returns(trades: &[TradeOutcome]) -> Vec<f64> {
        trades
            .iter()
            .enumerate()
            .filter_map(|(i, trade)| {
                let r = Self::trade_return(trade);
                match r {
                    Some(r) => tracing::debug!(trade = i + 1, symbol = %trade.symbol, r, "Trade return"),
                    None => tracing::debug!(trade = i + 1, symbol = %trade.symbol, "No capital base, skipped"),
                }
                r
            })
            .collect()
    }

    /// Mean over population standard deviation, not annualized.
    ///
    /// Zero with fewer than two returns or zero dispersion; otherwise clipped
    /// to `[-3, 3]`.
    #[must_use]
    pub fn sharpe_ratio(returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let mean_return = mean(returns);
        #[allow(clippy::cast_precision_loss)]
        let variance = returns
            .iter()
            .map(|r| (r - mean_return).powi(2))
            .sum::<f64>()
            / returns.len() as f64;
        let std_dev = variance.sqrt();

        if std_dev > 0.0 && std_dev.is_finite() {
            (mean_return / std_dev).clamp(-SHARPE_CLIP, SHARPE_CLIP)
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn profit_factor(wins: usize, losses: usize, avg_win: f64, avg_loss: f64) -> f64 {
        if losses > 0 && avg_loss != 0.0 {
            (avg_win / -avg_loss).min(PROFIT_FACTOR_CAP)
        } else if wins > 0 {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        }
    }

    fn symbol_stats(trades: &[TradeOutcome]) -> BTreeMap<String, SymbolPerformance> {
        let mut stats: BTreeMap<String, SymbolPerformance> = BTreeMap::new();

        for trade in trades {
            let entry = stats
                .entry(trade.symbol.clone())
                .or_insert_with(|| SymbolPerformance {
                    symbol: trade.symbol.clone(),
                    ..SymbolPerformance::default()
                });
            entry.total_trades += 1;
            entry.total_pnl += trade.pnl;
            if trade.is_win() {
                entry.winning_trades += 1;
            } else if trade.is_loss() {
                entry.losing_trades += 1;
            }
        }

        for entry in stats.values_mut() {
            entry.win_rate = percentage(entry.winning_trades, entry.total_trades);
            #[allow(clippy::cast_precision_loss)]
            {
                entry.avg_pnl = entry.total_pnl / entry.total_trades as f64;
            }
        }

        stats
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
