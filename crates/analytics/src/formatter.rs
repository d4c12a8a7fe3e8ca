#![allow(clippy::format_push_string)]
#![allow(clippy::uninlined_format_args)]

use crate::service::{DataSource, SourcedAnalysis};
use perp_trader_core::PerformanceAnalysis;

pub struct MetricsFormatter;

impl MetricsFormatter {
    #[must_use]
    pub fn format(analysis: &PerformanceAnalysis) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                    PERFORMANCE REVIEW                         \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        // Trade Statistics
        output.push_str("Trade Statistics\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Total Trades:          {}\n", analysis.total_trades));
        output.push_str(&format!("Winning Trades:        {}\n", analysis.winning_trades));
        output.push_str(&format!("Losing Trades:         {}\n", analysis.losing_trades));

        if analysis.total_trades > 0 {
            output.push_str(&format!("Win Rate:              {:.2}%\n", analysis.win_rate));
        } else {
            output.push_str("Win Rate:              N/A (no trades)\n");
        }
        output.push('\n');

        // PnL
        output.push_str("Profit & Loss\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Total PnL:             ${:.2}\n", analysis.total_pnl));
        output.push_str(&format!("Average Win:           ${:.2}\n", analysis.avg_win));
        output.push_str(&format!("Average Loss:          ${:.2}\n", analysis.avg_loss));
        output.push_str(&format!("Profit Factor:         {:.2}\n", analysis.profit_factor));
        output.push_str(&format!("Sharpe Ratio:          {:.4}  (per trade)\n", analysis.sharpe_ratio));
        output.push('\n');

        if !analysis.symbol_stats.is_empty() {
            output.push_str("By Symbol\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!(
                "{:<14} {:>7} {:>6} {:>7} {:>10} {:>12}\n",
                "Symbol", "Trades", "Wins", "Losses", "Win Rate", "Avg PnL"
            ));
            for stats in analysis.symbol_stats.values() {
                output.push_str(&format!(
                    "{:<14} {:>7} {:>6} {:>7} {:>9.2}% {:>12.2}\n",
                    stats.symbol,
                    stats.total_trades,
                    stats.winning_trades,
                    stats.losing_trades,
                    stats.win_rate,
                    stats.avg_pnl
                ));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");

        if analysis.total_trades == 0 {
            output.push_str("\n⚠️  No closed trades in this window.\n\n");
        }

        output
    }

    /// Same report prefixed with the data source line.
    #[must_use]
    pub fn format_sourced(sourced: &SourcedAnalysis) -> String {
        let source = match sourced.source {
            DataSource::Exchange => "exchange trade history",
            DataSource::DecisionLog => "local decision log (fallback, lower fidelity)",
        };
        format!("Source: {}\n{}", source, Self::format(&sourced.analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perp_trader_core::SymbolPerformance;

    #[test]
    fn test_report_includes_ratios_and_symbols() {
        let mut analysis = PerformanceAnalysis {
            total_trades: 2,
            winning_trades: 1,
            losing_trades: 1,
            win_rate: 50.0,
            profit_factor: 2.5,
            sharpe_ratio: 0.4286,
            ..PerformanceAnalysis::default()
        };
        analysis.symbol_stats.insert(
            "BTCUSDT".to_string(),
            SymbolPerformance {
                symbol: "BTCUSDT".to_string(),
                total_trades: 2,
                winning_trades: 1,
                losing_trades: 1,
                total_pnl: 6.0,
                avg_pnl: 3.0,
                win_rate: 50.0,
            },
        );

        let report = MetricsFormatter::format(&analysis);
        assert!(report.contains("Win Rate:              50.00%"));
        assert!(report.contains("Profit Factor:         2.50"));
        assert!(report.contains("Sharpe Ratio:          0.4286"));
        assert!(report.contains("BTCUSDT"));
        assert!(!report.contains("No closed trades"));
    }

    #[test]
    fn test_empty_report_warns() {
        let sourced = SourcedAnalysis {
            source: DataSource::DecisionLog,
            analysis: PerformanceAnalysis::default(),
        };
        let report = MetricsFormatter::format_sourced(&sourced);
        assert!(report.starts_with("Source: local decision log"));
        assert!(report.contains("N/A (no trades)"));
        assert!(report.contains("No closed trades"));
    }
}
