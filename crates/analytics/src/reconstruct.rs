//! Folds exchange fills into completed round-trip trades.
//!
//! Each symbol carries two independent accumulators (LONG and SHORT). Opening
//! legs add quantity and cost; closing legs remove quantity and collect realized
//! PnL plus commission. When a closing leg brings the open quantity down to the
//! epsilon or below, one [`TradeOutcome`] is emitted and the accumulator resets.

use chrono::{DateTime, Utc};
use perp_trader_core::{AnalyticsSettings, Fill, PositionSide, TradeOutcome};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionConfig {
    /// Fills carry no leverage, so every outcome is sized with this value.
    pub default_leverage: u32,
    /// Open quantity at or below this counts as flat.
    pub epsilon: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            default_leverage: 5,
            epsilon: 0.0001,
        }
    }
}

impl From<&AnalyticsSettings> for ReconstructionConfig {
    fn from(settings: &AnalyticsSettings) -> Self {
        Self {
            default_leverage: settings.default_leverage.max(1),
            epsilon: settings.quantity_epsilon.abs(),
        }
    }
}

/// Running state of one symbol × position-side bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionAccumulator {
    pub quantity: f64,
    /// Quantity added by opening legs in this cycle.
    pub opened_quantity: f64,
    /// Sum of `price * quantity` over opening legs.
    pub cost: f64,
    pub realized_pnl: f64,
    pub commission: f64,
    pub fill_count: usize,
    pub opened_at_ms: Option<i64>,
}

impl PositionAccumulator {
    /// Quantity-weighted average entry price of the cycle.
    #[must_use]
    pub fn average_open_price(&self) -> f64 {
        if self.opened_quantity > 0.0 {
            self.cost / self.opened_quantity
        } else {
            0.0
        }
    }

    fn is_flat(&self, epsilon: f64) -> bool {
        self.quantity <= epsilon
    }
}

/// A cycle that never closed within the fill window.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub symbol: String,
    pub side: PositionSide,
    pub state: PositionAccumulator,
}

/// Output of one reconstruction run.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Closed trades ordered by close time, then symbol.
    pub trades: Vec<TradeOutcome>,
    open: Vec<OpenPosition>,
}

impl Reconstruction {
    /// Partial positions left open at the end of the window. Diagnostic only;
    /// they never enter the analysis.
    #[must_use]
    pub fn open_positions(&self) -> &[OpenPosition] {
        &self.open
    }

    #[must_use]
    pub fn into_trades(self) -> Vec<TradeOutcome> {
        self.trades
    }
}

#[derive(Debug, Clone, Default)]
pub struct TradeReconstructor {
    config: ReconstructionConfig,
}

impl TradeReconstructor {
    #[must_use]
    pub fn new(config: ReconstructionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Reconstructs trades from fills of any mix of symbols.
    ///
    /// Fills are grouped by symbol and ordered by timestamp within each group;
    /// legs sharing a timestamp keep their input order.
    ///
    /// A closing fill that meets a flat bucket belongs to a position opened
    /// before the first fill seen here. It is dropped, so its realized PnL is
    /// absent from the outcomes and from any win/loss counts built on them.
    /// Widen the fill window if those positions must be counted.
    #[must_use]
    pub fn reconstruct(&self, fills: &[Fill]) -> Reconstruction {
        let mut by_symbol: BTreeMap<&str, Vec<&Fill>> = BTreeMap::new();
        for fill in fills {
            by_symbol.entry(fill.symbol.as_str()).or_default().push(fill);
        }

        let mut result = Reconstruction::default();
        for (symbol, mut legs) in by_symbol {
            legs.sort_by_key(|f| f.time_ms);
            self.fold_symbol(symbol, legs, &mut result);
        }

        sort_outcomes(&mut result.trades);
        tracing::debug!(
            fills = fills.len(),
            trades = result.trades.len(),
            open = result.open.len(),
            "Reconstructed trades"
        );
        result
    }

    /// Same as [`Self::reconstruct`] for fills already keyed by symbol,
    /// including the handling of closes with no open quantity.
    #[must_use]
    pub fn reconstruct_by_symbol(&self, fills: &BTreeMap<String, Vec<Fill>>) -> Reconstruction {
        let mut result = Reconstruction::default();
        for (symbol, legs) in fills {
            let mut legs: Vec<&Fill> = legs.iter().collect();
            legs.sort_by_key(|f| f.time_ms);
            self.fold_symbol(symbol, legs, &mut result);
        }

        sort_outcomes(&mut result.trades);
        result
    }

    fn fold_symbol(&self, symbol: &str, legs: Vec<&Fill>, out: &mut Reconstruction) {
        let mut long = PositionAccumulator::default();
        let mut short = PositionAccumulator::default();

        for fill in legs {
            let acc = match fill.position_side {
                PositionSide::Long => &mut long,
                PositionSide::Short => &mut short,
                PositionSide::Both => continue,
            };

            if fill.is_opening() {
                if acc.opened_at_ms.is_none() {
                    acc.opened_at_ms = Some(fill.time_ms);
                }
                acc.cost += fill.price * fill.quantity;
                acc.quantity += fill.quantity;
                acc.opened_quantity += fill.quantity;
                acc.fill_count += 1;
                continue;
            }

            if acc.is_flat(self.config.epsilon) {
                tracing::debug!(
                    symbol,
                    side = %fill.position_side,
                    qty = fill.quantity,
                    time_ms = fill.time_ms,
                    "Ignoring close with no open quantity"
                );
                continue;
            }

            let open_before = acc.quantity;
            acc.realized_pnl += fill.realized_pnl;
            acc.commission += fill.commission;
            acc.quantity -= fill.quantity;
            acc.fill_count += 1;

            if acc.is_flat(self.config.epsilon) {
                out.trades
                    .push(self.finalize(symbol, fill, acc, open_before));
                *acc = PositionAccumulator::default();
            }
        }

        for (side, acc) in [(PositionSide::Long, long), (PositionSide::Short, short)] {
            if acc.fill_count > 0 {
                out.open.push(OpenPosition {
                    symbol: symbol.to_string(),
                    side,
                    state: acc,
                });
            }
        }
    }

    fn finalize(
        &self,
        symbol: &str,
        closing: &Fill,
        acc: &PositionAccumulator,
        quantity: f64,
    ) -> TradeOutcome {
        let leverage = self.config.default_leverage.max(1);
        let open_price = acc.average_open_price();
        let position_value = open_price * quantity;
        let margin_used = position_value / f64::from(leverage);
        let pnl = acc.realized_pnl - acc.commission;
        let pnl_pct = if margin_used > 0.0 {
            pnl / margin_used * 100.0
        } else {
            0.0
        };
        let opened_at = acc.opened_at_ms.unwrap_or(closing.time_ms);

        TradeOutcome {
            symbol: symbol.to_string(),
            side: closing.position_side,
            quantity,
            leverage,
            open_price,
            close_price: closing.price,
            position_value,
            margin_used,
            pnl,
            pnl_pct,
            open_time: millis_to_utc(opened_at),
            close_time: millis_to_utc(closing.time_ms),
            duration_ms: closing.time_ms - opened_at,
        }
    }
}

fn sort_outcomes(trades: &mut [TradeOutcome]) {
    trades.sort_by(|a, b| {
        a.close_time
            .cmp(&b.close_time)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use perp_trader_core::FillSide;

    #[allow(clippy::too_many_arguments)]
    fn fill(
        symbol: &str,
        side: FillSide,
        position_side: PositionSide,
        quantity: f64,
        price: f64,
        realized_pnl: f64,
        commission: f64,
        time_ms: i64,
    ) -> Fill {
        Fill {
            symbol: symbol.to_string(),
            side,
            position_side,
            quantity,
            price,
            commission,
            realized_pnl,
            time_ms,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_single_long_round_trip() {
        let fills = vec![
            fill("BTCUSDT", FillSide::Buy, PositionSide::Long, 1.0, 100.0, 0.0, 0.0, 1_000),
            fill("BTCUSDT", FillSide::Sell, PositionSide::Long, 1.0, 110.0, 10.0, 0.2, 61_000),
        ];

        let trades = TradeReconstructor::default().reconstruct(&fills).into_trades();
        assert_eq!(trades.len(), 1);

        let t = &trades[0];
        assert_eq!(t.side, PositionSide::Long);
        assert_eq!(t.leverage, 5);
        assert_close(t.quantity, 1.0);
        assert_close(t.open_price, 100.0);
        assert_close(t.close_price, 110.0);
        assert_close(t.position_value, 100.0);
        assert_close(t.margin_used, 20.0);
        assert_close(t.pnl, 9.8);
        assert_close(t.pnl_pct, 49.0);
        assert_eq!(t.duration_ms, 60_000);
        assert_eq!(t.open_time.timestamp_millis(), 1_000);
        assert_eq!(t.close_time.timestamp_millis(), 61_000);
    }

    #[test]
    fn test_weighted_open_price_and_partial_closes() {
        let fills = vec![
            fill("ETHUSDT", FillSide::Sell, PositionSide::Short, 1.0, 200.0, 0.0, 0.0, 1),
            fill("ETHUSDT", FillSide::Sell, PositionSide::Short, 3.0, 220.0, 0.0, 0.0, 2),
            fill("ETHUSDT", FillSide::Buy, PositionSide::Short, 2.0, 210.0, 10.0, 0.1, 3),
            fill("ETHUSDT", FillSide::Buy, PositionSide::Short, 2.0, 205.0, 20.0, 0.1, 4),
        ];

        let trades = TradeReconstructor::default().reconstruct(&fills).into_trades();
        assert_eq!(trades.len(), 1, "one cycle despite two closing legs");

        let t = &trades[0];
        assert_eq!(t.side, PositionSide::Short);
        assert_close(t.open_price, 215.0);
        assert_close(t.quantity, 2.0);
        assert_close(t.position_value, 430.0);
        assert_close(t.pnl, 29.8);
        assert_close(t.close_price, 205.0);
        assert_eq!(t.duration_ms, 3);
    }

    #[test]
    fn test_float_drift_within_epsilon_closes_cycle() {
        let fills = vec![
            fill("SOLUSDT", FillSide::Buy, PositionSide::Long, 0.1, 10.0, 0.0, 0.0, 1),
            fill("SOLUSDT", FillSide::Buy, PositionSide::Long, 0.2, 10.0, 0.0, 0.0, 2),
            fill("SOLUSDT", FillSide::Sell, PositionSide::Long, 0.29995, 11.0, 0.3, 0.0, 3),
        ];

        let result = TradeReconstructor::default().reconstruct(&fills);
        assert_eq!(result.trades.len(), 1);
        assert!(result.open_positions().is_empty());
    }

    #[test]
    fn test_hedge_mode_sides_are_independent() {
        let fills = vec![
            fill("BTCUSDT", FillSide::Buy, PositionSide::Long, 1.0, 100.0, 0.0, 0.0, 1),
            fill("BTCUSDT", FillSide::Sell, PositionSide::Short, 1.0, 101.0, 0.0, 0.0, 2),
            fill("BTCUSDT", FillSide::Buy, PositionSide::Short, 1.0, 99.0, 2.0, 0.0, 3),
            fill("BTCUSDT", FillSide::Sell, PositionSide::Long, 1.0, 98.0, -2.0, 0.0, 4),
        ];

        let trades = TradeReconstructor::default().reconstruct(&fills).into_trades();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, PositionSide::Short);
        assert_close(trades[0].pnl, 2.0);
        assert_eq!(trades[1].side, PositionSide::Long);
        assert_close(trades[1].pnl, -2.0);
    }

    #[test]
    fn test_each_closed_cycle_emits_one_outcome() {
        let mut fills = Vec::new();
        for cycle in 0..3_i64 {
            let t = cycle * 10;
            fills.push(fill("XRPUSDT", FillSide::Buy, PositionSide::Long, 5.0, 1.0, 0.0, 0.0, t));
            fills.push(fill("XRPUSDT", FillSide::Sell, PositionSide::Long, 2.0, 1.1, 0.2, 0.01, t + 1));
            fills.push(fill("XRPUSDT", FillSide::Sell, PositionSide::Long, 3.0, 1.2, 0.6, 0.01, t + 2));
        }

        let trades = TradeReconstructor::default().reconstruct(&fills).into_trades();
        assert_eq!(trades.len(), 3);
        for t in &trades {
            assert_close(t.pnl, 0.8 - 0.02);
        }
    }

    #[test]
    fn test_unclosed_position_is_excluded() {
        let fills = vec![
            fill("BTCUSDT", FillSide::Buy, PositionSide::Long, 2.0, 100.0, 0.0, 0.0, 1),
            fill("BTCUSDT", FillSide::Sell, PositionSide::Long, 1.0, 105.0, 5.0, 0.0, 2),
        ];

        let result = TradeReconstructor::default().reconstruct(&fills);
        assert!(result.trades.is_empty());

        let open = result.open_positions();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].side, PositionSide::Long);
        assert_close(open[0].state.quantity, 1.0);
        assert_close(open[0].state.realized_pnl, 5.0);
    }

    #[test]
    fn test_orphan_close_and_one_way_fills_are_ignored() {
        let fills = vec![
            fill("BTCUSDT", FillSide::Sell, PositionSide::Long, 1.0, 100.0, 3.0, 0.1, 1),
            fill("BTCUSDT", FillSide::Buy, PositionSide::Both, 1.0, 100.0, 0.0, 0.0, 2),
            fill("BTCUSDT", FillSide::Sell, PositionSide::Both, 1.0, 120.0, 20.0, 0.0, 3),
        ];

        let result = TradeReconstructor::default().reconstruct(&fills);
        assert!(result.trades.is_empty());
        assert!(result.open_positions().is_empty());
    }

    #[test]
    fn test_orphan_close_pnl_does_not_leak_into_next_cycle() {
        let fills = vec![
            fill("ETHUSDT", FillSide::Buy, PositionSide::Short, 2.0, 40.0, 15.0, 0.3, 1),
            fill("ETHUSDT", FillSide::Sell, PositionSide::Short, 1.0, 50.0, 0.0, 0.0, 2),
            fill("ETHUSDT", FillSide::Buy, PositionSide::Short, 1.0, 45.0, 5.0, 0.1, 3),
        ];

        let trades = TradeReconstructor::default().reconstruct(&fills).into_trades();
        assert_eq!(trades.len(), 1);
        assert_close(trades[0].pnl, 4.9);
        assert_close(trades[0].open_price, 50.0);
        assert_eq!(trades[0].open_time.timestamp_millis(), 2);
    }

    #[test]
    fn test_maker_rebate_adds_to_pnl() {
        let fills = vec![
            fill("BTCUSDT", FillSide::Buy, PositionSide::Long, 1.0, 100.0, 0.0, 0.0, 1),
            fill("BTCUSDT", FillSide::Sell, PositionSide::Long, 1.0, 110.0, 10.0, -0.05, 2),
        ];

        let trades = TradeReconstructor::default().reconstruct(&fills).into_trades();
        assert_close(trades[0].pnl, 10.05);
    }

    #[test]
    fn test_out_of_order_input_is_sorted_per_symbol() {
        let fills = vec![
            fill("BTCUSDT", FillSide::Sell, PositionSide::Long, 1.0, 110.0, 10.0, 0.0, 20),
            fill("ETHUSDT", FillSide::Buy, PositionSide::Long, 1.0, 50.0, 0.0, 0.0, 5),
            fill("BTCUSDT", FillSide::Buy, PositionSide::Long, 1.0, 100.0, 0.0, 0.0, 10),
            fill("ETHUSDT", FillSide::Sell, PositionSide::Long, 1.0, 55.0, 5.0, 0.0, 15),
        ];

        let trades = TradeReconstructor::default().reconstruct(&fills).into_trades();
        let symbols: Vec<&str> = trades.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ETHUSDT", "BTCUSDT"]);
    }

    #[test]
    fn test_configured_leverage_sizes_margin() {
        let config = ReconstructionConfig {
            default_leverage: 10,
            ..ReconstructionConfig::default()
        };
        let mut by_symbol = BTreeMap::new();
        by_symbol.insert(
            "BTCUSDT".to_string(),
            vec![
                fill("BTCUSDT", FillSide::Buy, PositionSide::Long, 1.0, 100.0, 0.0, 0.0, 1),
                fill("BTCUSDT", FillSide::Sell, PositionSide::Long, 1.0, 90.0, -10.0, 0.0, 2),
            ],
        );

        let trades = TradeReconstructor::new(config)
            .reconstruct_by_symbol(&by_symbol)
            .into_trades();
        assert_eq!(trades[0].leverage, 10);
        assert_close(trades[0].margin_used, 10.0);
        assert_close(trades[0].pnl_pct, -100.0);
    }

    #[test]
    fn test_settings_conversion_guards_zero_leverage() {
        let settings = AnalyticsSettings {
            default_leverage: 0,
            ..AnalyticsSettings::default()
        };
        assert_eq!(ReconstructionConfig::from(&settings).default_leverage, 1);
    }
}
