//! Trade reconstruction and performance analytics.
//!
//! Exchange fills are folded into round-trip [`TradeOutcome`](perp_trader_core::TradeOutcome)s
//! by [`TradeReconstructor`], then summarized by [`PerformanceAnalyzer`].
//! [`PerformanceService`] wires both to an exchange history source with a
//! local decision-log fallback.

pub mod decision_log;
pub mod export;
pub mod formatter;
pub mod metrics;
pub mod reconstruct;
pub mod service;

pub use decision_log::JsonlDecisionLog;
pub use export::export_trades_csv;
pub use formatter::MetricsFormatter;
pub use metrics::{PerformanceAnalyzer, PROFIT_FACTOR_CAP, SHARPE_CLIP};
pub use reconstruct::{
    OpenPosition, PositionAccumulator, Reconstruction, ReconstructionConfig, TradeReconstructor,
};
pub use service::{DataSource, PerformanceService, SourcedAnalysis};
