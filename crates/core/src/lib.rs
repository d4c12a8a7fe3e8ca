pub mod config;
pub mod config_loader;
pub mod fill;
pub mod performance;
pub mod traits;

pub use config::{
    AnalyticsSettings, AppConfig, BinanceSettings, DecisionLogSettings, ReconnectSettings,
    StreamSettings,
};
pub use config_loader::ConfigLoader;
pub use fill::{Fill, FillSide, PositionSide};
pub use performance::{PerformanceAnalysis, SymbolPerformance, TradeOutcome};
pub use traits::{DecisionLog, ExchangeHistory};
