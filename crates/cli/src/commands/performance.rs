//! Performance review command.
//!
//! Pulls fills from Binance when credentials are available and falls back to
//! the local decision log otherwise.

use anyhow::{Context, Result};
use clap::Args;
use perp_trader_analytics::{
    export_trades_csv, JsonlDecisionLog, MetricsFormatter, PerformanceService,
    ReconstructionConfig, TradeReconstructor,
};
use perp_trader_binance::{BinanceClientConfig, BinanceFuturesClient, RequestSigner};
use perp_trader_core::{AppConfig, DecisionLog, ExchangeHistory};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the performance command.
#[derive(Args, Debug, Clone)]
pub struct PerformanceArgs {
    /// Days of exchange history to review (defaults to config)
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Decision-log outcomes to read when falling back (defaults to config)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Print the analysis as JSON instead of a text report
    #[arg(long)]
    pub json: bool,

    /// Also write the reconstructed trades to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Binance API key
    #[arg(long, env = "BINANCE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Binance API secret
    #[arg(long, env = "BINANCE_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,
}

/// Runs the performance command.
///
/// # Errors
/// Returns an error if neither data source can be analyzed or output fails.
pub async fn run_performance(args: PerformanceArgs, config: &AppConfig) -> Result<()> {
    let history = exchange_history(&args, config)?;
    let decision_log: Arc<dyn DecisionLog> =
        Arc::new(JsonlDecisionLog::new(&config.decision_log.path));
    let reconstructor = TradeReconstructor::new(ReconstructionConfig::from(&config.analytics));
    let limit = args.limit.unwrap_or(config.decision_log.limit);
    let lookback_days = args.lookback_days.unwrap_or(config.analytics.lookback_days);

    let service = PerformanceService::new(history, decision_log, reconstructor, limit);
    let sourced = service.analyze(lookback_days).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sourced)?);
    } else {
        println!("{}", MetricsFormatter::format_sourced(&sourced));
    }

    if let Some(path) = &args.csv {
        export_trades_csv(path, &sourced.analysis.recent_trades)
            .with_context(|| format!("Failed to export trades to {}", path.display()))?;
    }

    Ok(())
}

fn exchange_history(
    args: &PerformanceArgs,
    config: &AppConfig,
) -> Result<Option<Arc<dyn ExchangeHistory>>> {
    let (Some(key), Some(secret)) = (&args.api_key, &args.api_secret) else {
        tracing::warn!("BINANCE_API_KEY/BINANCE_API_SECRET not set, only the decision log is available");
        return Ok(None);
    };

    let signer = RequestSigner::new(key.as_str(), secret.as_str())?;
    let client = BinanceFuturesClient::new(BinanceClientConfig::from(&config.binance), signer)?;
    Ok(Some(Arc::new(client)))
}
