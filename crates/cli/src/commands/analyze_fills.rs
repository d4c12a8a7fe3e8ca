//! Offline trade reconstruction from a CSV of fills.
//!
//! Expected columns: `symbol,side,position_side,quantity,price,commission,realized_pnl,time_ms`
//! with sides in exchange casing (`BUY`, `LONG`).

use anyhow::{Context, Result};
use clap::Args;
use perp_trader_analytics::{
    export_trades_csv, MetricsFormatter, PerformanceAnalyzer, ReconstructionConfig,
    TradeReconstructor,
};
use perp_trader_core::{AppConfig, Fill};
use std::path::{Path, PathBuf};

/// Arguments for the analyze-fills command.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeFillsArgs {
    /// Fills CSV file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Leverage assumed for every trade (defaults to config)
    #[arg(long)]
    pub leverage: Option<u32>,

    /// Print the analysis as JSON instead of a text report
    #[arg(long)]
    pub json: bool,

    /// Also write the reconstructed trades to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

/// Runs the analyze-fills command.
///
/// # Errors
/// Returns an error if the input cannot be read or a row is malformed.
pub fn run_analyze_fills(args: &AnalyzeFillsArgs, config: &AppConfig) -> Result<()> {
    let fills = read_fills(&args.input)?;

    let mut reconstruction_config = ReconstructionConfig::from(&config.analytics);
    if let Some(leverage) = args.leverage {
        reconstruction_config.default_leverage = leverage.max(1);
    }

    let reconstruction = TradeReconstructor::new(reconstruction_config).reconstruct(&fills);
    let open = reconstruction.open_positions().len();
    if open > 0 {
        tracing::info!(open, "Positions still open at end of input, excluded from analysis");
    }

    let analysis = PerformanceAnalyzer::analyze(&reconstruction.into_trades());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}", MetricsFormatter::format(&analysis));
    }

    if let Some(path) = &args.csv {
        export_trades_csv(path, &analysis.recent_trades)?;
    }

    Ok(())
}

fn read_fills(path: &Path) -> Result<Vec<Fill>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open fills CSV: {}", path.display()))?;

    let mut fills = Vec::new();
    for (row, record) in reader.deserialize::<Fill>().enumerate() {
        // Header is line 1.
        let fill = record.with_context(|| format!("Invalid fill on line {}", row + 2))?;
        fills.push(fill);
    }

    tracing::info!(path = %path.display(), fills = fills.len(), "Loaded fills");
    Ok(fills)
}
