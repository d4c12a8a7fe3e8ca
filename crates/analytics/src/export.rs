use anyhow::{Context, Result};
use csv::Writer;
use perp_trader_core::TradeOutcome;
use std::fs::File;
use std::path::Path;

const HEADER: [&str; 13] = [
    "symbol",
    "side",
    "quantity",
    "leverage",
    "open_price",
    "close_price",
    "position_value",
    "margin_used",
    "pnl",
    "pnl_pct",
    "open_time",
    "close_time",
    "duration_ms",
];

/// Writes trade outcomes to CSV in the order given.
///
/// # Errors
/// Returns error if file cannot be created or writing fails
pub fn export_trades_csv(path: impl AsRef<Path>, outcomes: &[TradeOutcome]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(HEADER)?;
    for outcome in outcomes {
        writer.write_record(&[
            outcome.symbol.clone(),
            outcome.side.to_string(),
            outcome.quantity.to_string(),
            outcome.leverage.to_string(),
            format!("{:.8}", outcome.open_price),
            format!("{:.8}", outcome.close_price),
            format!("{:.8}", outcome.position_value),
            format!("{:.8}", outcome.margin_used),
            format!("{:.8}", outcome.pnl),
            format!("{:.4}", outcome.pnl_pct),
            outcome.open_time.to_rfc3339(),
            outcome.close_time.to_rfc3339(),
            outcome.duration_ms.to_string(),
        ])?;
    }

    writer.flush()?;
    tracing::info!(path = %path.display(), trades = outcomes.len(), "Exported trades");
    Ok(())
}
