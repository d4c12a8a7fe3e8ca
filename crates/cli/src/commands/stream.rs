//! Live kline streaming command.
//!
//! Opens one combined-stream connection, subscribes every requested symbol in
//! batches and prints klines as they close until Ctrl-C.

use anyhow::{bail, Context, Result};
use clap::Args;
use perp_trader_core::AppConfig;
use perp_trader_market::{stream_name, CombinedStreamClient, KlineEvent, StreamConfig};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Arguments for the stream command.
#[derive(Args, Debug, Clone)]
pub struct StreamArgs {
    /// Comma-separated symbols (e.g., "BTCUSDT,ETHUSDT")
    #[arg(long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Kline interval (1m, 5m, 15m, 1h, 4h, 1d, etc.)
    #[arg(long, default_value = "1m")]
    pub interval: String,

    /// Streams per SUBSCRIBE frame (overrides config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Per-symbol channel capacity (overrides config)
    #[arg(long)]
    pub buffer: Option<usize>,

    /// Print every kline update, not only closed ones
    #[arg(long)]
    pub all: bool,
}

/// Runs the stream command.
///
/// # Errors
/// Returns an error if the initial connection or subscription fails.
pub async fn run_stream(args: StreamArgs, config: &AppConfig) -> Result<()> {
    let symbols: Vec<String> = args
        .symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        bail!("at least one symbol is required");
    }

    let mut stream_config = StreamConfig::from_settings(&config.stream);
    if let Some(batch_size) = args.batch_size {
        stream_config.batch_size = batch_size.max(1);
    }
    let buffer = args.buffer.unwrap_or(stream_config.subscriber_buffer).max(1);
    let client = CombinedStreamClient::new(stream_config);

    let (events_tx, mut events) = mpsc::channel::<KlineEvent>(buffer);
    let mut forwarders = JoinSet::new();
    for symbol in &symbols {
        let key = stream_name(symbol, &args.interval);
        let mut ticks = client.add_subscriber(key.clone(), buffer);
        let events_tx = events_tx.clone();
        forwarders.spawn(async move {
            while let Some(payload) = ticks.recv().await {
                match KlineEvent::from_slice(&payload) {
                    Ok(event) => {
                        if events_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(stream = %key, error = %e, "Unparseable kline payload"),
                }
            }
        });
    }
    drop(events_tx);

    client.connect().await.context("Failed to connect to combined stream")?;
    client
        .batch_subscribe(&symbols, &args.interval)
        .await
        .context("Failed to subscribe")?;
    tracing::info!(symbols = symbols.len(), interval = %args.interval, "Streaming klines, Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down");
                break;
            }
            event = events.recv() => match event {
                Some(event) => {
                    if args.all || event.kline.is_closed {
                        println!("{}", format_kline(&event));
                    }
                }
                None => {
                    tracing::warn!("All subscriber channels closed");
                    break;
                }
            }
        }
    }

    client.close().await;
    forwarders.shutdown().await;

    let stats = client.stats();
    tracing::info!(
        frames = stats.frames_received,
        delivered = stats.ticks_delivered,
        dropped = stats.ticks_dropped,
        reconnects = stats.reconnects,
        "Stream closed"
    );
    Ok(())
}

fn format_kline(event: &KlineEvent) -> String {
    let k = &event.kline;
    let marker = if k.is_closed { "" } else { " (open)" };
    format!(
        "{:<12} {:>4}  O {}  H {}  L {}  C {}  V {}  trades {}{}",
        event.symbol, k.interval, k.open, k.high, k.low, k.close, k.volume, k.trades, marker
    )
}
