use clap::{Parser, Subcommand};
use perp_trader_core::{AppConfig, ConfigLoader};

mod commands;

use commands::{AnalyzeFillsArgs, PerformanceArgs, StreamArgs};

#[derive(Parser)]
#[command(name = "perp-trader")]
#[command(about = "Market streaming and performance review for perpetual futures", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: String,

    /// Profile file layered over the base config (e.g. "testnet" loads Config.testnet.toml)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Optional log file path (appends instead of logging to stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream live klines over a combined WebSocket connection
    Stream(StreamArgs),
    /// Review trading performance from exchange history or the local decision log
    Performance(PerformanceArgs),
    /// Reconstruct trades offline from a CSV of fills
    AnalyzeFills(AnalyzeFillsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Stream(args) => commands::run_stream(args, &config).await?,
        Commands::Performance(args) => commands::run_performance(args, &config).await?,
        Commands::AnalyzeFills(args) => commands::run_analyze_fills(&args, &config)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = match &cli.profile {
        Some(profile) => ConfigLoader::load_with_profile(&cli.config, profile)?,
        None => ConfigLoader::load_from(&cli.config)?,
    };
    tracing::debug!(path = %cli.config, profile = ?cli.profile, "Configuration loaded");
    Ok(config)
}
