//! Market-making bot entry point.
//!
//! Runs against the in-memory paper exchange until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mm_bot::{AppConfig, MarketMakerBot};
use mm_gateway::{DynGateway, DynReferenceSource, HttpPriceFeed, PaperGateway};
use mm_telemetry::Metrics;
use tracing::{info, warn};

/// Market-making bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // CLI arg > MM_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("MM_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = AppConfig::load(&config_path)?;

    mm_telemetry::init_logging(&config.telemetry.log_level)?;
    info!("Starting mm-bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        pair = %config.pair,
        reference_enabled = config.reference.enabled,
        "Configuration loaded"
    );

    let mut paper = PaperGateway::new().with_pair(config.pair.clone(), config.paper.last_price);
    if let Some(min_notional) = config.paper.min_notional {
        paper = paper.with_min_notional(min_notional);
    }
    let gateway: DynGateway = Arc::new(paper);

    let external: Option<DynReferenceSource> = if config.reference.enabled {
        let feed =
            HttpPriceFeed::new(config.reference.base_url.clone(), config.reference.timeout())?;
        Some(Arc::new(feed))
    } else {
        None
    };

    let bot = MarketMakerBot::start(
        config.pair.clone(),
        config.maker.clone(),
        gateway,
        external,
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let report = bot.stop().await;
    info!(loops = ?report.loops, "Shutdown complete");

    match Metrics::render() {
        Ok(text) => info!(metrics = %text, "Final metrics"),
        Err(e) => warn!(error = %e, "Failed to render metrics"),
    }

    Ok(())
}
