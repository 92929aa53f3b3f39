//! Common utilities for all binaries
//!
//! Shared initialization, CLI parsing, and setup code.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kestrel_core::{EngineConfig, EngineStats};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Path to the engine configuration (JSON)
    #[arg(short = 'f', long, default_value = "kestrel.json")]
    pub config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Initialize tracing/logging
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    Ok(())
}

/// Load and validate the engine configuration.
pub fn load_config(path: &PathBuf) -> Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: EngineConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid config: {e}"))?;
    Ok(config)
}

/// Print final statistics
pub fn print_stats(stats: &EngineStats) {
    tracing::info!("=== Final Statistics ===");
    tracing::info!("Orders submitted: {}", stats.orders_submitted);
    tracing::info!("Cancels requested: {}", stats.cancels_requested);
    tracing::info!(
        "Orders tracked: {} ({} terminal)",
        stats.orders_tracked,
        stats.orders_terminal
    );
    for venue in &stats.venues {
        tracing::info!(
            "Venue {}: state={} healthy={} avg_latency={} reconnect_attempts={}",
            venue.venue,
            venue.state,
            venue.healthy,
            venue
                .avg_latency_ns
                .map(|ns| format!("{:.1}us", ns as f64 / 1_000.0))
                .unwrap_or_else(|| "n/a".to_string()),
            venue.reconnects.attempts,
        );
    }
}
