//! Kestrel engine runner
//!
//! Loads a JSON config, brings the engine up against the configured
//! venues, and pumps the three event streams into the log until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use kestrel_bins::common::{init_logging, load_config, print_stats, CommonArgs};
use kestrel_core::FixEngine;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CommonArgs::parse();
    init_logging(&args.log_level)?;

    let config = load_config(&args.config)?;
    tracing::info!(
        "=== Kestrel: {} venue(s), sender {} ===",
        config.venues.len(),
        config.sender_comp_id
    );

    let (engine, mut streams) = FixEngine::initialize(config).await?;

    let pump = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(record) = streams.executions.recv() => {
                    tracing::info!(
                        order_id = %record.id,
                        symbol = %record.symbol,
                        state = ?record.state,
                        filled = %record.filled_qty,
                        avg_px = %record.avg_fill_price,
                        condition = ?record.condition,
                        "execution"
                    );
                }
                Some(quote) = streams.market_data.recv() => {
                    tracing::info!(
                        symbol = %quote.symbol,
                        bid = ?quote.best_bid,
                        ask = ?quote.best_ask,
                        last = ?quote.last_trade,
                        "quote"
                    );
                }
                Some(status) = streams.status.recv() => {
                    tracing::info!(venue = %status.venue, state = %status.state, "venue status");
                }
                else => break,
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    print_stats(&engine.stats());
    engine.close().await;
    pump.abort();

    Ok(())
}
