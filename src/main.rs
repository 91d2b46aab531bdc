//! Vault monitor entry point
//!
//! Loads the token registry, then either runs a single evaluation cycle
//! (--once) or loops at a fixed interval. Token/pool discovery is opt-in
//! via --discover.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vault_monitor::MonitorService;

#[derive(Parser, Debug)]
#[command(name = "vault-monitor", about = "AMM vault monitoring and threshold selling")]
struct Args {
    /// Path to the token registry JSON
    #[arg(long, env = "MONITOR_CONFIG")]
    config: PathBuf,

    /// Run one evaluation cycle and exit
    #[arg(long)]
    once: bool,

    /// Seconds between evaluation cycles
    #[arg(long, default_value_t = 60)]
    interval: u64,

    /// Scan vault transfer logs for new tokens each cycle
    #[arg(long)]
    discover: bool,

    /// Blocks to look back on the first discovery scan
    #[arg(long, default_value_t = 5_000)]
    lookback: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut service = MonitorService::from_file(&args.config, args.discover, args.lookback)
        .with_context(|| format!("failed to load registry {}", args.config.display()))?;
    info!(
        "registry loaded: vault {}, {} token(s)",
        service.config().vault_address,
        service.config().tokens.len()
    );

    if args.once {
        let outcomes = service.run_once().await?;
        let sells = outcomes.iter().filter(|o| o.decision.should_sell).count();
        info!("cycle complete: {} evaluation(s), {} sell(s)", outcomes.len(), sells);
        return Ok(());
    }

    service.run_forever(args.interval).await?;
    Ok(())
}
