//! Handoff Sentinel - standalone monitoring daemon
//!
//! Loads configuration, starts the background loops and runs until interrupted.

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use handoff_sentinel::utils::logging::init_logging;
use handoff_sentinel::{Config, HandoffSentinel, NAME, VERSION};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "sentinel", version, about = "Bot handoff orchestration and monitoring")]
struct Args {
    /// YAML configuration file; environment variables are used when omitted
    #[arg(short, long, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, overriding the configured level
    #[arg(long)]
    log_level: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Display with context chain, not Debug
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };
    if let Some(level) = args.log_level {
        config.sentinel.logging.level = level;
    }

    init_logging(config.logging())?;

    if args.check {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    info!("{} {} starting", NAME, VERSION);

    let sentinel = HandoffSentinel::new(config).await?;
    sentinel.start().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    sentinel.shutdown().await?;
    info!("Uptime {:?}", sentinel.uptime());
    Ok(())
}
