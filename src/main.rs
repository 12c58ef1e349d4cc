//! LiveScores - Main Entry Point
//!
//! Runs the score distribution engine behind a websocket gateway.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use live_scores::config::load_config;
use live_scores::{ScoreEngine, ScoreGateway, ScoreboardRestClient};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "SCORES_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text or json)
    #[arg(long, env = "SCORES_LOG_FORMAT")]
    log_format: Option<String>,

    /// Address for the websocket gateway, overrides the config file
    #[arg(long, env = "SCORES_BIND_ADDR")]
    bind: Option<String>,
}

fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let installed = if format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let mut config = load_config(Some(&args.config)).context("loading configuration")?;
    if let Some(level) = args.log_level {
        config.settings.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.settings.log_format = format;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    init_logging(&config.settings.log_level, &config.settings.log_format)?;

    info!("Starting LiveScores engine");
    info!("Configuration file: {}", args.config);

    let provider = ScoreboardRestClient::new(&config.provider).context("building provider client")?;
    info!(
        "Provider {} with {} sports, timeout {}s",
        config.provider.base_url,
        config.provider.sports.len(),
        config.provider.request_timeout_seconds
    );

    let engine = ScoreEngine::new(Arc::new(provider), config.engine.clone());
    let gateway = ScoreGateway::bind(&config.server.bind_addr, engine.clone())
        .await
        .context("starting websocket gateway")?;

    tokio::select! {
        result = gateway.run() => {
            if let Err(e) = result {
                warn!("Gateway stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, cleaning up...");
        }
    }

    engine.shutdown().await;
    Ok(())
}
