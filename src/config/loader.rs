//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::{AppConfig, AppSettings, EngineConfig, ProviderConfig, ServerConfig};
use crate::common::errors::{EngineError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with SCORES__, e.g. SCORES__ENGINE__POLL_INTERVAL_SECONDS)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("SCORES")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| EngineError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| EngineError::Configuration(e.to_string()))
}

/// Load configuration from environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut provider = ProviderConfig::default();
    if let Ok(url) = std::env::var("SCORES_PROVIDER_URL") {
        provider.base_url = url;
    }
    if let Some(timeout) = parse_var::<u64>("SCORES_PROVIDER_TIMEOUT_SECONDS")? {
        provider.request_timeout_seconds = timeout;
    }

    let mut engine = EngineConfig::default();
    if let Some(window) = parse_var::<u64>("SCORES_FRESHNESS_WINDOW_SECONDS")? {
        engine.freshness_window_seconds = window;
    }
    if let Some(interval) = parse_var::<u64>("SCORES_POLL_INTERVAL_SECONDS")? {
        engine.poll_interval_seconds = interval;
    }
    if let Ok(sports) = std::env::var("SCORES_LIVE_SPORTS") {
        engine.live_sports = sports
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    let server = ServerConfig {
        bind_addr: std::env::var("SCORES_BIND_ADDR")
            .unwrap_or_else(|_| ServerConfig::default().bind_addr),
    };

    Ok(AppConfig {
        provider,
        engine,
        server,
        settings: AppSettings::default(),
    })
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EngineError::Configuration(format!("{} is not a valid value", name))),
        Err(_) => Ok(None),
    }
}
