//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::common::errors::{EngineError, Result};
use crate::common::types::normalize_sport;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream score provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Cache and polling behaviour
    #[serde(default)]
    pub engine: EngineConfig,
    /// WebSocket gateway configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Score provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the scoreboard API
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Sport identifier -> endpoint path below `base_url`
    #[serde(default = "default_sport_paths")]
    pub sports: BTreeMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            request_timeout_seconds: default_request_timeout(),
            sports: default_sport_paths(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Resolve the scoreboard URL for every configured sport
    pub fn endpoints(&self) -> Result<BTreeMap<String, Url>> {
        let mut base = Url::parse(&self.base_url)
            .map_err(|e| EngineError::Configuration(format!("invalid base_url: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        self.sports
            .iter()
            .map(|(sport, path)| {
                let relative = format!("{}/scoreboard", path.trim_matches('/'));
                let url = base.join(&relative).map_err(|e| {
                    EngineError::Configuration(format!("invalid path for {}: {}", sport, e))
                })?;
                Ok((normalize_sport(sport), url))
            })
            .collect()
    }
}

fn default_provider_base_url() -> String {
    "https://site.api.espn.com/apis/site/v2/sports".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_sport_paths() -> BTreeMap<String, String> {
    [
        ("nfl", "football/nfl"),
        ("ncaaf", "football/college-football"),
        ("nba", "basketball/nba"),
        ("wnba", "basketball/wnba"),
        ("ncaab", "basketball/mens-college-basketball"),
        ("mlb", "baseball/mlb"),
        ("nhl", "hockey/nhl"),
        ("mls", "soccer/usa.1"),
        ("epl", "soccer/eng.1"),
    ]
    .into_iter()
    .map(|(sport, path)| (sport.to_string(), path.to_string()))
    .collect()
}

/// Cache freshness and polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a cache entry is served without an upstream call
    #[serde(default = "default_freshness_window")]
    pub freshness_window_seconds: u64,
    /// Poll timer period per active feed
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Sports aggregated into the live feed when a subscriber names none
    #[serde(default = "default_live_sports")]
    pub live_sports: Vec<String>,
    /// Outbound queue size per connection
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            freshness_window_seconds: default_freshness_window(),
            poll_interval_seconds: default_poll_interval(),
            live_sports: default_live_sports(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

impl EngineConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }
}

fn default_freshness_window() -> u64 {
    15
}

fn default_poll_interval() -> u64 {
    15
}

fn default_live_sports() -> Vec<String> {
    vec![
        "nfl".to_string(),
        "nba".to_string(),
        "mlb".to_string(),
        "nhl".to_string(),
    ]
}

fn default_outbound_buffer() -> usize {
    crate::common::channels::DEFAULT_CHANNEL_SIZE
}

/// WebSocket gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the gateway listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format ("text" or "json")
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
