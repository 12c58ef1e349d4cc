//! REST client for the upstream scoreboard API

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::messages::ScoreboardResponse;
use crate::common::errors::{EngineError, Result};
use crate::common::traits::ScoreProvider;
use crate::common::types::normalize_sport;
use crate::config::types::ProviderConfig;

/// Scoreboard client with a fixed sport -> endpoint mapping
#[derive(Debug, Clone)]
pub struct ScoreboardRestClient {
    /// HTTP client (carries the request timeout)
    client: Client,
    /// Normalized sport identifier -> scoreboard URL
    endpoints: BTreeMap<String, Url>,
}

impl ScoreboardRestClient {
    /// Create a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Self::with_timeout(config.endpoints()?, config.request_timeout())
    }

    /// Create a client with explicit endpoints and timeout
    pub fn with_timeout(endpoints: BTreeMap<String, Url>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        Ok(Self { client, endpoints })
    }

    /// Scoreboard URL for a sport, if configured
    pub fn endpoint(&self, sport: &str) -> Option<&Url> {
        self.endpoints.get(&normalize_sport(sport))
    }
}

#[async_trait]
impl ScoreProvider for ScoreboardRestClient {
    #[instrument(skip(self))]
    async fn fetch(&self, sport: &str) -> Result<Vec<Value>> {
        let url = self
            .endpoint(sport)
            .ok_or_else(|| EngineError::UnknownSport(sport.to_string()))?;
        debug!("Fetching scoreboard from: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::ProviderUnavailable(format!(
                "Scoreboard returned status {}: {}",
                status, body
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(e.to_string()))?;

        let scoreboard: ScoreboardResponse = serde_json::from_slice(&body)
            .map_err(|e| EngineError::ProviderMalformedResponse(e.to_string()))?;

        let events = scoreboard.events.ok_or_else(|| {
            EngineError::ProviderMalformedResponse(format!("no event list for {}", sport))
        })?;

        debug!("Fetched {} raw events for {}", events.len(), sport);
        Ok(events)
    }

    fn supports(&self, sport: &str) -> bool {
        self.endpoint(sport).is_some()
    }

    fn sports(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }

    fn name(&self) -> &str {
        "scoreboard"
    }
}
