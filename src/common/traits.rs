//! Trait definitions for score providers and tick handlers

use async_trait::async_trait;
use serde_json::Value;

use super::errors::Result;
use super::types::Feed;

/// Upstream source of raw game events, one sport at a time
///
/// Implementations never retry internally; the score cache decides how
/// failures degrade.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Fetch the current raw events for a sport
    ///
    /// # Errors
    /// * `ProviderUnavailable` on timeout, transport error or non-success status
    /// * `ProviderMalformedResponse` when the body lacks an event list
    /// * `UnknownSport` when no endpoint is configured for `sport`
    async fn fetch(&self, sport: &str) -> Result<Vec<Value>>;

    /// Whether an endpoint is configured for this sport
    fn supports(&self, sport: &str) -> bool;

    /// All configured sport identifiers
    fn sports(&self) -> Vec<String>;

    /// Human-readable name for logging
    fn name(&self) -> &str {
        "provider"
    }
}

/// Work performed on every poll tick of a feed
#[async_trait]
pub trait TickHandler: Send + Sync {
    async fn on_tick(&self, feed: &Feed);
}
