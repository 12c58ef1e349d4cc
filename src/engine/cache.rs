//! Per-sport score cache with freshness coalescing and stale fallback

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::common::errors::Result;
use crate::common::traits::ScoreProvider;
use crate::common::types::{normalize_sport, GameRecord};
use crate::provider::normalizer::normalize_events;

/// Slack a poll tick allows below the freshness window
pub const TICK_TOLERANCE: Duration = Duration::from_secs(1);

/// Where a snapshot's games came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Fetched from the provider by this call
    Upstream,
    /// Served from a fresh cache entry
    Cache,
    /// Served from an expired or invalidated entry
    StaleCache,
}

/// Games for one sport as returned by the cache
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub sport: String,
    pub games: Arc<Vec<GameRecord>>,
    pub fetched_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

impl Snapshot {
    pub fn is_stale(&self) -> bool {
        self.source == SnapshotSource::StaleCache
    }

    pub fn live_games(&self) -> impl Iterator<Item = &GameRecord> {
        self.games.iter().filter(|g| g.is_live())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    games: Arc<Vec<GameRecord>>,
    fetched_at: DateTime<Utc>,
    /// Monotonic time the upstream request was issued, used for freshness checks
    fetched_instant: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn is_fresh(&self, window: Duration) -> bool {
        !self.invalidated && self.fetched_instant.elapsed() < window
    }

    fn snapshot(&self, sport: &str, source: SnapshotSource) -> Snapshot {
        Snapshot {
            sport: sport.to_string(),
            games: self.games.clone(),
            fetched_at: self.fetched_at,
            source,
        }
    }
}

/// One sport's cache slot; refreshes of the same sport are serialized here
#[derive(Debug, Default)]
struct SportSlot {
    refresh_lock: Mutex<()>,
    entry: RwLock<Option<CacheEntry>>,
}

/// Score cache keyed by sport identifier
pub struct ScoreCache {
    provider: Arc<dyn ScoreProvider>,
    freshness_window: Duration,
    slots: RwLock<HashMap<String, Arc<SportSlot>>>,
}

impl ScoreCache {
    pub fn new(provider: Arc<dyn ScoreProvider>, freshness_window: Duration) -> Self {
        Self {
            provider,
            freshness_window,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Current entry for a sport without touching the provider
    ///
    /// The snapshot source is `Cache` when fresh and `StaleCache` otherwise.
    pub async fn get(&self, sport: &str) -> Option<Snapshot> {
        let sport = normalize_sport(sport);
        let slot = self.slots.read().await.get(&sport).cloned()?;
        let entry = slot.entry.read().await;
        entry.as_ref().map(|e| {
            let source = if e.is_fresh(self.freshness_window) {
                SnapshotSource::Cache
            } else {
                SnapshotSource::StaleCache
            };
            e.snapshot(&sport, source)
        })
    }

    /// Fresh games for a sport, calling the provider only when needed
    ///
    /// Provider failures are absorbed when any previous entry exists and
    /// propagated otherwise.
    pub async fn refresh(&self, sport: &str) -> Result<Snapshot> {
        self.refresh_within(sport, self.freshness_window).await
    }

    /// Refresh on behalf of a poll tick
    ///
    /// Entries younger than the window minus `TICK_TOLERANCE` are reused;
    /// anything older is refetched, so a tick landing just short of the
    /// window still goes upstream.
    pub async fn refresh_for_tick(&self, sport: &str) -> Result<Snapshot> {
        let max_age = self.freshness_window.saturating_sub(TICK_TOLERANCE);
        self.refresh_within(sport, max_age).await
    }

    #[instrument(skip(self))]
    async fn refresh_within(&self, sport: &str, max_age: Duration) -> Result<Snapshot> {
        let sport = normalize_sport(sport);
        let slot = self.slot(&sport).await;
        let _refreshing = slot.refresh_lock.lock().await;

        if let Some(entry) = slot.entry.read().await.as_ref() {
            if entry.is_fresh(max_age) {
                debug!("Serving {} from fresh cache", sport);
                return Ok(entry.snapshot(&sport, SnapshotSource::Cache));
            }
        }

        // Freshness counts from when the request went out, not when it landed
        let requested_at = Instant::now();
        match self.provider.fetch(&sport).await {
            Ok(raw) => {
                let games = normalize_events(&sport, &raw);
                let discarded = raw.len() - games.len();
                if discarded > 0 {
                    debug!("Discarded {} unusable {} events", discarded, sport);
                }

                let entry = CacheEntry {
                    games: Arc::new(games),
                    fetched_at: Utc::now(),
                    fetched_instant: requested_at,
                    invalidated: false,
                };
                let snapshot = entry.snapshot(&sport, SnapshotSource::Upstream);
                *slot.entry.write().await = Some(entry);

                info!("Refreshed {} with {} games", sport, snapshot.games.len());
                Ok(snapshot)
            }
            Err(err) => match slot.entry.read().await.as_ref() {
                Some(previous) => {
                    warn!(
                        "Provider {} failed for {}, serving stale cache from {}: {}",
                        self.provider.name(),
                        sport,
                        previous.fetched_at,
                        err
                    );
                    Ok(previous.snapshot(&sport, SnapshotSource::StaleCache))
                }
                None => {
                    warn!("Provider {} failed for {} with no cache: {}", self.provider.name(), sport, err);
                    Err(err)
                }
            },
        }
    }

    /// Force the next `refresh` of this sport to go upstream
    pub async fn invalidate(&self, sport: &str) {
        let sport = normalize_sport(sport);
        let Some(slot) = self.slots.read().await.get(&sport).cloned() else {
            return;
        };
        let mut entry = slot.entry.write().await;
        if let Some(entry) = entry.as_mut() {
            entry.invalidated = true;
            debug!("Invalidated cache for {}", sport);
        }
    }

    /// Sports holding a cache entry
    pub async fn cached_sports(&self) -> Vec<String> {
        let slots = self.slots.read().await;
        let mut sports = Vec::with_capacity(slots.len());
        for (sport, slot) in slots.iter() {
            if slot.entry.read().await.is_some() {
                sports.push(sport.clone());
            }
        }
        sports.sort();
        sports
    }

    async fn slot(&self, sport: &str) -> Arc<SportSlot> {
        if let Some(slot) = self.slots.read().await.get(sport) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(sport.to_string())
            .or_default()
            .clone()
    }
}
