//! Refresh-and-publish work shared by poll ticks and immediate requests

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::broadcast::RoomHub;
use super::cache::{ScoreCache, Snapshot};
use super::messages::{LivePayload, OutboundMessage, ScoresPayload};
use crate::common::errors::Result;
use crate::common::traits::TickHandler;
use crate::common::types::{Feed, GameRecord};

pub struct FeedPublisher {
    cache: Arc<ScoreCache>,
    rooms: Arc<RoomHub>,
    /// Every sport ever requested for live aggregation
    live_sports: RwLock<BTreeSet<String>>,
}

impl FeedPublisher {
    pub fn new(cache: Arc<ScoreCache>, rooms: Arc<RoomHub>) -> Self {
        Self {
            cache,
            rooms,
            live_sports: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    pub fn rooms(&self) -> &RoomHub {
        &self.rooms
    }

    /// Add sports to the live aggregation set; it never shrinks
    pub async fn track_live_sports<I>(&self, sports: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.live_sports.write().await.extend(sports);
    }

    pub async fn live_sports(&self) -> Vec<String> {
        self.live_sports.read().await.iter().cloned().collect()
    }

    /// Refresh one sport (coalesced by the cache)
    pub async fn sport_snapshot(&self, sport: &str) -> Result<Snapshot> {
        self.cache.refresh(sport).await
    }

    /// In-progress games across all tracked sports
    ///
    /// Sports are refreshed concurrently; a failing sport is logged and
    /// skipped.
    pub async fn live_games(&self) -> Vec<GameRecord> {
        self.gather_live(false).await
    }

    async fn gather_live(&self, tick: bool) -> Vec<GameRecord> {
        let sports = self.live_sports().await;
        let results = join_all(sports.iter().map(|sport| async move {
            if tick {
                self.cache.refresh_for_tick(sport).await
            } else {
                self.cache.refresh(sport).await
            }
        }))
        .await;

        let mut games = Vec::new();
        for (sport, result) in sports.iter().zip(results) {
            match result {
                Ok(snapshot) => games.extend(snapshot.live_games().cloned()),
                Err(e) => warn!("Live aggregation skipped {}: {}", sport, e),
            }
        }
        games
    }

    /// Refresh a sport for a poll tick and publish the outcome to its room
    pub async fn publish_sport(&self, sport: &str) -> usize {
        let feed = Feed::sport(sport);
        let message = match self.cache.refresh_for_tick(sport).await {
            Ok(snapshot) => OutboundMessage::ScoresUpdate(scores_payload(&snapshot, None)),
            Err(e) => {
                if e.is_provider_failure() {
                    warn!("Tick for {} has no data to publish: {}", sport, e);
                } else {
                    error!("Tick for {} failed: {}", sport, e);
                }
                OutboundMessage::error(e.to_string(), Some(sport))
            }
        };
        self.rooms.publish(&feed.room(), message).await
    }

    /// Aggregate live games for a poll tick and publish them to the live room
    pub async fn publish_live(&self) -> usize {
        let games = self.gather_live(true).await;
        let message = OutboundMessage::LiveUpdate(LivePayload::new(games));
        self.rooms.publish(&Feed::Live.room(), message).await
    }
}

#[async_trait]
impl TickHandler for FeedPublisher {
    async fn on_tick(&self, feed: &Feed) {
        let delivered = match feed {
            Feed::Sport(sport) => self.publish_sport(sport).await,
            Feed::Live => self.publish_live().await,
        };
        debug!("Tick for {} delivered to {} connections", feed, delivered);
    }
}

pub fn scores_payload(snapshot: &Snapshot, forced: Option<bool>) -> ScoresPayload {
    ScoresPayload {
        sport: snapshot.sport.clone(),
        games: snapshot.games.as_ref().clone(),
        timestamp: Utc::now(),
        fetched_at: snapshot.fetched_at,
        forced,
        stale: snapshot.is_stale(),
    }
}
