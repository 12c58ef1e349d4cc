//! Score engine service: the long-lived owner of cache, registry, timers and rooms

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, instrument, warn};

use super::broadcast::RoomHub;
use super::cache::ScoreCache;
use super::messages::{InboundMessage, LivePayload, OutboundMessage};
use super::publisher::{scores_payload, FeedPublisher};
use super::registry::SubscriptionRegistry;
use super::scheduler::{PollScheduler, PollState};
use crate::common::channels::create_outbound_channel_with_size;
use crate::common::errors::{EngineError, Result};
use crate::common::traits::ScoreProvider;
use crate::common::types::{normalize_sport, ConnectionId, Feed};
use crate::config::types::EngineConfig;

/// Registry and timers change together so emptiness transitions and timer
/// start/stop are atomic.
struct Subscriptions {
    registry: SubscriptionRegistry,
    scheduler: PollScheduler,
}

struct EngineInner {
    provider: Arc<dyn ScoreProvider>,
    publisher: Arc<FeedPublisher>,
    subscriptions: Mutex<Subscriptions>,
    config: EngineConfig,
}

/// Cloneable handle to the engine
#[derive(Clone)]
pub struct ScoreEngine {
    inner: Arc<EngineInner>,
}

impl ScoreEngine {
    pub fn new(provider: Arc<dyn ScoreProvider>, config: EngineConfig) -> Self {
        let cache = Arc::new(ScoreCache::new(provider.clone(), config.freshness_window()));
        let rooms = Arc::new(RoomHub::new());
        let publisher = Arc::new(FeedPublisher::new(cache, rooms));
        let scheduler = PollScheduler::new(config.poll_interval(), publisher.clone());

        Self {
            inner: Arc::new(EngineInner {
                provider,
                publisher,
                subscriptions: Mutex::new(Subscriptions {
                    registry: SubscriptionRegistry::new(),
                    scheduler,
                }),
                config,
            }),
        }
    }

    pub fn cache(&self) -> &ScoreCache {
        self.inner.publisher.cache()
    }

    fn rooms(&self) -> &RoomHub {
        self.inner.publisher.rooms()
    }

    /// Register a new connection and hand back its outbound queue
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<OutboundMessage>) {
        let connection = ConnectionId::next();
        let (tx, rx) = create_outbound_channel_with_size(self.inner.config.outbound_buffer);
        self.rooms().register(connection, tx).await;
        debug!("Registered {}", connection);
        (connection, rx)
    }

    /// Dispatch one inbound request; failures are reported to the requester
    pub async fn handle(&self, connection: ConnectionId, message: InboundMessage) {
        let sport = message.sport().map(normalize_sport);
        let result = match message {
            InboundMessage::SubscribeSport { sport } => self.subscribe_sport(connection, &sport).await,
            InboundMessage::UnsubscribeSport { sport } => {
                self.unsubscribe_sport(connection, &sport).await
            }
            InboundMessage::SubscribeLive { sports } => self.subscribe_live(connection, &sports).await,
            InboundMessage::UnsubscribeLive => {
                self.unsubscribe_live(connection).await;
                Ok(())
            }
            InboundMessage::RefreshSport { sport } => self.refresh_sport(connection, &sport).await,
            InboundMessage::GetScores { sport } => self.get_scores(connection, &sport).await,
        };

        if let Err(e) = result {
            warn!("Request from {} failed: {}", connection, e);
            self.send_error(connection, e.to_string(), sport.as_deref()).await;
        }
    }

    pub async fn send_error(&self, connection: ConnectionId, message: String, sport: Option<&str>) {
        self.rooms()
            .send_to(connection, OutboundMessage::error(message, sport))
            .await;
    }

    /// Subscribe to a sport and receive its current scores immediately
    ///
    /// A repeat subscribe by the same connection changes nothing and sends
    /// nothing.
    #[instrument(skip(self))]
    pub async fn subscribe_sport(&self, connection: ConnectionId, sport: &str) -> Result<()> {
        let sport = self.known_sport(sport)?;
        let feed = Feed::Sport(sport.clone());

        let outcome = {
            let mut subs = self.inner.subscriptions.lock().await;
            let outcome = subs.registry.subscribe(connection, &feed);
            if outcome.first_subscriber {
                subs.scheduler.start_polling(feed.clone());
            }
            self.rooms().join(connection, feed.room()).await;
            outcome
        };

        if !outcome.added {
            debug!("{} already subscribed to {}", connection, sport);
            return Ok(());
        }
        info!("{} subscribed to {}", connection, sport);

        let message = match self.inner.publisher.sport_snapshot(&sport).await {
            Ok(snapshot) => OutboundMessage::ScoresInitial(scores_payload(&snapshot, None)),
            Err(e) => OutboundMessage::error(e.to_string(), Some(&sport)),
        };
        self.rooms().send_to(connection, message).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unsubscribe_sport(&self, connection: ConnectionId, sport: &str) -> Result<()> {
        let sport = self.known_sport(sport)?;
        let feed = Feed::Sport(sport);
        self.leave_feed(connection, &feed).await;
        Ok(())
    }

    /// Subscribe to the aggregate live feed
    ///
    /// `sports` are added to the live aggregation set; an empty list means
    /// the configured defaults.
    #[instrument(skip(self))]
    pub async fn subscribe_live(&self, connection: ConnectionId, sports: &[String]) -> Result<()> {
        let requested: Vec<String> = if sports.is_empty() {
            self.inner
                .config
                .live_sports
                .iter()
                .map(|s| normalize_sport(s))
                .filter(|s| self.inner.provider.supports(s))
                .collect()
        } else {
            sports
                .iter()
                .map(|s| self.known_sport(s))
                .collect::<Result<Vec<_>>>()?
        };
        self.inner.publisher.track_live_sports(requested).await;

        let outcome = {
            let mut subs = self.inner.subscriptions.lock().await;
            let outcome = subs.registry.subscribe(connection, &Feed::Live);
            if outcome.first_subscriber {
                subs.scheduler.start_polling(Feed::Live);
            }
            self.rooms().join(connection, Feed::Live.room()).await;
            outcome
        };

        if outcome.added {
            info!("{} subscribed to live feed", connection);
            let games = self.inner.publisher.live_games().await;
            self.rooms()
                .send_to(connection, OutboundMessage::LiveInitial(LivePayload::new(games)))
                .await;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unsubscribe_live(&self, connection: ConnectionId) {
        self.leave_feed(connection, &Feed::Live).await;
    }

    /// Bypass freshness, refresh and publish to the sport's room
    ///
    /// The requester gets the update directly when it is not a room member.
    #[instrument(skip(self))]
    pub async fn refresh_sport(&self, connection: ConnectionId, sport: &str) -> Result<()> {
        let sport = self.known_sport(sport)?;
        let room = Feed::Sport(sport.clone()).room();

        self.cache().invalidate(&sport).await;
        let snapshot = self.inner.publisher.sport_snapshot(&sport).await?;
        let message = OutboundMessage::ScoresUpdate(scores_payload(&snapshot, Some(true)));

        let requester_is_member = self.rooms().is_member(connection, &room).await;
        let delivered = self.rooms().publish(&room, message.clone()).await;
        if !requester_is_member {
            self.rooms().send_to(connection, message).await;
        }
        info!("Forced refresh of {} delivered to {} room members", sport, delivered);
        Ok(())
    }

    /// Immediate read for one connection
    #[instrument(skip(self))]
    pub async fn get_scores(&self, connection: ConnectionId, sport: &str) -> Result<()> {
        let sport = self.known_sport(sport)?;
        let snapshot = self.inner.publisher.sport_snapshot(&sport).await?;
        self.rooms()
            .send_to(
                connection,
                OutboundMessage::ScoresUpdate(scores_payload(&snapshot, None)),
            )
            .await;
        Ok(())
    }

    /// Connection lifecycle: remove all interest and stop emptied timers
    #[instrument(skip(self))]
    pub async fn disconnect(&self, connection: ConnectionId) {
        let emptied = {
            let mut subs = self.inner.subscriptions.lock().await;
            let emptied = subs.registry.drop_connection(connection);
            for feed in &emptied {
                subs.scheduler.stop_polling(feed);
            }
            self.rooms().remove_connection(connection).await;
            emptied
        };
        info!("{} disconnected, {} feeds went idle", connection, emptied.len());
    }

    /// Stop every poll timer and drop every subscription
    ///
    /// Connections stay registered, so a later subscribe starts polling
    /// again.
    pub async fn shutdown(&self) {
        let mut subs = self.inner.subscriptions.lock().await;
        subs.scheduler.stop_all();
        let cleared = subs.registry.clear();
        for feed in &cleared {
            self.rooms().leave_all(&feed.room()).await;
        }
        info!("Score engine stopped, {} feeds cleared", cleared.len());
    }

    pub async fn poll_state(&self, feed: &Feed) -> PollState {
        self.inner.subscriptions.lock().await.scheduler.state(feed)
    }

    pub async fn active_polls(&self) -> Vec<Feed> {
        self.inner.subscriptions.lock().await.scheduler.active_feeds()
    }

    pub async fn subscriber_count(&self, feed: &Feed) -> usize {
        self.inner
            .subscriptions
            .lock()
            .await
            .registry
            .subscriber_count(feed)
    }

    pub async fn feeds_for(&self, connection: ConnectionId) -> Vec<Feed> {
        self.inner.subscriptions.lock().await.registry.feeds_for(connection)
    }

    pub async fn live_sports(&self) -> Vec<String> {
        self.inner.publisher.live_sports().await
    }

    /// Run one poll tick for a feed right now
    pub async fn poll_now(&self, feed: &Feed) -> usize {
        match feed {
            Feed::Sport(sport) => self.inner.publisher.publish_sport(sport).await,
            Feed::Live => self.inner.publisher.publish_live().await,
        }
    }

    async fn leave_feed(&self, connection: ConnectionId, feed: &Feed) {
        let mut subs = self.inner.subscriptions.lock().await;
        let outcome = subs.registry.unsubscribe(connection, feed);
        if outcome.now_empty {
            subs.scheduler.stop_polling(feed);
        }
        self.rooms().leave(connection, &feed.room()).await;
        if outcome.removed {
            info!("{} unsubscribed from {}", connection, feed);
        }
    }

    fn known_sport(&self, sport: &str) -> Result<String> {
        let sport = normalize_sport(sport);
        if self.inner.provider.supports(&sport) {
            Ok(sport)
        } else {
            Err(EngineError::UnknownSport(sport))
        }
    }
}
