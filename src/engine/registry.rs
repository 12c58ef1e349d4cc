//! Subscription registry: who is interested in which feed
//!
//! The registry only records interest and reports emptiness transitions; it
//! knows nothing about timers. A feed has an entry exactly while it has at
//! least one subscriber, so `len()` equals the number of feeds to poll.

use std::collections::{HashMap, HashSet};

use crate::common::types::{ConnectionId, Feed};

/// Result of a subscribe call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOutcome {
    /// The connection was not yet subscribed to this feed
    pub added: bool,
    /// The feed went from empty to non-empty (start polling)
    pub first_subscriber: bool,
}

/// Result of an unsubscribe call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeOutcome {
    /// The connection was subscribed and has been removed
    pub removed: bool,
    /// The feed went from non-empty to empty (stop polling)
    pub now_empty: bool,
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    feeds: HashMap<Feed, HashSet<ConnectionId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, connection: ConnectionId, feed: &Feed) -> SubscribeOutcome {
        let first_subscriber = !self.feeds.contains_key(feed);
        let added = self.feeds.entry(feed.clone()).or_default().insert(connection);
        SubscribeOutcome {
            added,
            first_subscriber,
        }
    }

    pub fn unsubscribe(&mut self, connection: ConnectionId, feed: &Feed) -> UnsubscribeOutcome {
        let Some(subscribers) = self.feeds.get_mut(feed) else {
            return UnsubscribeOutcome {
                removed: false,
                now_empty: false,
            };
        };

        let removed = subscribers.remove(&connection);
        let now_empty = subscribers.is_empty();
        if now_empty {
            self.feeds.remove(feed);
        }
        UnsubscribeOutcome { removed, now_empty }
    }

    pub fn subscribe_sport(&mut self, connection: ConnectionId, sport: &str) -> SubscribeOutcome {
        self.subscribe(connection, &Feed::sport(sport))
    }

    pub fn unsubscribe_sport(&mut self, connection: ConnectionId, sport: &str) -> UnsubscribeOutcome {
        self.unsubscribe(connection, &Feed::sport(sport))
    }

    pub fn subscribe_live(&mut self, connection: ConnectionId) -> SubscribeOutcome {
        self.subscribe(connection, &Feed::Live)
    }

    pub fn unsubscribe_live(&mut self, connection: ConnectionId) -> UnsubscribeOutcome {
        self.unsubscribe(connection, &Feed::Live)
    }

    /// Remove a connection from every feed
    ///
    /// Returns the feeds this emptied, sorted. Unknown connections yield an
    /// empty list.
    pub fn drop_connection(&mut self, connection: ConnectionId) -> Vec<Feed> {
        let mut emptied = Vec::new();
        self.feeds.retain(|feed, subscribers| {
            if subscribers.remove(&connection) && subscribers.is_empty() {
                emptied.push(feed.clone());
                return false;
            }
            true
        });
        emptied.sort();
        emptied
    }

    /// Drop every subscription, returning the feeds that were active
    pub fn clear(&mut self) -> Vec<Feed> {
        let mut feeds: Vec<_> = self.feeds.drain().map(|(feed, _)| feed).collect();
        feeds.sort();
        feeds
    }

    pub fn subscribers(&self, feed: &Feed) -> Vec<ConnectionId> {
        let mut subscribers: Vec<_> = self
            .feeds
            .get(feed)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        subscribers.sort();
        subscribers
    }

    pub fn subscriber_count(&self, feed: &Feed) -> usize {
        self.feeds.get(feed).map(HashSet::len).unwrap_or(0)
    }

    pub fn is_subscribed(&self, connection: ConnectionId, feed: &Feed) -> bool {
        self.feeds
            .get(feed)
            .map(|s| s.contains(&connection))
            .unwrap_or(false)
    }

    pub fn feeds_for(&self, connection: ConnectionId) -> Vec<Feed> {
        let mut feeds: Vec<_> = self
            .feeds
            .iter()
            .filter(|(_, subscribers)| subscribers.contains(&connection))
            .map(|(feed, _)| feed.clone())
            .collect();
        feeds.sort();
        feeds
    }

    pub fn active_feeds(&self) -> Vec<Feed> {
        let mut feeds: Vec<_> = self.feeds.keys().cloned().collect();
        feeds.sort();
        feeds
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
