//! Canonical types shared by the provider, cache and engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Normalize a sport identifier (trimmed, lower-cased)
pub fn normalize_sport(sport: &str) -> String {
    sport.trim().to_ascii_lowercase()
}

/// Game status as exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Scheduled,
    Live,
    Final,
    Unknown,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::Scheduled => write!(f, "scheduled"),
            GameStatus::Live => write!(f, "live"),
            GameStatus::Final => write!(f, "final"),
            GameStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// One side of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScore {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub score: u32,
    /// Season record such as "12-4"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_loss_record: Option<String>,
}

/// Canonical game record produced by the normalizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub sport: String,
    pub home_team: TeamScore,
    pub away_team: TeamScore,
    pub status: GameStatus,
    #[serde(default)]
    pub status_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_info: Option<String>,
}

impl GameRecord {
    pub fn is_live(&self) -> bool {
        self.status == GameStatus::Live
    }
}

/// Process-unique identifier of a client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Allocate the next identifier
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ConnectionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Unit of subscription and polling: one sport or the aggregate live feed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feed {
    Sport(String),
    Live,
}

impl Feed {
    pub fn sport(sport: &str) -> Self {
        Feed::Sport(normalize_sport(sport))
    }

    /// Broadcast room carrying this feed's updates
    pub fn room(&self) -> Room {
        match self {
            Feed::Sport(sport) => Room(format!("sport:{}", sport)),
            Feed::Live => Room("live".to_string()),
        }
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feed::Sport(sport) => write!(f, "{}", sport),
            Feed::Live => write!(f, "live"),
        }
    }
}

/// Named group of connections targeted by a broadcast
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Room(pub String);

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
