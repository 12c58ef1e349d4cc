//! LiveScores Library
//!
//! Real-time score distribution: polls a live score provider per sport,
//! caches snapshots with a freshness window and fans updates out to
//! subscribed connections.

pub mod common;
pub mod config;
pub mod engine;
pub mod provider;
pub mod server;

// Re-export commonly used types
pub use common::errors::{EngineError, Result};
pub use common::traits::{ScoreProvider, TickHandler};
pub use common::types::{ConnectionId, Feed, GameRecord, GameStatus, Room, TeamScore};
pub use config::types::AppConfig;
pub use engine::{
    InboundMessage, OutboundMessage, PollState, ScoreCache, ScoreEngine, Snapshot, SnapshotSource,
};
pub use provider::ScoreboardRestClient;
pub use server::ScoreGateway;
