//! Score distribution engine
//!
//! # Architecture
//!
//! ```text
//! connection ──subscribe──▶ ScoreEngine ──▶ SubscriptionRegistry
//!                               │                 │ empty ⇄ non-empty
//!                               │                 ▼
//!                               │           PollScheduler (one timer per feed)
//!                               │                 │ tick
//!                               ▼                 ▼
//!                          FeedPublisher ──▶ ScoreCache ──▶ ScoreProvider
//!                               │
//!                               ▼
//!                           RoomHub ──▶ connection outbound queues
//! ```

pub mod broadcast;
pub mod cache;
pub mod messages;
pub mod publisher;
pub mod registry;
pub mod scheduler;
pub mod service;

pub use broadcast::RoomHub;
pub use cache::{ScoreCache, Snapshot, SnapshotSource};
pub use messages::{InboundMessage, OutboundMessage};
pub use publisher::FeedPublisher;
pub use registry::SubscriptionRegistry;
pub use scheduler::{PollScheduler, PollState};
pub use service::ScoreEngine;
