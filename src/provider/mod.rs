//! Provider module - scoreboard adapter and event normalization

pub mod messages;
pub mod normalizer;
pub mod rest;

pub use normalizer::{normalize_event, normalize_events};
pub use rest::ScoreboardRestClient;
