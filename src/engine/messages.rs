//! Connection protocol messages
//!
//! Frames are JSON objects of the form `{"event": "<name>", "data": {...}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::errors::{EngineError, Result};
use crate::common::types::GameRecord;

/// Raw inbound frame before dispatch on `event`
#[derive(Debug, Clone, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct SportRequest {
    sport: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LiveRequest {
    #[serde(default)]
    sports: Vec<String>,
}

/// Requests a connection can make
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    SubscribeSport { sport: String },
    UnsubscribeSport { sport: String },
    /// `sports` empty means the configured default set
    SubscribeLive { sports: Vec<String> },
    UnsubscribeLive,
    RefreshSport { sport: String },
    GetScores { sport: String },
}

impl InboundMessage {
    /// Decode a text frame
    pub fn parse(text: &str) -> Result<Self> {
        let frame: InboundFrame = serde_json::from_str(text)?;

        let message = match frame.event.as_str() {
            "subscribe:sport" => InboundMessage::SubscribeSport {
                sport: sport_of(frame.data)?,
            },
            "unsubscribe:sport" => InboundMessage::UnsubscribeSport {
                sport: sport_of(frame.data)?,
            },
            "subscribe:live" => {
                let request: LiveRequest = if frame.data.is_null() {
                    LiveRequest::default()
                } else {
                    serde_json::from_value(frame.data)?
                };
                InboundMessage::SubscribeLive {
                    sports: request.sports,
                }
            }
            "unsubscribe:live" => InboundMessage::UnsubscribeLive,
            "refresh:sport" => InboundMessage::RefreshSport {
                sport: sport_of(frame.data)?,
            },
            "get:scores" => InboundMessage::GetScores {
                sport: sport_of(frame.data)?,
            },
            other => {
                return Err(EngineError::InvalidRequest(format!("unsupported event: {}", other)));
            }
        };

        Ok(message)
    }

    /// Sport this request targets, if any
    pub fn sport(&self) -> Option<&str> {
        match self {
            InboundMessage::SubscribeSport { sport }
            | InboundMessage::UnsubscribeSport { sport }
            | InboundMessage::RefreshSport { sport }
            | InboundMessage::GetScores { sport } => Some(sport),
            InboundMessage::SubscribeLive { .. } | InboundMessage::UnsubscribeLive => None,
        }
    }
}

/// Accepts both `{"sport": "nba"}` and a bare `"nba"`
fn sport_of(data: Value) -> Result<String> {
    match data {
        Value::String(sport) => Ok(sport),
        other => Ok(serde_json::from_value::<SportRequest>(other)?.sport),
    }
}

/// Games snapshot for one sport
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoresPayload {
    pub sport: String,
    pub games: Vec<GameRecord>,
    pub timestamp: DateTime<Utc>,
    /// When the games were fetched upstream
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced: Option<bool>,
    /// Served from an expired cache entry after an upstream failure
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
}

/// In-progress games across all aggregated sports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LivePayload {
    pub games: Vec<GameRecord>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

impl LivePayload {
    pub fn new(games: Vec<GameRecord>) -> Self {
        Self {
            count: games.len(),
            games,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
}

/// Messages delivered to connections
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundMessage {
    #[serde(rename = "scores:initial")]
    ScoresInitial(ScoresPayload),
    #[serde(rename = "scores:update")]
    ScoresUpdate(ScoresPayload),
    #[serde(rename = "live:initial")]
    LiveInitial(LivePayload),
    #[serde(rename = "live:update")]
    LiveUpdate(LivePayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl OutboundMessage {
    pub fn error(message: impl Into<String>, sport: Option<&str>) -> Self {
        OutboundMessage::Error(ErrorPayload {
            message: message.into(),
            sport: sport.map(str::to_string),
        })
    }

    /// Protocol event name
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundMessage::ScoresInitial(_) => "scores:initial",
            OutboundMessage::ScoresUpdate(_) => "scores:update",
            OutboundMessage::LiveInitial(_) => "live:initial",
            OutboundMessage::LiveUpdate(_) => "live:update",
            OutboundMessage::Error(_) => "error",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
