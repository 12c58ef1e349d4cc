//! Scoreboard wire types
//!
//! Every field below the event list is optional and tolerant: a value of the
//! wrong JSON type reads as absent instead of failing the whole event. The
//! normalizer decides what is required, so a single odd field never costs a
//! game its record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Top-level scoreboard response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreboardResponse {
    /// Raw events, normalized one at a time
    #[serde(default)]
    pub events: Option<Vec<Value>>,
}

/// A single scoreboard event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreboardEvent {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    /// ISO 8601 start time, often without seconds ("2024-01-07T18:00Z")
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<EventStatus>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub competitions: Vec<Competition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Competition {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub competitors: Vec<Competitor>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<EventStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub venue: Option<Venue>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub broadcasts: Vec<Broadcast>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Competitor {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(rename = "homeAway", default, deserialize_with = "lenient")]
    pub home_away: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub team: Option<Team>,
    /// Sent as a string by most leagues, as a number by a few
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub records: Vec<TeamRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(rename = "displayName", default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(rename = "shortDisplayName", default, deserialize_with = "lenient")]
    pub short_display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub record_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStatus {
    #[serde(rename = "displayClock", default, deserialize_with = "lenient")]
    pub display_clock: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub period: Option<u32>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub status_type: Option<StatusType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusType {
    /// "STATUS_SCHEDULED", "STATUS_IN_PROGRESS", "STATUS_FINAL", ...
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    /// "pre" | "in" | "post"
    #[serde(default, deserialize_with = "lenient")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub detail: Option<String>,
    #[serde(rename = "shortDetail", default, deserialize_with = "lenient")]
    pub short_detail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Venue {
    #[serde(rename = "fullName", default, deserialize_with = "lenient")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Broadcast {
    #[serde(default, deserialize_with = "lenient")]
    pub market: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub names: Vec<String>,
}

/// Any value that does not decode as `T` (including `null`) reads as `None`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Non-arrays read as empty; elements that do not decode are skipped
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Identifiers arrive as `"13"` from most feeds and as `13` from some
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
