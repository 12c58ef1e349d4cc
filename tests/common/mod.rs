//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use live_scores::config::types::EngineConfig;
use live_scores::{EngineError, OutboundMessage, Result, ScoreEngine, ScoreProvider};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Scripted answer for one sport
#[derive(Debug, Clone)]
pub enum Scripted {
    Events(Vec<Value>),
    Unavailable,
    Malformed,
}

/// In-memory provider with per-sport scripted responses and call counters
///
/// Fetches can be slowed down with a fixed latency, or held open until the
/// test releases them.
pub struct FakeProvider {
    sports: Vec<String>,
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Duration,
    holding: Mutex<bool>,
    entered: Notify,
    released: Notify,
}

impl FakeProvider {
    pub fn new(sports: &[&str]) -> Arc<Self> {
        Self::with_latency(sports, Duration::ZERO)
    }

    pub fn with_latency(sports: &[&str], latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            sports: sports.iter().map(|s| s.to_string()).collect(),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            latency,
            holding: Mutex::new(false),
            entered: Notify::new(),
            released: Notify::new(),
        })
    }

    /// Make the next fetches wait for `release`
    pub fn hold(&self) {
        *self.holding.lock().unwrap() = true;
    }

    /// Let one held fetch continue and stop holding new ones
    pub fn release(&self) {
        *self.holding.lock().unwrap() = false;
        self.released.notify_one();
    }

    /// Wait until a fetch is parked on the hold
    pub async fn held_fetch(&self) {
        self.entered.notified().await;
    }

    pub fn respond(&self, sport: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .insert(sport.to_string(), response);
    }

    pub fn calls(&self, sport: &str) -> usize {
        self.calls.lock().unwrap().get(sport).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ScoreProvider for FakeProvider {
    async fn fetch(&self, sport: &str) -> Result<Vec<Value>> {
        *self.calls.lock().unwrap().entry(sport.to_string()).or_default() += 1;

        if !self.supports(sport) {
            return Err(EngineError::UnknownSport(sport.to_string()));
        }

        let held = *self.holding.lock().unwrap();
        if held {
            self.entered.notify_one();
            self.released.notified().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let response = self.responses.lock().unwrap().get(sport).cloned();
        match response {
            Some(Scripted::Events(events)) => Ok(events),
            Some(Scripted::Malformed) => Err(EngineError::ProviderMalformedResponse(
                "missing events".to_string(),
            )),
            Some(Scripted::Unavailable) | None => Err(EngineError::ProviderUnavailable(
                "request timed out".to_string(),
            )),
        }
    }

    fn supports(&self, sport: &str) -> bool {
        self.sports.iter().any(|s| s == sport)
    }

    fn sports(&self) -> Vec<String> {
        self.sports.clone()
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Engine with default windows over a fake provider
pub fn engine_with(provider: Arc<FakeProvider>) -> ScoreEngine {
    ScoreEngine::new(provider, EngineConfig::default())
}

/// Everything currently queued for a connection
pub fn drain(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

pub fn event_names(messages: &[OutboundMessage]) -> Vec<&'static str> {
    messages.iter().map(OutboundMessage::event_name).collect()
}

/// A scoreboard event in the provider's layout
pub fn game_event(id: &str, state: &str, home: (&str, u32), away: (&str, u32)) -> Value {
    json!({
        "id": id,
        "date": "2024-01-07T18:00Z",
        "competitions": [{
            "venue": { "fullName": "Test Arena" },
            "status": {
                "displayClock": "5:00",
                "period": 2,
                "type": { "state": state, "shortDetail": "5:00 - 2nd" }
            },
            "competitors": [
                {
                    "homeAway": "home",
                    "score": home.1.to_string(),
                    "team": { "id": format!("{}-home", id), "displayName": home.0, "abbreviation": &home.0[..3] },
                    "records": [{ "type": "total", "summary": "10-5" }]
                },
                {
                    "homeAway": "away",
                    "score": away.1.to_string(),
                    "team": { "id": format!("{}-away", id), "displayName": away.0, "abbreviation": &away.0[..3] }
                }
            ]
        }]
    })
}

/// An event whose away competitor is missing
pub fn event_missing_away(id: &str) -> Value {
    let mut event = game_event(id, "in", ("Home Team", 1), ("Away Team", 0));
    event["competitions"][0]["competitors"]
        .as_array_mut()
        .unwrap()
        .retain(|c| c["homeAway"] == "home");
    event
}

/// Sample scoreboard body for HTTP-level tests
pub static SCOREBOARD_BODY: Lazy<Value> = Lazy::new(|| {
    json!({
        "leagues": [{ "abbreviation": "NBA" }],
        "events": [
            game_event("401", "in", ("Lakers", 88), ("Celtics", 90)),
            game_event("402", "pre", ("Knicks", 0), ("Heat", 0)),
            event_missing_away("403")
        ]
    })
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shapes() {
        let events = SCOREBOARD_BODY["events"].as_array().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            event_missing_away("1")["competitions"][0]["competitors"]
                .as_array()
                .unwrap()
                .len(),
            1
        );
    }
}
