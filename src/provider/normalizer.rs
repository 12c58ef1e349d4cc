//! Raw scoreboard event -> canonical `GameRecord`

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use super::messages::{Competitor, EventStatus, ScoreboardEvent, TeamRecord};
use crate::common::types::{normalize_sport, GameRecord, GameStatus, TeamScore};

/// Normalize one raw event fetched for `sport`
///
/// Returns `None` when the event cannot supply both a home and an away team.
pub fn normalize_event(sport: &str, raw: &Value) -> Option<GameRecord> {
    let event: ScoreboardEvent = serde_json::from_value(raw.clone()).ok()?;
    let id = event.id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
    let competition = event.competitions.first()?;

    let home = find_side(&competition.competitors, "home")?;
    let away = find_side(&competition.competitors, "away")?;
    let home_team = team_score(home)?;
    let away_team = team_score(away)?;

    let status_block = competition.status.as_ref().or(event.status.as_ref());

    Some(GameRecord {
        id: id.to_string(),
        sport: normalize_sport(sport),
        home_team,
        away_team,
        status: status_block.map(game_status).unwrap_or(GameStatus::Unknown),
        status_description: status_block.and_then(status_description).unwrap_or_default(),
        start_time: event.date.as_deref().and_then(parse_start_time),
        venue: competition
            .venue
            .as_ref()
            .and_then(|v| v.full_name.clone())
            .filter(|v| !v.is_empty()),
        period: status_block.and_then(|s| s.period),
        clock: status_block
            .and_then(|s| s.display_clock.clone())
            .filter(|c| !c.is_empty()),
        broadcast_info: competition
            .broadcasts
            .iter()
            .flat_map(|b| b.names.iter())
            .find(|n| !n.is_empty())
            .cloned(),
    })
}

/// Normalize a batch, silently dropping unusable events
pub fn normalize_events(sport: &str, raw: &[Value]) -> Vec<GameRecord> {
    raw.iter().filter_map(|event| normalize_event(sport, event)).collect()
}

fn find_side<'a>(competitors: &'a [Competitor], side: &str) -> Option<&'a Competitor> {
    competitors.iter().find(|c| {
        c.home_away
            .as_deref()
            .map(|h| h.eq_ignore_ascii_case(side))
            .unwrap_or(false)
    })
}

fn team_score(competitor: &Competitor) -> Option<TeamScore> {
    let team = competitor.team.as_ref()?;
    let name = [&team.display_name, &team.name, &team.short_display_name]
        .into_iter()
        .flatten()
        .find(|n| !n.is_empty())?
        .clone();

    Some(TeamScore {
        id: team
            .id
            .clone()
            .or_else(|| competitor.id.clone())
            .unwrap_or_default(),
        name,
        abbreviation: team.abbreviation.clone().unwrap_or_default(),
        score: competitor.score.as_ref().map(parse_score).unwrap_or(0),
        win_loss_record: overall_record(&competitor.records),
    })
}

fn parse_score(value: &Value) -> u32 {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| s as u32)
        .unwrap_or(0)
}

fn overall_record(records: &[TeamRecord]) -> Option<String> {
    let is_overall = |r: &&TeamRecord| {
        [&r.record_type, &r.name].into_iter().flatten().any(|k| {
            k.eq_ignore_ascii_case("total") || k.eq_ignore_ascii_case("overall")
        })
    };

    records
        .iter()
        .find(is_overall)
        .or_else(|| records.first())
        .and_then(|r| r.summary.clone())
        .filter(|s| !s.is_empty())
}

fn game_status(status: &EventStatus) -> GameStatus {
    let Some(status_type) = status.status_type.as_ref() else {
        return GameStatus::Unknown;
    };

    match status_type.state.as_deref() {
        Some("pre") => GameStatus::Scheduled,
        Some("in") => GameStatus::Live,
        Some("post") => GameStatus::Final,
        _ => match status_type.name.as_deref() {
            Some("STATUS_SCHEDULED") => GameStatus::Scheduled,
            Some("STATUS_IN_PROGRESS") | Some("STATUS_HALFTIME") | Some("STATUS_END_PERIOD") => {
                GameStatus::Live
            }
            Some("STATUS_FINAL") => GameStatus::Final,
            _ if status_type.completed == Some(true) => GameStatus::Final,
            _ => GameStatus::Unknown,
        },
    }
}

fn status_description(status: &EventStatus) -> Option<String> {
    let status_type = status.status_type.as_ref()?;
    [
        &status_type.short_detail,
        &status_type.detail,
        &status_type.description,
    ]
    .into_iter()
    .flatten()
    .find(|d| !d.is_empty())
    .cloned()
}

fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // "2024-01-07T18:00Z"
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M")
        .ok()
        .map(|naive| naive.and_utc())
}
