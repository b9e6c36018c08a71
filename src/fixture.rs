//! Normalization boundary between the upstream providers and the tracker.
//!
//! Every provider hands over raw JSON records; `Normalizer::normalize` turns
//! one of them into a `Fixture`. Nothing downstream knows which provider a
//! fixture came from.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SchemaError;

const MAX_LIVE_MINUTE: u32 = 120;
const MAX_STOPPAGE_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureStatus {
    Scheduled,
    Live,
    Halftime,
    Finished,
    Unknown,
}

/// Optional signals some upstreams carry. Only the prediction policies read them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureExtras {
    pub shots_on_target: Option<(u32, u32)>,
    pub red_cards: Option<(u32, u32)>,
    pub halftime_score: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub id: String,
    pub competition_id: Option<u32>,
    pub competition_name: String,
    pub home_name: String,
    pub away_name: String,
    pub kickoff_utc: DateTime<Utc>,
    /// Set when the upstream kickoff was missing or unparseable.
    pub kickoff_estimated: bool,
    pub status: FixtureStatus,
    pub home_goals: u32,
    pub away_goals: u32,
    pub elapsed_minutes: Option<u32>,
    pub extras: FixtureExtras,
}

/// Upstream status token -> internal status.
///
/// Tokens are compared after canonicalization (trimmed, upper-cased, spaces
/// and dashes as underscores, trailing minute tick removed). A bare minute
/// such as `67` or `45+2` is always `Live`.
#[derive(Debug, Clone)]
pub struct StatusTable {
    tokens: HashMap<String, FixtureStatus>,
}

impl Default for StatusTable {
    fn default() -> Self {
        let mut table = Self {
            tokens: HashMap::new(),
        };
        for token in ["SCHEDULED", "TIMED", "NS", "TBD"] {
            table.insert(token, FixtureStatus::Scheduled);
        }
        for token in ["1H", "2H", "ET", "BT", "P", "LIVE", "IN_PLAY", "PLAYING"] {
            table.insert(token, FixtureStatus::Live);
        }
        for token in ["HT", "HALFTIME", "HALF_TIME", "PAUSED"] {
            table.insert(token, FixtureStatus::Halftime);
        }
        for token in ["FT", "FINISHED", "AET", "PEN", "FT_PEN"] {
            table.insert(token, FixtureStatus::Finished);
        }
        table
    }
}

impl StatusTable {
    pub fn insert(&mut self, token: &str, status: FixtureStatus) {
        self.tokens.insert(canonical_token(token), status);
    }

    pub fn with(mut self, token: &str, status: FixtureStatus) -> Self {
        self.insert(token, status);
        self
    }

    /// Returns the status and, for minute tokens, the elapsed minutes.
    pub fn classify(&self, raw: &str) -> (FixtureStatus, Option<u32>) {
        let token = canonical_token(raw);
        if let Some(status) = self.tokens.get(&token) {
            return (*status, None);
        }
        if let Some(minute) = parse_minute_token(&token) {
            return (FixtureStatus::Live, Some(minute));
        }
        (FixtureStatus::Unknown, None)
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    statuses: StatusTable,
    kickoff_fallback: Duration,
}

impl Normalizer {
    pub fn new(statuses: StatusTable, kickoff_fallback: Duration) -> Self {
        Self {
            statuses,
            kickoff_fallback,
        }
    }

    pub fn normalize(&self, raw: &Value, now: DateTime<Utc>) -> Result<Fixture, SchemaError> {
        if !raw.is_object() {
            return Err(SchemaError::NotAnObject);
        }
        let id = first(raw, ID_PATHS)
            .and_then(as_id)
            .ok_or(SchemaError::MissingId)?;

        let home_name = pick_string(raw, HOME_NAME_PATHS);
        let away_name = pick_string(raw, AWAY_NAME_PATHS);
        let (Some(home_name), Some(away_name)) = (home_name, away_name) else {
            return Err(SchemaError::MissingTeams { id });
        };

        let (kickoff_utc, kickoff_estimated) = match pick_kickoff(raw) {
            Some(kickoff) => (kickoff, false),
            None => (now + self.kickoff_fallback, true),
        };

        let (status, minute_from_status) = self.status_of(raw);
        let elapsed_minutes = minute_from_status.or_else(|| pick_minute(raw, ELAPSED_PATHS));

        Ok(Fixture {
            id,
            competition_id: pick_u32(raw, COMPETITION_ID_PATHS),
            competition_name: pick_string(raw, COMPETITION_NAME_PATHS).unwrap_or_default(),
            home_name,
            away_name,
            kickoff_utc,
            kickoff_estimated,
            status,
            home_goals: pick_u32(raw, HOME_GOAL_PATHS).unwrap_or(0),
            away_goals: pick_u32(raw, AWAY_GOAL_PATHS).unwrap_or(0),
            elapsed_minutes,
            extras: parse_extras(raw),
        })
    }

    /// Normalizes a batch, dropping (and logging) records that fail.
    pub fn normalize_all(&self, raws: &[Value], now: DateTime<Utc>) -> Vec<Fixture> {
        let mut out = Vec::with_capacity(raws.len());
        for raw in raws {
            match self.normalize(raw, now) {
                Ok(fixture) => {
                    if fixture.kickoff_estimated {
                        debug!(
                            fixture_id = %fixture.id,
                            "kickoff missing upstream, using fallback"
                        );
                    }
                    out.push(fixture);
                }
                Err(err) => warn!(error = %err, "dropping upstream record"),
            }
        }
        out
    }

    fn status_of(&self, raw: &Value) -> (FixtureStatus, Option<u32>) {
        for path in STATUS_PATHS {
            let Some(token) = at(raw, path).and_then(|v| v.as_str()) else {
                continue;
            };
            let classified = self.statuses.classify(token);
            if classified.0 != FixtureStatus::Unknown {
                return classified;
            }
        }
        status_from_flags(raw).map_or((FixtureStatus::Unknown, None), |s| (s, None))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(StatusTable::default(), Duration::minutes(120))
    }
}

/// Set-union of fixtures keyed by id, in first-seen order.
///
/// Later records overwrite status, score, elapsed time and extras; names,
/// competition and kickoff stay as first seen.
pub fn merge_fixtures(fixtures: Vec<Fixture>) -> Vec<Fixture> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Fixture> = Vec::with_capacity(fixtures.len());
    for fixture in fixtures {
        match index.get(&fixture.id) {
            Some(&pos) => {
                let existing = &mut out[pos];
                existing.status = fixture.status;
                existing.home_goals = fixture.home_goals;
                existing.away_goals = fixture.away_goals;
                existing.elapsed_minutes = fixture.elapsed_minutes;
                existing.extras = fixture.extras;
            }
            None => {
                index.insert(fixture.id.clone(), out.len());
                out.push(fixture);
            }
        }
    }
    out
}

type Path = &'static [&'static str];

const ID_PATHS: &[Path] = &[
    &["fixture", "id"],
    &["id"],
    &["matchId"],
    &["match_id"],
    &["fixtureId"],
];

const HOME_NAME_PATHS: &[Path] = &[
    &["teams", "home"],
    &["homeTeam"],
    &["home"],
    &["homeName"],
    &["home_team"],
];

const AWAY_NAME_PATHS: &[Path] = &[
    &["teams", "away"],
    &["awayTeam"],
    &["away"],
    &["awayName"],
    &["away_team"],
];

const COMPETITION_ID_PATHS: &[Path] = &[
    &["league", "id"],
    &["competition", "id"],
    &["competitionId"],
    &["leagueId"],
    &["league_id"],
    &["tournament", "leagueId"],
];

const COMPETITION_NAME_PATHS: &[Path] = &[
    &["league", "name"],
    &["competition", "name"],
    &["competitionName"],
    &["leagueName"],
    &["league"],
];

const KICKOFF_PATHS: &[Path] = &[
    &["fixture", "date"],
    &["utcDate"],
    &["status", "utcTime"],
    &["kickoffUtc"],
    &["kickoff"],
    &["startTime"],
    &["date"],
    &["fixture", "timestamp"],
    &["timestamp"],
];

const STATUS_PATHS: &[Path] = &[
    &["fixture", "status", "short"],
    &["status", "short"],
    &["status", "reason", "short"],
    &["status", "liveTime", "short"],
    &["status"],
    &["statusShort"],
    &["state"],
    &["matchStatus"],
];

const ELAPSED_PATHS: &[Path] = &[
    &["fixture", "status", "elapsed"],
    &["status", "elapsed"],
    &["status", "liveTime", "short"],
    &["minute"],
    &["elapsed"],
    &["elapsedMinutes"],
];

const HOME_GOAL_PATHS: &[Path] = &[
    &["goals", "home"],
    &["score", "fullTime", "home"],
    &["score", "current", "home"],
    &["home", "score"],
    &["homeGoals"],
    &["homeScore"],
    &["home_score"],
    &["score", "home"],
];

const AWAY_GOAL_PATHS: &[Path] = &[
    &["goals", "away"],
    &["score", "fullTime", "away"],
    &["score", "current", "away"],
    &["away", "score"],
    &["awayGoals"],
    &["awayScore"],
    &["away_score"],
    &["score", "away"],
];

fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = value;
    for key in path {
        cur = cur.get(*key)?;
    }
    if cur.is_null() { None } else { Some(cur) }
}

fn first<'a>(value: &'a Value, paths: &[Path]) -> Option<&'a Value> {
    paths.iter().find_map(|path| at(value, path))
}

fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

fn pick_string(value: &Value, paths: &[Path]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| at(value, path))
        .find_map(as_string)
}

fn pick_u32(value: &Value, paths: &[Path]) -> Option<u32> {
    paths
        .iter()
        .filter_map(|path| at(value, path))
        .find_map(as_u32)
}

fn pick_minute(value: &Value, paths: &[Path]) -> Option<u32> {
    paths.iter().filter_map(|path| at(value, path)).find_map(|v| {
        as_u32(v).or_else(|| v.as_str().and_then(|s| parse_minute_token(&canonical_token(s))))
    })
}

fn as_u32(value: &Value) -> Option<u32> {
    if let Some(num) = value.as_u64() {
        return u32::try_from(num).ok();
    }
    value.as_str().and_then(|s| s.trim().parse::<u32>().ok())
}

fn as_string(value: &Value) -> Option<String> {
    let name = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("name") {
                name.trim().to_string()
            } else if let Some(Value::String(name)) = map.get("shortName") {
                name.trim().to_string()
            } else if let Some(Value::Object(team)) = map.get("team") {
                match team.get("name") {
                    Some(Value::String(name)) => name.trim().to_string(),
                    _ => return None,
                }
            } else {
                return None;
            }
        }
        _ => return None,
    };
    if name.is_empty() { None } else { Some(name) }
}

fn pick_kickoff(raw: &Value) -> Option<DateTime<Utc>> {
    KICKOFF_PATHS
        .iter()
        .filter_map(|path| at(raw, path))
        .find_map(|v| match v {
            Value::String(s) => parse_kickoff(s),
            Value::Number(n) => n.as_i64().and_then(from_epoch),
            _ => None,
        })
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    // Millisecond timestamps show up in some feeds.
    if raw > 100_000_000_000 {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M",
];

/// Parses an upstream timestamp. Values without an offset are taken as UTC.
pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = trimmed.trim_end_matches('Z');
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.and_utc())
}

fn canonical_token(raw: &str) -> String {
    raw.trim()
        .trim_end_matches('\'')
        .trim()
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}

/// `67`, `45+2`: an in-play minute. Returns minutes including stoppage time.
fn parse_minute_token(token: &str) -> Option<u32> {
    let (base, extra) = match token.split_once('+') {
        Some((base, extra)) => (base.trim(), Some(extra.trim())),
        None => (token, None),
    };
    if base.is_empty() || !base.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let base = base.parse::<u32>().ok()?;
    if !(1..=MAX_LIVE_MINUTE).contains(&base) {
        return None;
    }
    let extra = match extra {
        Some(extra) if !extra.is_empty() && extra.chars().all(|c| c.is_ascii_digit()) => {
            extra.parse::<u32>().ok()?
        }
        Some(_) => return None,
        None => 0,
    };
    if extra > MAX_STOPPAGE_MINUTES {
        return None;
    }
    base.checked_add(extra)
}

// Providers that expose booleans instead of a status token.
fn status_from_flags(raw: &Value) -> Option<FixtureStatus> {
    let status = raw.get("status").filter(|v| v.is_object())?;
    let flag = |key: &str| status.get(key).and_then(|v| v.as_bool());
    if flag("cancelled") == Some(true) {
        return Some(FixtureStatus::Unknown);
    }
    if flag("finished") == Some(true) {
        return Some(FixtureStatus::Finished);
    }
    if flag("ongoing") == Some(true) || flag("started") == Some(true) {
        return Some(FixtureStatus::Live);
    }
    if flag("started") == Some(false) {
        return Some(FixtureStatus::Scheduled);
    }
    None
}

fn parse_extras(raw: &Value) -> FixtureExtras {
    FixtureExtras {
        shots_on_target: parse_shots_on_target(raw),
        red_cards: pair(
            at(raw, &["cards", "red", "home"]).and_then(as_u32),
            at(raw, &["cards", "red", "away"]).and_then(as_u32),
        ),
        halftime_score: pair(
            pick_u32(raw, &[&["score", "halftime", "home"], &["score", "halfTime", "home"]]),
            pick_u32(raw, &[&["score", "halftime", "away"], &["score", "halfTime", "away"]]),
        ),
    }
}

fn pair(home: Option<u32>, away: Option<u32>) -> Option<(u32, u32)> {
    if home.is_none() && away.is_none() {
        return None;
    }
    Some((home.unwrap_or(0), away.unwrap_or(0)))
}

fn parse_shots_on_target(raw: &Value) -> Option<(u32, u32)> {
    let teams = raw.get("statistics")?.as_array()?;
    if teams.is_empty() {
        return None;
    }
    let home_id = at(raw, &["teams", "home", "id"]).and_then(|v| v.as_u64());
    let (mut home, mut away) = (0, 0);
    for team in teams {
        let shots = team
            .get("statistics")
            .and_then(|v| v.as_array())
            .and_then(|stats| {
                stats
                    .iter()
                    .find(|s| s.get("type").and_then(|t| t.as_str()) == Some("Shots on Goal"))
            })
            .and_then(|s| s.get("value"))
            .and_then(as_u32)
            .unwrap_or(0);
        let team_id = at(team, &["team", "id"]).and_then(|v| v.as_u64());
        if home_id.is_some() && team_id == home_id {
            home = shots;
        } else {
            away = shots;
        }
    }
    Some((home, away))
}
