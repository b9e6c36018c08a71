#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Value, json};

use matchday::error::{NotifyError, StateStoreError, UpstreamFetchError};
use matchday::fixture::Fixture;
use matchday::notify::Notifier;
use matchday::prediction::{Outcome, PredictionPolicy};
use matchday::provider::FixtureProvider;
use matchday::session::{DailySession, Match};
use matchday::store::{MemoryStore, StateStore};

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn read_json(name: &str) -> Value {
    serde_json::from_str(&read_fixture(name)).expect("fixture should be valid json")
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 11, hour, minute, 0)
        .single()
        .expect("valid time")
}

pub fn match_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 11).expect("valid date")
}

/// An api-sports shaped record.
pub fn api_record(
    id: u64,
    league_id: u32,
    home: &str,
    away: &str,
    kickoff: DateTime<Utc>,
    status: &str,
    elapsed: Option<u32>,
    goals: (u32, u32),
) -> Value {
    json!({
        "fixture": {
            "id": id,
            "date": kickoff.to_rfc3339(),
            "status": { "short": status, "elapsed": elapsed }
        },
        "league": { "id": league_id, "name": format!("League {league_id}") },
        "teams": { "home": { "name": home }, "away": { "name": away } },
        "goals": { "home": goals.0, "away": goals.1 }
    })
}

pub fn fixture(id: &str, competition_id: u32, home: &str, away: &str) -> Fixture {
    Fixture {
        id: id.to_string(),
        competition_id: Some(competition_id),
        competition_name: format!("League {competition_id}"),
        home_name: home.to_string(),
        away_name: away.to_string(),
        kickoff_utc: at(20, 0),
        kickoff_estimated: false,
        status: matchday::fixture::FixtureStatus::Scheduled,
        home_goals: 0,
        away_goals: 0,
        elapsed_minutes: None,
        extras: Default::default(),
    }
}

pub fn tracked(id: &str, number: u32, kickoff: DateTime<Utc>, tip: Outcome) -> Match {
    let mut f = fixture(id, 2, &format!("Home {id}"), &format!("Away {id}"));
    f.kickoff_utc = kickoff;
    Match::from_fixture(&f, number, tip)
}

pub fn session_json(matches: Vec<Match>) -> String {
    DailySession::new(match_day(), matches)
        .to_json()
        .expect("session should serialize")
}

pub fn stored_session(raw: Option<String>) -> DailySession {
    DailySession::from_json(&raw.expect("state should be stored")).expect("state should parse")
}

#[derive(Default)]
pub struct FakeProvider {
    pub day: RefCell<Vec<Value>>,
    pub live: RefCell<Vec<Value>>,
    pub by_id: RefCell<HashMap<String, Value>>,
    pub offline: Cell<bool>,
    pub lookups: Cell<usize>,
}

impl FakeProvider {
    pub fn with_day(day: Vec<Value>) -> Self {
        let provider = Self::default();
        *provider.day.borrow_mut() = day;
        provider
    }

    pub fn set_live(&self, live: Vec<Value>) {
        *self.live.borrow_mut() = live;
    }

    fn offline_err(&self) -> UpstreamFetchError {
        UpstreamFetchError::Client("offline".to_string())
    }
}

impl FixtureProvider for FakeProvider {
    fn fetch_day(&self, _date: NaiveDate) -> Result<Vec<Value>, UpstreamFetchError> {
        if self.offline.get() {
            return Err(self.offline_err());
        }
        Ok(self.day.borrow().clone())
    }

    fn fetch_live(&self) -> Result<Vec<Value>, UpstreamFetchError> {
        if self.offline.get() {
            return Err(self.offline_err());
        }
        Ok(self.live.borrow().clone())
    }

    fn fetch_fixture(&self, id: &str) -> Result<Option<Value>, UpstreamFetchError> {
        self.lookups.set(self.lookups.get() + 1);
        if self.offline.get() {
            return Err(self.offline_err());
        }
        Ok(self.by_id.borrow().get(id).cloned())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<String>>,
    pub failing: Cell<bool>,
    /// Starts failing once this many messages went out.
    pub fail_after: Cell<Option<usize>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.sent
            .borrow()
            .iter()
            .filter(|text| text.contains(needle))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, text: &str) -> Result<(), NotifyError> {
        let exhausted = self
            .fail_after
            .get()
            .is_some_and(|limit| self.sent.borrow().len() >= limit);
        if self.failing.get() || exhausted {
            return Err(NotifyError::Unavailable("channel down".to_string()));
        }
        self.sent.borrow_mut().push(text.to_string());
        Ok(())
    }
}

pub struct FixedPolicy(pub Outcome);

impl PredictionPolicy for FixedPolicy {
    fn predict(&self, _fixture: &Fixture) -> Outcome {
        self.0
    }
}

/// Memory store whose first `failing_loads` reads error out.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing_loads: Cell<usize>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, failing_loads: usize) -> Self {
        Self {
            inner,
            failing_loads: Cell::new(failing_loads),
        }
    }
}

impl StateStore for FlakyStore {
    fn load(&self) -> Result<Option<String>, StateStoreError> {
        let left = self.failing_loads.get();
        if left > 0 {
            self.failing_loads.set(left - 1);
            return Err(StateStoreError::Unavailable("gist 503".to_string()));
        }
        self.inner.load()
    }

    fn save(&self, contents: &str) -> Result<(), StateStoreError> {
        self.inner.save(contents)
    }
}
