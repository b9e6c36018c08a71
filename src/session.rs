//! Persisted day state: one `DailySession` holding the tracked `Match` records.
//!
//! The JSON layout is camelCase. Key names written by the older tooling
//! (`match_id`, `base_outcome`, `alert`, ...) are still accepted on load.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fixture::Fixture;
use crate::prediction::Outcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(alias = "match_id")]
    pub match_id: String,
    #[serde(alias = "match_number")]
    pub match_number: u32,
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub league: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition_id: Option<u32>,
    #[serde(alias = "kickoff")]
    pub kickoff_utc: DateTime<Utc>,
    #[serde(alias = "base_outcome")]
    pub predicted_outcome: Outcome,
    #[serde(default, alias = "alert")]
    pub alerted: bool,
    #[serde(default, alias = "pre")]
    pub pre_sent: bool,
    #[serde(default, alias = "ht")]
    pub ht_sent: bool,
    #[serde(default)]
    pub ht_draw_advised: bool,
    #[serde(default, alias = "ft")]
    pub ft_sent: bool,
    #[serde(default)]
    pub success: Option<bool>,
}

impl Match {
    pub fn from_fixture(fixture: &Fixture, match_number: u32, predicted_outcome: Outcome) -> Self {
        Self {
            match_id: fixture.id.clone(),
            match_number,
            home: fixture.home_name.clone(),
            away: fixture.away_name.clone(),
            league: fixture.competition_name.clone(),
            competition_id: fixture.competition_id,
            kickoff_utc: fixture.kickoff_utc,
            predicted_outcome,
            alerted: false,
            pre_sent: false,
            ht_sent: false,
            ht_draw_advised: false,
            ft_sent: false,
            success: None,
        }
    }

    /// Name of the side the tip backs, `None` for a draw tip.
    pub fn tipped_team(&self) -> Option<&str> {
        match self.predicted_outcome {
            Outcome::Home => Some(&self.home),
            Outcome::Away => Some(&self.away),
            Outcome::Draw => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySession {
    pub date: NaiveDate,
    #[serde(default)]
    pub day_summary_sent: bool,
    #[serde(default)]
    pub matches: Vec<Match>,
}

impl DailySession {
    pub fn new(date: NaiveDate, matches: Vec<Match>) -> Self {
        Self {
            date,
            day_summary_sent: false,
            matches,
        }
    }

    /// Parses stored state. Empty, placeholder or malformed state is "no session".
    pub fn from_json(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" || trimmed == "{}" {
            return None;
        }
        match serde_json::from_str::<DailySession>(trimmed) {
            Ok(mut session) => {
                session.matches.sort_by_key(|m| m.match_number);
                Some(session)
            }
            Err(err) => {
                warn!(error = %err, "stored state unreadable, treating as no session");
                None
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// True once the selection job has produced matches for `date`.
    pub fn is_active_for(&self, date: NaiveDate) -> bool {
        self.date == date && !self.matches.is_empty()
    }
}
