//! Upstream fixture/live-score sources.
//!
//! Providers only fetch and unwrap the response envelope. They hand back raw
//! records and leave field mapping to `fixture::Normalizer`.

use std::env;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::UpstreamFetchError;
use crate::http_client::http_client;

const API_SPORTS_URL: &str = "https://v3.football.api-sports.io/fixtures";
const FOOTBALL_DATA_URL: &str = "https://api.football-data.org/v4/matches";
const FOTMOB_MATCHES_URL: &str = "https://www.fotmob.com/api/data/matches";

pub trait FixtureProvider {
    /// All fixtures scheduled on `date` (UTC).
    fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Value>, UpstreamFetchError>;

    /// Fixtures currently in play.
    fn fetch_live(&self) -> Result<Vec<Value>, UpstreamFetchError>;

    /// A single fixture by upstream id. `Ok(None)` when the provider has no
    /// per-fixture lookup or does not know the id.
    fn fetch_fixture(&self, _id: &str) -> Result<Option<Value>, UpstreamFetchError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    ApiSports,
    FootballData,
    Fotmob,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "api-sports" | "apisports" | "api-football" => Some(Self::ApiSports),
            "football-data" | "footballdata" => Some(Self::FootballData),
            "fotmob" => Some(Self::Fotmob),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self> {
        let kind = match env::var("FIXTURE_PROVIDER") {
            Ok(raw) if !raw.trim().is_empty() => ProviderKind::parse(&raw)
                .ok_or_else(|| anyhow!("unknown FIXTURE_PROVIDER {raw:?}"))?,
            _ => ProviderKind::ApiSports,
        };
        let api_key = env::var("FOOTBALL_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(Self { kind, api_key })
    }

    pub fn build(self) -> Result<Box<dyn FixtureProvider>> {
        match self.kind {
            ProviderKind::ApiSports => {
                let key = self
                    .api_key
                    .ok_or_else(|| anyhow!("FOOTBALL_API_KEY is required for api-sports"))?;
                Ok(Box::new(ApiSportsProvider::new(key)))
            }
            ProviderKind::FootballData => {
                let key = self
                    .api_key
                    .ok_or_else(|| anyhow!("FOOTBALL_API_KEY is required for football-data"))?;
                Ok(Box::new(FootballDataProvider::new(key)))
            }
            ProviderKind::Fotmob => Ok(Box::new(FotmobProvider)),
        }
    }
}

fn get_json(
    url: &str,
    query: &[(&str, String)],
    headers: &[(&str, &str)],
) -> Result<Value, UpstreamFetchError> {
    let mut req = http_client()?.get(url).query(query);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    let resp = req.send()?;
    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        return Err(UpstreamFetchError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(trimmed)?)
}

fn array_at(root: &Value, key: &str) -> Vec<Value> {
    root.get(key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// api-sports v3: `{"response": [{"fixture": .., "league": .., "teams": .., "goals": ..}]}`.
#[derive(Debug, Clone)]
pub struct ApiSportsProvider {
    api_key: String,
}

impl ApiSportsProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    fn fetch(&self, query: &[(&str, String)]) -> Result<Vec<Value>, UpstreamFetchError> {
        let root = get_json(
            API_SPORTS_URL,
            query,
            &[("x-apisports-key", self.api_key.as_str())],
        )?;
        let records = array_at(&root, "response");
        debug!(count = records.len(), "api-sports fixtures");
        Ok(records)
    }
}

impl FixtureProvider for ApiSportsProvider {
    fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Value>, UpstreamFetchError> {
        self.fetch(&[("date", date.format("%Y-%m-%d").to_string())])
    }

    fn fetch_live(&self) -> Result<Vec<Value>, UpstreamFetchError> {
        self.fetch(&[("live", "all".to_string())])
    }

    fn fetch_fixture(&self, id: &str) -> Result<Option<Value>, UpstreamFetchError> {
        Ok(self.fetch(&[("id", id.to_string())])?.into_iter().next())
    }
}

/// football-data.org v4: `{"matches": [{"id", "utcDate", "status", "homeTeam", "score"}]}`.
#[derive(Debug, Clone)]
pub struct FootballDataProvider {
    api_key: String,
}

impl FootballDataProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

impl FixtureProvider for FootballDataProvider {
    fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Value>, UpstreamFetchError> {
        let day = date.format("%Y-%m-%d").to_string();
        let root = get_json(
            FOOTBALL_DATA_URL,
            &[("dateFrom", day.clone()), ("dateTo", day)],
            &[("X-Auth-Token", self.api_key.as_str())],
        )?;
        Ok(array_at(&root, "matches"))
    }

    fn fetch_live(&self) -> Result<Vec<Value>, UpstreamFetchError> {
        let root = get_json(
            FOOTBALL_DATA_URL,
            &[("status", "IN_PLAY,PAUSED".to_string())],
            &[("X-Auth-Token", self.api_key.as_str())],
        )?;
        Ok(array_at(&root, "matches"))
    }

    fn fetch_fixture(&self, id: &str) -> Result<Option<Value>, UpstreamFetchError> {
        let url = format!("{FOOTBALL_DATA_URL}/{id}");
        let root = get_json(&url, &[], &[("X-Auth-Token", self.api_key.as_str())])?;
        Ok(if root.is_object() { Some(root) } else { None })
    }
}

/// FotMob day listing: `{"leagues": [{"id", "primaryId", "name", "matches": [..]}]}`.
///
/// Matches are nested under their league; each record gets a `league`
/// object copied in so it normalizes on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct FotmobProvider;

impl FotmobProvider {
    pub fn flatten_leagues(root: &Value) -> Vec<Value> {
        let mut out = Vec::new();
        let Some(leagues) = root.get("leagues").and_then(|v| v.as_array()) else {
            return out;
        };
        for league in leagues {
            let id = league
                .get("primaryId")
                .filter(|v| !v.is_null())
                .or_else(|| league.get("id"))
                .cloned()
                .unwrap_or(Value::Null);
            let name = league.get("name").cloned().unwrap_or(Value::Null);
            let Some(matches) = league.get("matches").and_then(|v| v.as_array()) else {
                continue;
            };
            for record in matches {
                let mut record = record.clone();
                if let Some(obj) = record.as_object_mut() {
                    obj.insert("league".to_string(), json!({ "id": id, "name": name }));
                }
                out.push(record);
            }
        }
        out
    }
}

impl FixtureProvider for FotmobProvider {
    fn fetch_day(&self, date: NaiveDate) -> Result<Vec<Value>, UpstreamFetchError> {
        let root = get_json(
            FOTMOB_MATCHES_URL,
            &[("date", date.format("%Y%m%d").to_string())],
            &[],
        )?;
        Ok(Self::flatten_leagues(&root))
    }

    // No live endpoint; the undated listing carries in-play status.
    fn fetch_live(&self) -> Result<Vec<Value>, UpstreamFetchError> {
        let root = get_json(FOTMOB_MATCHES_URL, &[], &[])?;
        Ok(Self::flatten_leagues(&root))
    }
}
