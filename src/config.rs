use std::collections::HashMap;
use std::env;

use chrono::Duration;

use crate::prediction::PolicyKind;

pub const DEFAULT_COMPETITION_WEIGHTS: &[(u32, u32)] = &[
    (2, 100), // Champions League
    (3, 95),  // Europa League
    (39, 90), // Premier League
    (140, 88), // La Liga
    (135, 85), // Serie A
    (78, 83), // Bundesliga
    (61, 80), // Ligue 1
];

pub const DEFAULT_MARQUEE_CLUBS: &[&str] = &[
    "Real Madrid",
    "Barcelona",
    "Manchester United",
    "Manchester City",
    "Liverpool",
    "Arsenal",
    "Bayern Munich",
    "PSG",
    "Juventus",
    "AC Milan",
    "Inter",
    "Chelsea",
];

const DEFAULT_MARQUEE_BOOST: u32 = 5;
const DEFAULT_SELECTION_TARGET: usize = 5;
const DEFAULT_SELECTION_MINIMUM: usize = 2;
const DEFAULT_FINISHED_TIMEOUT_MIN: i64 = 150;
const DEFAULT_HALFTIME_SUPPRESS_DIFF: i32 = -2;
const DEFAULT_KICKOFF_FALLBACK_MIN: i64 = 120;
// IST, the channel's audience.
const DEFAULT_DISPLAY_OFFSET_MIN: i32 = 330;

/// Inclusive range of minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteWindow {
    pub start: i64,
    pub end: i64,
}

impl MinuteWindow {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, minutes: f64) -> bool {
        minutes >= self.start as f64 && minutes <= self.end as f64
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub competition_weights: HashMap<u32, u32>,
    pub marquee_clubs: Vec<String>,
    pub marquee_boost: u32,
    pub selection_target: usize,
    pub selection_minimum: usize,
    pub alert_window: MinuteWindow,
    pub pre_window: MinuteWindow,
    pub halftime_elapsed_window: MinuteWindow,
    pub finished_timeout: Duration,
    /// Half-time differential at or below which the update is not sent.
    pub halftime_suppress_diff: i32,
    pub kickoff_fallback: Duration,
    pub display_offset_minutes: i32,
    pub major_competitions_only: bool,
    pub prediction_policy: PolicyKind,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            competition_weights: DEFAULT_COMPETITION_WEIGHTS.iter().copied().collect(),
            marquee_clubs: DEFAULT_MARQUEE_CLUBS.iter().map(|s| s.to_string()).collect(),
            marquee_boost: DEFAULT_MARQUEE_BOOST,
            selection_target: DEFAULT_SELECTION_TARGET,
            selection_minimum: DEFAULT_SELECTION_MINIMUM,
            alert_window: MinuteWindow::new(60, 90),
            pre_window: MinuteWindow::new(0, 35),
            halftime_elapsed_window: MinuteWindow::new(45, 55),
            finished_timeout: Duration::minutes(DEFAULT_FINISHED_TIMEOUT_MIN),
            halftime_suppress_diff: DEFAULT_HALFTIME_SUPPRESS_DIFF,
            kickoff_fallback: Duration::minutes(DEFAULT_KICKOFF_FALLBACK_MIN),
            display_offset_minutes: DEFAULT_DISPLAY_OFFSET_MIN,
            major_competitions_only: false,
            prediction_policy: PolicyKind::ShotCount,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(weights) = get("COMPETITION_WEIGHTS").and_then(|v| parse_weights(&v)) {
            cfg.competition_weights = weights;
        }
        if let Some(clubs) = get("MARQUEE_CLUBS") {
            let clubs: Vec<String> = clubs
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !clubs.is_empty() {
                cfg.marquee_clubs = clubs;
            }
        }
        if let Some(boost) = get("MARQUEE_BOOST").and_then(|v| v.parse::<u32>().ok()) {
            cfg.marquee_boost = boost.min(100);
        }
        if let Some(target) = get("SELECTION_TARGET").and_then(|v| v.parse::<usize>().ok()) {
            cfg.selection_target = target.clamp(1, 20);
        }
        if let Some(minimum) = get("SELECTION_MINIMUM").and_then(|v| v.parse::<usize>().ok()) {
            cfg.selection_minimum = minimum.clamp(1, cfg.selection_target);
        }
        if let Some(window) = get("ALERT_WINDOW_MINUTES").and_then(|v| parse_window(&v)) {
            cfg.alert_window = window;
        }
        if let Some(window) = get("PRE_WINDOW_MINUTES").and_then(|v| parse_window(&v)) {
            cfg.pre_window = window;
        }
        if let Some(window) = get("HALFTIME_ELAPSED_WINDOW").and_then(|v| parse_window(&v)) {
            cfg.halftime_elapsed_window = window;
        }
        if let Some(mins) = get("FINISHED_TIMEOUT_MINUTES").and_then(|v| v.parse::<i64>().ok()) {
            cfg.finished_timeout = Duration::minutes(mins.clamp(90, 24 * 60));
        }
        if let Some(diff) = get("HALFTIME_SUPPRESS_DIFF").and_then(|v| v.parse::<i32>().ok()) {
            cfg.halftime_suppress_diff = diff.clamp(-10, -2);
        }
        if let Some(mins) = get("KICKOFF_FALLBACK_MINUTES").and_then(|v| v.parse::<i64>().ok()) {
            cfg.kickoff_fallback = Duration::minutes(mins.clamp(0, 24 * 60));
        }
        if let Some(offset) = get("DISPLAY_UTC_OFFSET_MINUTES").and_then(|v| v.parse::<i32>().ok())
        {
            cfg.display_offset_minutes = offset.clamp(-12 * 60, 14 * 60);
        }
        if let Some(flag) = get("MAJOR_COMPETITIONS_ONLY") {
            cfg.major_competitions_only = parse_bool(&flag);
        }
        if let Some(kind) = get("PREDICTION_POLICY").and_then(|v| PolicyKind::parse(&v)) {
            cfg.prediction_policy = kind;
        }
        cfg
    }

    pub fn competition_weight(&self, competition_id: Option<u32>) -> u32 {
        competition_id
            .and_then(|id| self.competition_weights.get(&id).copied())
            .unwrap_or(0)
    }
}

pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_weights(raw: &str) -> Option<HashMap<u32, u32>> {
    let mut out = HashMap::new();
    for pair in raw.split(',') {
        let Some((id, weight)) = pair.split_once(':') else {
            continue;
        };
        let (Ok(id), Ok(weight)) = (id.trim().parse::<u32>(), weight.trim().parse::<u32>()) else {
            continue;
        };
        out.insert(id, weight);
    }
    if out.is_empty() { None } else { Some(out) }
}

fn parse_window(raw: &str) -> Option<MinuteWindow> {
    let (start, end) = raw.split_once(',').or_else(|| raw.split_once('-'))?;
    let start = start.trim().parse::<i64>().ok()?;
    let end = end.trim().parse::<i64>().ok()?;
    if start > end {
        return None;
    }
    Some(MinuteWindow::new(start, end))
}
