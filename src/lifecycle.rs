//! Per-match stage transitions.
//!
//! Each stage flag on a `Match` flips `false -> true` once and is never
//! reset. `due_events` is evaluated fresh on every poll against the wall
//! clock and the latest upstream observation; `apply_event` is the only
//! place flags are written.

use chrono::{DateTime, Utc};

use crate::config::TrackerConfig;
use crate::fixture::{Fixture, FixtureStatus};
use crate::grader;
use crate::prediction::Outcome;
use crate::session::Match;

/// What the latest upstream queries said about one tracked match.
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    Seen(&'a Fixture),
    /// Upstream answered and the fixture was not in it.
    Absent,
    /// Every upstream query for this match failed.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Alert,
    PreMatch,
    HalfTime,
    FullTime,
}

impl Stage {
    pub fn is_done(self, m: &Match) -> bool {
        match self {
            Stage::Alert => m.alerted,
            Stage::PreMatch => m.pre_sent,
            Stage::HalfTime => m.ht_sent,
            Stage::FullTime => m.ft_sent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfTimeVerdict {
    Winning,
    /// Level on the tipped margin: advise covering the draw.
    Hedge,
    /// Behind, but not by enough to suppress.
    Trailing,
    /// Too far behind to message, or a hedge already went out.
    Suppressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Alert,
    PreMatch,
    HalfTime {
        verdict: HalfTimeVerdict,
        home_goals: u32,
        away_goals: u32,
    },
    FullTime {
        home_goals: u32,
        away_goals: u32,
    },
    /// The fixture vanished from upstream long after kickoff. No result.
    FullTimeTimedOut,
}

impl StageEvent {
    pub fn stage(&self) -> Stage {
        match self {
            StageEvent::Alert => Stage::Alert,
            StageEvent::PreMatch => Stage::PreMatch,
            StageEvent::HalfTime { .. } => Stage::HalfTime,
            StageEvent::FullTime { .. } | StageEvent::FullTimeTimedOut => Stage::FullTime,
        }
    }

    pub fn sends_message(&self) -> bool {
        !matches!(
            self,
            StageEvent::HalfTime {
                verdict: HalfTimeVerdict::Suppressed,
                ..
            }
        )
    }
}

pub fn minutes_until_kickoff(m: &Match, now: DateTime<Utc>) -> f64 {
    (m.kickoff_utc - now).num_seconds() as f64 / 60.0
}

/// Goal differential in favour of the tip.
///
/// For a draw tip: 0 when level, -1 when one goal apart, -2 otherwise.
pub fn prediction_diff(predicted: Outcome, home_goals: u32, away_goals: u32) -> i32 {
    let home = home_goals as i32;
    let away = away_goals as i32;
    match predicted {
        Outcome::Home => home - away,
        Outcome::Away => away - home,
        Outcome::Draw => match (home - away).abs() {
            0 => 0,
            1 => -1,
            _ => -2,
        },
    }
}

pub fn halftime_verdict(diff: i32, suppress_at: i32) -> HalfTimeVerdict {
    if diff <= suppress_at {
        HalfTimeVerdict::Suppressed
    } else if diff > 0 {
        HalfTimeVerdict::Winning
    } else if diff == 0 {
        HalfTimeVerdict::Hedge
    } else {
        HalfTimeVerdict::Trailing
    }
}

fn at_halftime(fixture: &Fixture, cfg: &TrackerConfig) -> bool {
    match fixture.status {
        FixtureStatus::Halftime => true,
        // Some feeds never report a pause; the clock standing in the window is the proxy.
        FixtureStatus::Live => fixture
            .elapsed_minutes
            .is_some_and(|e| cfg.halftime_elapsed_window.contains(f64::from(e))),
        _ => false,
    }
}

/// Transitions that are due for `m` right now, in stage order.
pub fn due_events(
    m: &Match,
    observation: Observation<'_>,
    now: DateTime<Utc>,
    cfg: &TrackerConfig,
) -> Vec<StageEvent> {
    let mut events = Vec::new();
    if m.ft_sent {
        return events;
    }

    let minutes = minutes_until_kickoff(m, now);
    if !m.alerted && cfg.alert_window.contains(minutes) {
        events.push(StageEvent::Alert);
    }
    if !m.pre_sent && cfg.pre_window.contains(minutes) {
        events.push(StageEvent::PreMatch);
    }

    match observation {
        Observation::Seen(fixture) => {
            if !m.ht_sent && at_halftime(fixture, cfg) {
                let diff =
                    prediction_diff(m.predicted_outcome, fixture.home_goals, fixture.away_goals);
                let mut verdict = halftime_verdict(diff, cfg.halftime_suppress_diff);
                if verdict == HalfTimeVerdict::Hedge && m.ht_draw_advised {
                    verdict = HalfTimeVerdict::Suppressed;
                }
                events.push(StageEvent::HalfTime {
                    verdict,
                    home_goals: fixture.home_goals,
                    away_goals: fixture.away_goals,
                });
            }
            match fixture.status {
                FixtureStatus::Finished => events.push(StageEvent::FullTime {
                    home_goals: fixture.home_goals,
                    away_goals: fixture.away_goals,
                }),
                // Postponed fixtures stay listed as scheduled. Unknown (suspended,
                // interrupted) stays open so a resumed match can still be graded.
                FixtureStatus::Scheduled if now > m.kickoff_utc + cfg.finished_timeout => {
                    events.push(StageEvent::FullTimeTimedOut)
                }
                _ => {}
            }
        }
        Observation::Absent => {
            if now > m.kickoff_utc + cfg.finished_timeout {
                events.push(StageEvent::FullTimeTimedOut);
            }
        }
        Observation::Unavailable => {}
    }
    events
}

/// Records a transition on the match. Flags only ever move to `true`.
pub fn apply_event(m: &mut Match, event: &StageEvent) {
    match *event {
        StageEvent::Alert => m.alerted = true,
        StageEvent::PreMatch => m.pre_sent = true,
        StageEvent::HalfTime { verdict, .. } => {
            if verdict == HalfTimeVerdict::Hedge {
                m.ht_draw_advised = true;
            }
            m.ht_sent = true;
        }
        StageEvent::FullTime {
            home_goals,
            away_goals,
        } => {
            if !m.ft_sent {
                m.success = Some(grader::grade(m, home_goals, away_goals));
                m.ft_sent = true;
            }
        }
        StageEvent::FullTimeTimedOut => {
            if !m.ft_sent {
                m.success = None;
                m.ft_sent = true;
            }
        }
    }
}
