use crate::prediction::Outcome;
use crate::session::{DailySession, Match};

/// Full-time verdict for one match.
///
/// A level final score also counts when the half-time update advised
/// covering the draw, whatever the tip was.
pub fn grade(m: &Match, home_goals: u32, away_goals: u32) -> bool {
    let level = home_goals == away_goals;
    let tip_landed = match m.predicted_outcome {
        Outcome::Draw => level,
        Outcome::Home => home_goals > away_goals,
        Outcome::Away => away_goals > home_goals,
    };
    tip_landed || (level && m.ht_draw_advised)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

/// The day summary, once every match is through full time and it has not
/// gone out yet. Matches closed without a result count as failed.
pub fn day_summary_due(session: &DailySession) -> Option<DaySummary> {
    if session.day_summary_sent || session.matches.is_empty() {
        return None;
    }
    if !session.matches.iter().all(|m| m.ft_sent) {
        return None;
    }
    let total = session.matches.len();
    let passed = session
        .matches
        .iter()
        .filter(|m| m.success == Some(true))
        .count();
    Some(DaySummary {
        passed,
        failed: total - passed,
        total,
    })
}
