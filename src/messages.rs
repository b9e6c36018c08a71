//! Plain-text notification bodies. Wording is presentation only; the
//! state machine never reads it back.

use chrono::{FixedOffset, Offset, Utc};

use crate::grader::DaySummary;
use crate::lifecycle::HalfTimeVerdict;
use crate::session::{DailySession, Match};

const SIGNOFF: &str = "Phantom Time";

fn header(title: &str, m: &Match, total: usize) -> String {
    format!(
        "MATCH {}/{} - {}\n\n{}\n{} vs {}\n",
        m.match_number, total, title, m.league, m.home, m.away
    )
}

fn tip_line(m: &Match) -> String {
    match m.tipped_team() {
        Some(team) => format!("Tip: {} WIN", team.to_uppercase()),
        None => "Tip: DRAW".to_string(),
    }
}

fn score_line(m: &Match, home_goals: u32, away_goals: u32) -> String {
    format!("{} {} - {} {}", m.home, home_goals, away_goals, m.away)
}

pub fn digest(session: &DailySession) -> String {
    let mut msg = String::from("GOOD MORNING! Today's matches:\n\n");
    for m in &session.matches {
        msg.push_str(&format!("Match {}: {} vs {}\n", m.match_number, m.home, m.away));
    }
    msg.push('\n');
    msg.push_str(SIGNOFF);
    msg
}

pub fn alert(m: &Match, display_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(display_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    let local = m.kickoff_utc.with_timezone(&offset);
    format!(
        "BE ACTIVE\n\n{} vs {}\nKICKOFF {} (UTC{})\n\n{}",
        m.home,
        m.away,
        local.format("%I:%M %p"),
        offset,
        SIGNOFF
    )
}

pub fn pre_match(m: &Match, total: usize) -> String {
    format!(
        "{}\n{}\n\n{}",
        header("PRE-MATCH ANALYSIS", m, total),
        tip_line(m),
        SIGNOFF
    )
}

pub fn halftime(
    m: &Match,
    total: usize,
    verdict: HalfTimeVerdict,
    home_goals: u32,
    away_goals: u32,
) -> String {
    let body = match verdict {
        HalfTimeVerdict::Winning => format!("On track.\n{}", tip_line(m)),
        HalfTimeVerdict::Hedge => "Balanced game. Cover the draw too.".to_string(),
        HalfTimeVerdict::Trailing => "One goal behind, plenty of time to turn it.".to_string(),
        HalfTimeVerdict::Suppressed => String::new(),
    };
    format!(
        "{}\n{}\n\n{}\n\n{}",
        header("HALF-TIME UPDATE", m, total),
        body,
        score_line(m, home_goals, away_goals),
        SIGNOFF
    )
}

pub fn full_time(
    m: &Match,
    total: usize,
    home_goals: u32,
    away_goals: u32,
    success: bool,
) -> String {
    let result = if success { "WON" } else { "LOST" };
    format!(
        "{}\nFINAL SCORE: {}\n\n{}",
        header(&format!("FULL-TIME RESULT - {result}"), m, total),
        score_line(m, home_goals, away_goals),
        SIGNOFF
    )
}

pub fn full_time_unknown(m: &Match, total: usize) -> String {
    format!(
        "{}\nNo final score available.\n\n{}",
        header("FULL-TIME", m, total),
        SIGNOFF
    )
}

pub fn day_summary(summary: &DaySummary) -> String {
    format!(
        "DAY SUMMARY\n\nMatches: {}\nPassed: {}\nFailed: {}\n\n{}",
        summary.total, summary.passed, summary.failed, SIGNOFF
    )
}
