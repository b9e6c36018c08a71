use crate::config::TrackerConfig;
use crate::fixture::{Fixture, FixtureStatus};

fn club_boost(team: &str, cfg: &TrackerConfig) -> u32 {
    let team = team.to_lowercase();
    let marquee = cfg
        .marquee_clubs
        .iter()
        .any(|club| !club.is_empty() && team.contains(&club.to_lowercase()));
    if marquee { cfg.marquee_boost } else { 0 }
}

pub fn importance_score(fixture: &Fixture, cfg: &TrackerConfig) -> u32 {
    cfg.competition_weight(fixture.competition_id)
        + club_boost(&fixture.home_name, cfg)
        + club_boost(&fixture.away_name, cfg)
}

/// Descending importance. Equal scores keep upstream fetch order.
pub fn rank(fixtures: &[Fixture], cfg: &TrackerConfig) -> Vec<Fixture> {
    let mut scored: Vec<(u32, &Fixture)> = fixtures
        .iter()
        .map(|f| (importance_score(f, cfg), f))
        .collect();
    // sort_by is stable.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, f)| f.clone()).collect()
}

/// The day's picks, or `None` when there is nothing to track today.
///
/// Takes the top `selection_target` scheduled fixtures. With fewer than
/// `selection_minimum` scheduled, falls back to the head of the full ranking
/// even if those fixtures already started.
pub fn select(fixtures: &[Fixture], cfg: &TrackerConfig) -> Option<Vec<Fixture>> {
    if fixtures.is_empty() {
        return None;
    }
    let ranked = rank(fixtures, cfg);
    let scheduled: Vec<Fixture> = ranked
        .iter()
        .filter(|f| f.status == FixtureStatus::Scheduled)
        .take(cfg.selection_target)
        .cloned()
        .collect();
    if scheduled.len() >= cfg.selection_minimum {
        return Some(scheduled);
    }
    Some(ranked.into_iter().take(cfg.selection_minimum).collect())
}

/// Keeps only fixtures from competitions in the weight table.
pub fn major_only(fixtures: Vec<Fixture>, cfg: &TrackerConfig) -> Vec<Fixture> {
    fixtures
        .into_iter()
        .filter(|f| {
            f.competition_id
                .is_some_and(|id| cfg.competition_weights.contains_key(&id))
        })
        .collect()
}
