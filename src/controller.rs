//! The two scheduled runs: morning selection and the periodic check poll.
//!
//! Each run is one short-lived process. State is loaded from the store at
//! the start of every run and written back after every stage transition,
//! so a crash part-way through a poll does not replay stages that already
//! went out.
//!
//! Runs are single-threaded and do no locking of their own. If the
//! scheduler overlaps two check runs, both may load the same state before
//! either saves, and a stage can then be sent twice. That duplicate is
//! accepted; a stage flag still never flips back.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::{StateStoreError, UpstreamFetchError};
use crate::fixture::{Fixture, Normalizer, StatusTable, merge_fixtures};
use crate::grader::{self, day_summary_due};
use crate::lifecycle::{Observation, StageEvent, apply_event, due_events};
use crate::messages;
use crate::notify::Notifier;
use crate::prediction::PredictionPolicy;
use crate::provider::FixtureProvider;
use crate::selection::{major_only, select};
use crate::session::{DailySession, Match};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorningOutcome {
    /// Today's session already exists; nothing was done.
    AlreadySelected,
    /// The state store could not be read. Nothing was fetched, saved or sent.
    StateUnavailable,
    /// No fixtures today; no session was created.
    NoFixtures,
    Selected { matches: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub transitions: usize,
    pub messages_sent: usize,
    pub send_failures: usize,
    pub summary_sent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    NoSession,
    /// Every match is closed and the summary is out; upstream was not queried.
    DayComplete,
    Polled(CheckReport),
}

/// Normalized upstream snapshot for one check run.
struct LiveFeed {
    fixtures: Vec<Fixture>,
    /// At least one upstream query succeeded.
    answered: bool,
}

impl LiveFeed {
    fn find(&self, id: &str) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == id)
    }
}

pub struct SessionController<'a> {
    config: &'a TrackerConfig,
    normalizer: Normalizer,
    store: &'a dyn StateStore,
    provider: &'a dyn FixtureProvider,
    notifier: &'a dyn Notifier,
    policy: &'a dyn PredictionPolicy,
}

impl<'a> SessionController<'a> {
    pub fn new(
        config: &'a TrackerConfig,
        store: &'a dyn StateStore,
        provider: &'a dyn FixtureProvider,
        notifier: &'a dyn Notifier,
        policy: &'a dyn PredictionPolicy,
    ) -> Self {
        Self {
            config,
            normalizer: Normalizer::new(StatusTable::default(), config.kickoff_fallback),
            store,
            provider,
            notifier,
            policy,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Builds today's session from the day's fixtures. A no-op when today's
    /// session already exists.
    pub fn run_morning_selection(&self, now: DateTime<Utc>) -> MorningOutcome {
        let today = now.date_naive();
        let existing = match self.load_state() {
            Ok(existing) => existing,
            Err(err) => {
                // Never rebuild over a session that could not be read.
                warn!(error = %err, "state load failed, skipping morning selection");
                return MorningOutcome::StateUnavailable;
            }
        };
        if existing.is_some_and(|session| session.is_active_for(today)) {
            info!(%today, "morning selection already done today");
            return MorningOutcome::AlreadySelected;
        }

        let raws = self.fetch_or_empty("day", self.provider.fetch_day(today));
        let mut fixtures = merge_fixtures(self.normalizer.normalize_all(&raws, now));
        if self.config.major_competitions_only {
            fixtures = major_only(fixtures, self.config);
        }
        let Some(picks) = select(&fixtures, self.config) else {
            info!(%today, "no fixtures today, skipping session");
            return MorningOutcome::NoFixtures;
        };

        let matches: Vec<Match> = picks
            .iter()
            .enumerate()
            .map(|(i, fixture)| {
                Match::from_fixture(fixture, i as u32 + 1, self.policy.predict(fixture))
            })
            .collect();
        let session = DailySession::new(today, matches);
        for m in &session.matches {
            info!(
                match_number = m.match_number,
                match_id = %m.match_id,
                tip = m.predicted_outcome.as_str(),
                "selected {} vs {}",
                m.home,
                m.away
            );
        }

        self.persist(&session);
        if let Err(err) = self.notifier.send(&messages::digest(&session)) {
            warn!(error = %err, "digest not sent");
        }
        MorningOutcome::Selected {
            matches: session.matches.len(),
        }
    }

    /// Advances every tracked match once against the current clock and feed.
    pub fn run_check_poll(&self, now: DateTime<Utc>) -> CheckOutcome {
        let Some(mut session) = self.load_session() else {
            return CheckOutcome::NoSession;
        };
        if session.matches.is_empty() {
            return CheckOutcome::NoSession;
        }
        if session.day_summary_sent && session.matches.iter().all(|m| m.ft_sent) {
            debug!(date = %session.date, "day complete");
            return CheckOutcome::DayComplete;
        }

        let feed = self.fetch_feed(&session, now);
        let mut report = CheckReport::default();
        for idx in 0..session.matches.len() {
            self.advance_match(&mut session, idx, &feed, now, &mut report);
            self.send_summary_if_due(&mut session, &mut report);
        }
        info!(
            transitions = report.transitions,
            sent = report.messages_sent,
            failed = report.send_failures,
            "check poll done"
        );
        CheckOutcome::Polled(report)
    }

    fn advance_match(
        &self,
        session: &mut DailySession,
        idx: usize,
        feed: &LiveFeed,
        now: DateTime<Utc>,
        report: &mut CheckReport,
    ) {
        let total = session.matches.len();
        let looked_up: Option<Fixture>;
        let events = {
            let m = &session.matches[idx];
            if m.ft_sent {
                return;
            }
            let observation = match feed.find(&m.match_id) {
                Some(fixture) => Observation::Seen(fixture),
                None if now < m.kickoff_utc => Observation::Unavailable,
                None => {
                    looked_up = self.look_up(m, now);
                    match (&looked_up, feed.answered) {
                        (Some(fixture), _) => Observation::Seen(fixture),
                        (None, true) => Observation::Absent,
                        (None, false) => Observation::Unavailable,
                    }
                }
            };
            due_events(m, observation, now, self.config)
        };

        for event in events {
            let m = &session.matches[idx];
            if event.stage().is_done(m) {
                continue;
            }
            if event.sends_message() {
                let text = self.render(m, &event, total);
                if let Err(err) = self.notifier.send(&text) {
                    warn!(
                        match_id = %m.match_id,
                        stage = ?event.stage(),
                        error = %err,
                        "send failed, stage stays open"
                    );
                    report.send_failures += 1;
                    continue;
                }
                report.messages_sent += 1;
            }
            let m = &mut session.matches[idx];
            apply_event(m, &event);
            info!(match_id = %m.match_id, stage = ?event.stage(), "stage done");
            report.transitions += 1;
            self.persist(session);
        }
    }

    // Per-fixture lookup for a started match missing from the bulk feed.
    // A failure here only affects this match.
    fn look_up(&self, m: &Match, now: DateTime<Utc>) -> Option<Fixture> {
        match self.provider.fetch_fixture(&m.match_id) {
            Ok(Some(raw)) => match self.normalizer.normalize(&raw, now) {
                Ok(fixture) if fixture.id == m.match_id => Some(fixture),
                Ok(_) => None,
                Err(err) => {
                    warn!(match_id = %m.match_id, error = %err, "lookup record unusable");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(match_id = %m.match_id, error = %err, "fixture lookup failed");
                None
            }
        }
    }

    fn send_summary_if_due(&self, session: &mut DailySession, report: &mut CheckReport) {
        let Some(summary) = day_summary_due(session) else {
            return;
        };
        if let Err(err) = self.notifier.send(&messages::day_summary(&summary)) {
            warn!(error = %err, "day summary not sent");
            report.send_failures += 1;
            return;
        }
        session.day_summary_sent = true;
        report.messages_sent += 1;
        report.summary_sent = true;
        info!(
            passed = summary.passed,
            failed = summary.failed,
            "day summary sent"
        );
        self.persist(session);
    }

    fn render(&self, m: &Match, event: &StageEvent, total: usize) -> String {
        match *event {
            StageEvent::Alert => messages::alert(m, self.config.display_offset_minutes),
            StageEvent::PreMatch => messages::pre_match(m, total),
            StageEvent::HalfTime {
                verdict,
                home_goals,
                away_goals,
            } => messages::halftime(m, total, verdict, home_goals, away_goals),
            StageEvent::FullTime {
                home_goals,
                away_goals,
            } => {
                let success = grader::grade(m, home_goals, away_goals);
                messages::full_time(m, total, home_goals, away_goals, success)
            }
            StageEvent::FullTimeTimedOut => messages::full_time_unknown(m, total),
        }
    }

    fn fetch_feed(&self, session: &DailySession, now: DateTime<Utc>) -> LiveFeed {
        let day = self.provider.fetch_day(session.date);
        let live = self.provider.fetch_live();
        let answered = day.is_ok() || live.is_ok();

        // Day listing first so the live records win on status and score.
        let mut raws = self.fetch_or_empty("day", day);
        raws.extend(self.fetch_or_empty("live", live));
        let fixtures = merge_fixtures(self.normalizer.normalize_all(&raws, now));
        debug!(count = fixtures.len(), answered, "live feed");
        LiveFeed { fixtures, answered }
    }

    fn fetch_or_empty(
        &self,
        label: &str,
        result: Result<Vec<Value>, UpstreamFetchError>,
    ) -> Vec<Value> {
        match result {
            Ok(raws) => raws,
            Err(err) => {
                warn!(query = label, error = %err, "upstream fetch failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// `Ok(None)` for nothing stored or an unreadable blob; `Err` when the
    /// store itself failed.
    fn load_state(&self) -> Result<Option<DailySession>, StateStoreError> {
        Ok(self
            .store
            .load()?
            .and_then(|raw| DailySession::from_json(&raw)))
    }

    fn load_session(&self) -> Option<DailySession> {
        match self.load_state() {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "state load failed, treating as no session");
                None
            }
        }
    }

    fn persist(&self, session: &DailySession) {
        let json = match session.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "state serialize failed");
                return;
            }
        };
        if let Err(err) = self.store.save(&json) {
            warn!(error = %err, "state save failed, will retry next run");
        }
    }
}
