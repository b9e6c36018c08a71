mod common;

use chrono::Duration;

use matchday::config::TrackerConfig;
use matchday::fixture::{Fixture, FixtureStatus};
use matchday::lifecycle::{
    HalfTimeVerdict, Observation, Stage, StageEvent, apply_event, due_events,
};
use matchday::prediction::Outcome;
use matchday::session::Match;

use common::{at, fixture, tracked};

fn observed(m: &Match, status: FixtureStatus, score: (u32, u32), elapsed: Option<u32>) -> Fixture {
    let mut f = fixture(&m.match_id, 2, &m.home, &m.away);
    f.kickoff_utc = m.kickoff_utc;
    f.status = status;
    f.home_goals = score.0;
    f.away_goals = score.1;
    f.elapsed_minutes = elapsed;
    f
}

fn apply_all(m: &mut Match, events: &[StageEvent]) {
    for event in events {
        apply_event(m, event);
    }
}

#[test]
fn alert_and_pre_match_windows_are_inclusive() {
    let cfg = TrackerConfig::default();
    let m = tracked("1", 1, at(20, 0), Outcome::Home);

    assert!(due_events(&m, Observation::Unavailable, at(18, 0), &cfg).is_empty());
    assert_eq!(
        due_events(&m, Observation::Unavailable, at(18, 30), &cfg),
        vec![StageEvent::Alert]
    );
    assert_eq!(
        due_events(&m, Observation::Unavailable, at(19, 0), &cfg),
        vec![StageEvent::Alert]
    );
    assert!(due_events(&m, Observation::Unavailable, at(19, 1), &cfg).is_empty());
    assert_eq!(
        due_events(&m, Observation::Unavailable, at(19, 25), &cfg),
        vec![StageEvent::PreMatch]
    );
    assert_eq!(
        due_events(&m, Observation::Unavailable, at(20, 0), &cfg),
        vec![StageEvent::PreMatch]
    );
    assert!(due_events(&m, Observation::Unavailable, at(20, 1), &cfg).is_empty());
}

#[test]
fn missed_alert_window_is_not_retried_later() {
    let cfg = TrackerConfig::default();
    let mut m = tracked("1", 1, at(20, 0), Outcome::Home);
    let events = due_events(&m, Observation::Unavailable, at(19, 40), &cfg);
    assert_eq!(events, vec![StageEvent::PreMatch]);
    apply_all(&mut m, &events);
    assert!(!m.alerted);
    assert!(m.pre_sent);
}

#[test]
fn trailing_by_two_at_half_time_is_suppressed_but_evaluated() {
    let cfg = TrackerConfig::default();
    let mut m = tracked("1", 1, at(20, 0), Outcome::Home);
    m.alerted = true;
    m.pre_sent = true;
    let f = observed(&m, FixtureStatus::Halftime, (0, 2), Some(45));

    let events = due_events(&m, Observation::Seen(&f), at(20, 47), &cfg);
    assert_eq!(
        events,
        vec![StageEvent::HalfTime {
            verdict: HalfTimeVerdict::Suppressed,
            home_goals: 0,
            away_goals: 2,
        }]
    );
    assert!(!events[0].sends_message());

    apply_all(&mut m, &events);
    assert!(m.ht_sent);
    assert!(!m.ht_draw_advised);
    assert!(due_events(&m, Observation::Seen(&f), at(20, 52), &cfg).is_empty());
}

#[test]
fn half_time_verdicts_follow_the_tip() {
    let cfg = TrackerConfig::default();
    let m = tracked("1", 1, at(20, 0), Outcome::Away);
    let cases = [
        ((0, 1), HalfTimeVerdict::Winning),
        ((0, 0), HalfTimeVerdict::Hedge),
        ((1, 0), HalfTimeVerdict::Trailing),
        ((3, 1), HalfTimeVerdict::Suppressed),
    ];
    for (score, expected) in cases {
        let f = observed(&m, FixtureStatus::Halftime, score, None);
        let events = due_events(&m, Observation::Seen(&f), at(20, 48), &cfg);
        match events.as_slice() {
            [StageEvent::HalfTime { verdict, .. }] => assert_eq!(*verdict, expected, "{score:?}"),
            other => panic!("unexpected events {other:?} for {score:?}"),
        }
    }
}

#[test]
fn draw_hedge_goes_out_once_across_polls() {
    let cfg = TrackerConfig::default();
    let mut m = tracked("1", 1, at(20, 0), Outcome::Draw);
    m.alerted = true;
    m.pre_sent = true;
    let f = observed(&m, FixtureStatus::Halftime, (1, 1), Some(45));

    let first = due_events(&m, Observation::Seen(&f), at(20, 46), &cfg);
    assert!(matches!(
        first.as_slice(),
        [StageEvent::HalfTime {
            verdict: HalfTimeVerdict::Hedge,
            ..
        }]
    ));
    apply_all(&mut m, &first);
    assert!(m.ht_sent && m.ht_draw_advised);

    let second = due_events(&m, Observation::Seen(&f), at(20, 51), &cfg);
    assert!(second.is_empty());
}

#[test]
fn hedge_already_advised_is_not_repeated() {
    let cfg = TrackerConfig::default();
    let mut m = tracked("1", 1, at(20, 0), Outcome::Home);
    m.ht_draw_advised = true;
    let f = observed(&m, FixtureStatus::Halftime, (0, 0), None);
    let events = due_events(&m, Observation::Seen(&f), at(20, 50), &cfg);
    assert!(matches!(
        events.as_slice(),
        [StageEvent::HalfTime {
            verdict: HalfTimeVerdict::Suppressed,
            ..
        }]
    ));
}

#[test]
fn live_clock_in_window_stands_in_for_half_time() {
    let cfg = TrackerConfig::default();
    let m = tracked("1", 1, at(20, 0), Outcome::Home);

    for (elapsed, due) in [(44, false), (45, true), (50, true), (55, true), (56, false)] {
        let f = observed(&m, FixtureStatus::Live, (1, 0), Some(elapsed));
        let events = due_events(&m, Observation::Seen(&f), at(20, 50), &cfg);
        let has_ht = events.iter().any(|e| e.stage() == Stage::HalfTime);
        assert_eq!(has_ht, due, "elapsed {elapsed}");
    }

    let no_clock = observed(&m, FixtureStatus::Live, (1, 0), None);
    assert!(due_events(&m, Observation::Seen(&no_clock), at(20, 50), &cfg).is_empty());
}

#[test]
fn finished_status_grades_the_match() {
    let cfg = TrackerConfig::default();
    let mut m = tracked("1", 1, at(20, 0), Outcome::Home);
    m.alerted = true;
    m.pre_sent = true;
    m.ht_sent = true;
    let f = observed(&m, FixtureStatus::Finished, (2, 1), None);

    let events = due_events(&m, Observation::Seen(&f), at(21, 55), &cfg);
    assert_eq!(
        events,
        vec![StageEvent::FullTime {
            home_goals: 2,
            away_goals: 1
        }]
    );
    apply_all(&mut m, &events);
    assert!(m.ft_sent);
    assert_eq!(m.success, Some(true));

    // Closed: nothing more, whatever upstream says.
    assert!(due_events(&m, Observation::Seen(&f), at(22, 0), &cfg).is_empty());
    assert!(due_events(&m, Observation::Absent, at(23, 59), &cfg).is_empty());
}

#[test]
fn finished_without_half_time_seen_skips_half_time() {
    let cfg = TrackerConfig::default();
    let mut m = tracked("1", 1, at(20, 0), Outcome::Away);
    let f = observed(&m, FixtureStatus::Finished, (2, 2), None);
    let events = due_events(&m, Observation::Seen(&f), at(22, 0), &cfg);
    apply_all(&mut m, &events);
    assert!(m.ft_sent);
    assert!(!m.ht_sent);
    assert_eq!(m.success, Some(false));
}

#[test]
fn vanished_fixture_times_out_without_result() {
    let cfg = TrackerConfig::default();
    let mut m = tracked("1", 1, at(20, 0), Outcome::Home);
    m.alerted = true;
    m.pre_sent = true;
    let deadline = at(20, 0) + cfg.finished_timeout;

    assert!(due_events(&m, Observation::Absent, deadline, &cfg).is_empty());

    let late = deadline + Duration::minutes(1);
    let events = due_events(&m, Observation::Absent, late, &cfg);
    assert_eq!(events, vec![StageEvent::FullTimeTimedOut]);
    apply_all(&mut m, &events);
    assert!(m.ft_sent);
    assert_eq!(m.success, None);
}

#[test]
fn outage_never_times_out_a_match() {
    let cfg = TrackerConfig::default();
    let m = tracked("1", 1, at(20, 0), Outcome::Home);
    let much_later = at(23, 59);
    assert!(due_events(&m, Observation::Unavailable, much_later, &cfg).is_empty());
}

#[test]
fn stale_scheduled_status_times_out() {
    let cfg = TrackerConfig::default();
    let m = tracked("1", 1, at(20, 0), Outcome::Home);
    let f = observed(&m, FixtureStatus::Scheduled, (0, 0), None);
    assert!(due_events(&m, Observation::Seen(&f), at(21, 0), &cfg).is_empty());
    assert_eq!(
        due_events(&m, Observation::Seen(&f), at(23, 0), &cfg),
        vec![StageEvent::FullTimeTimedOut]
    );
}

#[test]
fn suspended_match_stays_open_and_is_graded_when_it_resumes() {
    let cfg = TrackerConfig::default();
    let mut m = tracked("1", 1, at(20, 0), Outcome::Home);
    m.alerted = true;
    m.pre_sent = true;
    m.ht_sent = true;

    let suspended = observed(&m, FixtureStatus::Unknown, (1, 0), None);
    for hour in [21, 22, 23] {
        assert!(
            due_events(&m, Observation::Seen(&suspended), at(hour, 30), &cfg).is_empty(),
            "closed at {hour}:30"
        );
    }

    let resumed = observed(&m, FixtureStatus::Finished, (2, 0), None);
    let events = due_events(&m, Observation::Seen(&resumed), at(23, 45), &cfg);
    apply_all(&mut m, &events);
    assert!(m.ft_sent);
    assert_eq!(m.success, Some(true));
}

#[derive(Clone, Copy)]
struct Flags {
    alerted: bool,
    pre_sent: bool,
    ht_sent: bool,
    ht_draw_advised: bool,
    ft_sent: bool,
}

impl Flags {
    fn of(m: &Match) -> Self {
        Self {
            alerted: m.alerted,
            pre_sent: m.pre_sent,
            ht_sent: m.ht_sent,
            ht_draw_advised: m.ht_draw_advised,
            ft_sent: m.ft_sent,
        }
    }

    fn as_array(self) -> [bool; 5] {
        [
            self.alerted,
            self.pre_sent,
            self.ht_sent,
            self.ht_draw_advised,
            self.ft_sent,
        ]
    }
}

// Scripted feed for a 20:00 kickoff, one snapshot per minute.
fn feed_at(m: &Match, minute_of_day: i64) -> Fixture {
    let kickoff = 20 * 60;
    let played = minute_of_day - kickoff;
    match played {
        p if p < 0 => observed(m, FixtureStatus::Scheduled, (0, 0), None),
        p if p <= 45 => observed(m, FixtureStatus::Live, (0, 0), Some(p as u32)),
        p if p <= 60 => observed(m, FixtureStatus::Halftime, (1, 1), Some(45)),
        p if p <= 110 => observed(m, FixtureStatus::Live, (1, 1), Some((p - 15) as u32)),
        _ => observed(m, FixtureStatus::Finished, (1, 1), None),
    }
}

#[test]
fn every_flag_flips_at_most_once_over_a_match_day() {
    let cfg = TrackerConfig::default();
    for tip in [Outcome::Home, Outcome::Draw, Outcome::Away] {
        let mut m = tracked("1", 1, at(20, 0), tip);
        let mut flips = [0usize; 5];
        let mut prev = Flags::of(&m).as_array();

        for minute in (16 * 60)..(23 * 60 + 59) {
            let now = at((minute / 60) as u32, (minute % 60) as u32);
            let f = feed_at(&m, minute);
            let events = due_events(&m, Observation::Seen(&f), now, &cfg);
            for event in &events {
                assert!(!event.stage().is_done(&m), "{event:?} due twice");
            }
            apply_all(&mut m, &events);

            let cur = Flags::of(&m).as_array();
            for i in 0..5 {
                assert!(!(prev[i] && !cur[i]), "flag {i} reset at minute {minute}");
                if !prev[i] && cur[i] {
                    flips[i] += 1;
                }
            }
            prev = cur;
        }

        assert_eq!(flips[0], 1, "alert");
        assert_eq!(flips[1], 1, "pre-match");
        assert_eq!(flips[2], 1, "half-time");
        assert_eq!(flips[4], 1, "full-time");
        assert!(flips[3] <= 1);
        // Level when the clock hits 45 is a hedge for every tip; a level final then counts.
        assert!(m.ht_draw_advised);
        assert_eq!(m.success, Some(true));
    }
}
