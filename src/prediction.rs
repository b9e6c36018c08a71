use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::fixture::Fixture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "away",
        }
    }
}

/// Picks the outcome a match is tipped for. Called once per match, at selection.
pub trait PredictionPolicy {
    fn predict(&self, fixture: &Fixture) -> Outcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Random,
    ShotCount,
    InPlay,
}

impl PolicyKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "random" => Some(Self::Random),
            "shots" | "shot-count" => Some(Self::ShotCount),
            "in-play" | "inplay" | "live" => Some(Self::InPlay),
            _ => None,
        }
    }

    pub fn build(self) -> Box<dyn PredictionPolicy> {
        match self {
            PolicyKind::Random => Box::new(RandomPolicy::default()),
            PolicyKind::ShotCount => Box::new(ShotCountPolicy::default()),
            PolicyKind::InPlay => Box::new(InPlayPolicy::default()),
        }
    }
}

/// Weighted draw over home/draw/away.
#[derive(Debug)]
pub struct RandomPolicy {
    weights: [u32; 3],
    rng: Mutex<StdRng>,
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::with_weights([45, 25, 30], StdRng::from_entropy())
    }
}

impl RandomPolicy {
    pub fn uniform() -> Self {
        Self::with_weights([1, 1, 1], StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_weights([45, 25, 30], StdRng::seed_from_u64(seed))
    }

    pub fn with_weights(weights: [u32; 3], rng: StdRng) -> Self {
        Self {
            weights,
            rng: Mutex::new(rng),
        }
    }

    fn draw(&self, weights: [u32; 3]) -> Outcome {
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return Outcome::Draw;
        }
        let roll = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..total),
            Err(poisoned) => poisoned.into_inner().gen_range(0..total),
        };
        if roll < weights[0] {
            Outcome::Home
        } else if roll < weights[0] + weights[1] {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }
}

impl PredictionPolicy for RandomPolicy {
    fn predict(&self, _fixture: &Fixture) -> Outcome {
        self.draw(self.weights)
    }
}

/// Shots-on-target heuristic; falls back to the random policy when the
/// fixture carries no statistics (the usual case before kickoff).
#[derive(Debug, Default)]
pub struct ShotCountPolicy {
    fallback: RandomPolicy,
}

impl ShotCountPolicy {
    pub fn new(fallback: RandomPolicy) -> Self {
        Self { fallback }
    }
}

impl PredictionPolicy for ShotCountPolicy {
    fn predict(&self, fixture: &Fixture) -> Outcome {
        let Some((home, away)) = fixture.extras.shots_on_target else {
            return self.fallback.predict(fixture);
        };
        if home.abs_diff(away) <= 1 {
            Outcome::Draw
        } else if home > away {
            Outcome::Home
        } else {
            Outcome::Away
        }
    }
}

/// Half-time score and red card heuristic for fixtures already in play.
#[derive(Debug)]
pub struct InPlayPolicy {
    random: RandomPolicy,
}

impl Default for InPlayPolicy {
    fn default() -> Self {
        Self {
            random: RandomPolicy::uniform(),
        }
    }
}

impl InPlayPolicy {
    pub fn new(random: RandomPolicy) -> Self {
        Self { random }
    }
}

impl PredictionPolicy for InPlayPolicy {
    fn predict(&self, fixture: &Fixture) -> Outcome {
        let (red_home, red_away) = fixture.extras.red_cards.unwrap_or((0, 0));
        if red_home > red_away {
            return self.random.draw([0, 30, 70]);
        }
        if red_away > red_home {
            return self.random.draw([70, 30, 0]);
        }

        let (ht_home, ht_away) = fixture.extras.halftime_score.unwrap_or((0, 0));
        let lead = i64::from(ht_home) - i64::from(ht_away);
        match lead {
            1 => self.random.draw([70, 30, 0]),
            -1 => self.random.draw([0, 30, 70]),
            l if l >= 2 => self.random.draw([85, 15, 0]),
            l if l <= -2 => self.random.draw([0, 15, 85]),
            _ => self.random.draw([1, 1, 1]),
        }
    }
}
