//! FSRS-style spaced-repetition scheduler over an exponential
//! forgetting curve: R(t) = exp(-t / S).
//!
//! The weight vector w0-w16 keeps the FSRS layout: w0-w3 initial
//! stability per rating, w4-w5 initial difficulty, w6-w7 difficulty
//! drift and mean reversion, w8-w10 recall stability growth, w11-w14
//! post-lapse stability, w15-w16 hard penalty / easy bonus.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MemoryConfig;
use crate::error::{CoreError, CoreResult};
use crate::types::elapsed_days;

const EPSILON: f64 = 1e-9;
const MASTERY_STABILITY_DAYS: f64 = 21.0;
const MASTERY_MAX_LAPSES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum CardState {
    #[default]
    New,
    Learning,
    Review,
    Relearning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        *self != Self::Again
    }
}

/// Forgetting-curve state of one (learner, item) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryCard {
    pub difficulty: f64,
    pub stability: f64,
    pub retrievability: f64,
    pub last_review: Option<DateTime<Utc>>,
    pub reps: u32,
    pub lapses: u32,
    pub state: CardState,
}

impl Default for MemoryCard {
    fn default() -> Self {
        Self {
            difficulty: 5.0,
            stability: 1.0,
            retrievability: 1.0,
            last_review: None,
            reps: 0,
            lapses: 0,
            state: CardState::New,
        }
    }
}

impl MemoryCard {
    pub fn is_new(&self) -> bool {
        self.reps == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub card: MemoryCard,
    pub next_review: DateTime<Utc>,
    pub interval_days: f64,
    /// Retrievability at the moment the review happened, before the update.
    pub retrievability_before: f64,
}

/// R(t) = exp(-t / S). Equals 1 at t = 0 and is strictly decreasing in t.
pub fn retrievability_at(stability: f64, elapsed: f64) -> f64 {
    if elapsed <= EPSILON {
        return 1.0;
    }
    let s = stability.max(EPSILON);
    (-elapsed / s).exp().clamp(0.0, 1.0)
}

/// Current retrievability of a card. A card that was never reviewed is
/// fully retrievable by definition.
pub fn card_retrievability(card: &MemoryCard, now: DateTime<Utc>) -> f64 {
    match card.last_review {
        Some(last) => retrievability_at(card.stability, elapsed_days(last, now)),
        None => 1.0,
    }
}

/// Inverts the forgetting curve for the configured target retention:
/// the elapsed time at which R(t) drops to the target.
pub fn interval_days(stability: f64, target_retention: f64, config: &MemoryConfig) -> f64 {
    let target = target_retention.clamp(0.01, 0.99);
    let raw = -target.ln() * stability.max(config.min_stability);
    raw.clamp(config.min_interval_days, config.max_interval_days)
}

/// One review step: consumes the prior card value and produces the
/// updated card plus the next review date. Pure; callers persist.
pub fn schedule(
    config: &MemoryConfig,
    card: &MemoryCard,
    rating: Rating,
    now: DateTime<Utc>,
) -> CoreResult<ScheduleResult> {
    if !card.stability.is_finite() || !card.difficulty.is_finite() {
        return Err(CoreError::NonFinite("memory card state"));
    }
    if card.stability < 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "negative stability {}",
            card.stability
        )));
    }

    let w = &config.w;

    if card.is_new() {
        let stability = initial_stability(w, rating).max(config.min_stability);
        let difficulty = initial_difficulty(w, rating);
        let (state, lapses) = if rating == Rating::Again {
            (CardState::Relearning, 1)
        } else if rating == Rating::Hard {
            (CardState::Learning, 0)
        } else {
            (CardState::Review, 0)
        };
        let interval = interval_days(stability, config.target_retention, config);

        return Ok(ScheduleResult {
            card: MemoryCard {
                difficulty,
                stability,
                retrievability: 1.0,
                last_review: Some(now),
                reps: 1,
                lapses,
                state,
            },
            next_review: next_review_date(now, interval),
            interval_days: interval,
            retrievability_before: 1.0,
        });
    }

    let elapsed = card
        .last_review
        .map(|last| elapsed_days(last, now))
        .unwrap_or(0.0);
    let retrievability = retrievability_at(card.stability, elapsed);

    let difficulty = next_difficulty(w, card.difficulty, rating);
    let (stability, lapses, state) = if rating == Rating::Again {
        let s = next_forget_stability(w, card.difficulty, card.stability, retrievability)
            .clamp(config.min_stability, card.stability.max(config.min_stability));
        (s, card.lapses + 1, CardState::Relearning)
    } else {
        let s = next_recall_stability(w, card.difficulty, card.stability, retrievability, rating)
            .max(card.stability);
        (s, card.lapses, CardState::Review)
    };

    let interval = interval_days(stability, config.target_retention, config);

    Ok(ScheduleResult {
        card: MemoryCard {
            difficulty,
            stability,
            retrievability: 1.0,
            last_review: Some(now),
            reps: card.reps + 1,
            lapses,
            state,
        },
        next_review: next_review_date(now, interval),
        interval_days: interval,
        retrievability_before: retrievability,
    })
}

fn next_review_date(now: DateTime<Utc>, interval: f64) -> DateTime<Utc> {
    now + Duration::milliseconds((interval * 86_400_000.0).round() as i64)
}

fn initial_stability(w: &[f64; 17], rating: Rating) -> f64 {
    w[(rating as usize) - 1].max(0.1)
}

fn initial_difficulty(w: &[f64; 17], rating: Rating) -> f64 {
    let d = w[4] - (rating as i32 - 3) as f64 * w[5];
    d.clamp(1.0, 10.0)
}

fn next_difficulty(w: &[f64; 17], d: f64, rating: Rating) -> f64 {
    let delta = -(rating as i32 - 3) as f64;
    let d_new = d + w[6] * delta;
    let d_target = w[4] - 3.0 * w[5];
    let d_mean = w[7] * d_target + (1.0 - w[7]) * d_new;
    d_mean.clamp(1.0, 10.0)
}

fn next_recall_stability(w: &[f64; 17], d: f64, s: f64, r: f64, rating: Rating) -> f64 {
    let hard_penalty = if rating == Rating::Hard { w[15] } else { 1.0 };
    let easy_bonus = if rating == Rating::Easy { w[16] } else { 1.0 };

    let growth = w[8].exp()
        * (11.0 - d)
        * s.powf(-w[9])
        * ((1.0 - r) * w[10]).exp_m1()
        * hard_penalty
        * easy_bonus;
    (s * (1.0 + growth.max(0.0))).max(0.1)
}

fn next_forget_stability(w: &[f64; 17], d: f64, s: f64, r: f64) -> f64 {
    w[11] * d.max(1.0).powf(-w[12]) * ((s + 1.0).powf(w[13]) - 1.0) * (1.0 - r).powf(w[14]).exp()
}

/// Coarse mastery stage 0-4 from stability bands and lapse count.
pub fn mastery_stage(card: &MemoryCard) -> u8 {
    if card.is_new() {
        return 0;
    }
    if card.stability < 2.0 {
        1
    } else if card.stability < 7.0 {
        2
    } else if card.stability < MASTERY_STABILITY_DAYS || card.lapses > MASTERY_MAX_LAPSES {
        3
    } else {
        4
    }
}

/// Long-term mastery for scheduling purposes. Allows up to 2 lapses.
pub fn is_mastered(card: &MemoryCard) -> bool {
    card.stability >= MASTERY_STABILITY_DAYS && card.lapses <= MASTERY_MAX_LAPSES
}
