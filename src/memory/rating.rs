//! Timing-aware rating derivation. Correctness decides pass/fail, the
//! latency ratio against the expected response time grades the pass,
//! and cue usage downgrades it. Cutoffs are heuristic and configurable.

use crate::config::RatingConfig;
use crate::memory::fsrs::Rating;

/// Maps correctness + latency (+ cue usage) to a 1-4 rating.
///
/// Latency zones for a correct answer, by `rt / expected`:
/// below `fast_ratio` -> Easy, up to `normal_ratio` -> Good, up to
/// `slow_ratio` -> Hard. A correct answer slower than `slow_ratio` is
/// treated as a failed retrieval (Again). Each cue level used
/// downgrades the zone by one step.
pub fn derive_rating(
    is_correct: bool,
    response_time_ms: i64,
    cue_level: u8,
    expected_time_ms: Option<i64>,
    config: &RatingConfig,
) -> Rating {
    if !is_correct {
        return Rating::Again;
    }

    let expected = expected_time_ms
        .filter(|&ms| ms > 0)
        .unwrap_or(config.default_expected_ms)
        .max(1);
    let ratio = response_time_ms.max(0) as f64 / expected as f64;

    let zone = if ratio < config.fast_ratio {
        3
    } else if ratio <= config.normal_ratio {
        2
    } else if ratio <= config.slow_ratio {
        1
    } else {
        0
    };

    let downgraded = zone - (cue_level as i32).min(zone);
    match downgraded {
        3 => Rating::Easy,
        2 => Rating::Good,
        1 => Rating::Hard,
        _ => Rating::Again,
    }
}
