//! Session fatigue estimation from the response stream: error-rate
//! trend, response-time inflation and repeated errors accumulate, an
//! exponential decay bleeds the level off, and a long break resets it.
//!
//! Pure update form: `(state, features) -> state`, so prior state can
//! be read concurrently while an update is computed.

use serde::{Deserialize, Serialize};

use crate::config::FatigueParams;
use crate::types::{Estimate, ResponseEvent};

const MIN_TREND_SAMPLES: usize = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FatigueState {
    pub value: f64,
    pub updates: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FatigueFeatures {
    /// Positive when the recent error rate is rising.
    pub error_rate_trend: f64,
    /// Positive when response times are inflating.
    pub rt_increase_rate: f64,
    pub repeat_errors: u32,
    pub break_minutes: Option<f64>,
}

pub fn update_fatigue(
    state: FatigueState,
    features: &FatigueFeatures,
    params: &FatigueParams,
) -> FatigueState {
    if let Some(break_min) = features.break_minutes {
        if break_min >= params.long_break_threshold {
            return FatigueState {
                value: 0.0,
                updates: state.updates + 1,
            };
        }
    }

    let error_component = params.beta * features.error_rate_trend.max(0.0);
    let rt_component = params.gamma * features.rt_increase_rate.max(0.0);
    let repeat_component = params.delta * (features.repeat_errors as f64 / 5.0).min(1.0);

    let delta_fatigue = error_component + rt_component + repeat_component;
    let decay = (-params.k).exp();

    FatigueState {
        value: (state.value * decay + delta_fatigue).clamp(0.0, 1.0),
        updates: state.updates + 1,
    }
}

/// Passive decay between sessions.
pub fn decay_fatigue(state: FatigueState, elapsed_minutes: f64, params: &FatigueParams) -> FatigueState {
    let decay_factor = (-params.k * elapsed_minutes.max(0.0) / 10.0).exp();
    FatigueState {
        value: (state.value * decay_factor).clamp(0.0, 1.0),
        updates: state.updates,
    }
}

/// Derives fatigue features from a chronological response window by
/// comparing its early and late halves. Declines when the window is
/// too short to read a trend.
pub fn features_from_responses(responses: &[ResponseEvent]) -> Estimate<FatigueFeatures> {
    if responses.len() < MIN_TREND_SAMPLES {
        return Estimate::insufficient(format!(
            "need {MIN_TREND_SAMPLES} responses for a trend, have {}",
            responses.len()
        ));
    }

    let (early, late) = responses.split_at(responses.len() / 2);
    let error_rate = |slice: &[ResponseEvent]| {
        slice.iter().filter(|r| !r.is_correct).count() as f64 / slice.len() as f64
    };
    let mean_rt = |slice: &[ResponseEvent]| {
        slice.iter().map(|r| r.response_time_ms.max(0) as f64).sum::<f64>() / slice.len() as f64
    };

    let error_rate_trend = error_rate(late) - error_rate(early);
    let rt_early = mean_rt(early).max(1.0);
    let rt_increase_rate = (mean_rt(late) - rt_early) / rt_early;

    let mut repeat_errors = 0u32;
    let mut run = 0u32;
    for response in late {
        if response.is_correct {
            run = 0;
        } else {
            run += 1;
            if run >= 2 {
                repeat_errors += 1;
            }
        }
    }

    Estimate::Computed(FatigueFeatures {
        error_rate_trend,
        rt_increase_rate,
        repeat_errors,
        break_minutes: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FatigueParams {
        FatigueParams::default()
    }

    #[test]
    fn test_errors_accumulate_fatigue() {
        let mut state = FatigueState::default();
        let features = FatigueFeatures {
            error_rate_trend: 0.5,
            rt_increase_rate: 0.3,
            repeat_errors: 2,
            break_minutes: None,
        };
        for _ in 0..5 {
            state = update_fatigue(state, &features, &params());
        }
        assert!(state.value > 0.3);
        assert!(state.value <= 1.0);
        assert_eq!(state.updates, 5);
    }

    #[test]
    fn test_long_break_resets() {
        let state = FatigueState {
            value: 0.8,
            updates: 10,
        };
        let features = FatigueFeatures {
            break_minutes: Some(45.0),
            ..FatigueFeatures::default()
        };
        let after = update_fatigue(state, &features, &params());
        assert_eq!(after.value, 0.0);
    }

    #[test]
    fn test_short_break_does_not_reset() {
        let state = FatigueState {
            value: 0.8,
            updates: 10,
        };
        let features = FatigueFeatures {
            break_minutes: Some(5.0),
            ..FatigueFeatures::default()
        };
        let after = update_fatigue(state, &features, &params());
        assert!(after.value > 0.5);
    }

    #[test]
    fn test_update_is_pure() {
        let state = FatigueState {
            value: 0.4,
            updates: 3,
        };
        let features = FatigueFeatures::default();
        let _ = update_fatigue(state, &features, &params());
        assert_eq!(state.value, 0.4);
    }

    #[test]
    fn test_passive_decay_reduces_value() {
        let state = FatigueState {
            value: 0.6,
            updates: 1,
        };
        let after = decay_fatigue(state, 20.0, &params());
        assert!(after.value < state.value);
    }

    #[test]
    fn test_features_decline_on_short_window() {
        use crate::types::ComponentType;
        use chrono::Utc;

        let responses: Vec<ResponseEvent> = (0..3)
            .map(|i| {
                ResponseEvent::new(format!("r{i}"), ComponentType::Lexis, true, 3000, Utc::now())
            })
            .collect();
        assert!(!features_from_responses(&responses).is_computed());
    }

    #[test]
    fn test_features_read_worsening_trend() {
        use crate::types::ComponentType;
        use chrono::Utc;

        let now = Utc::now();
        let mut responses = Vec::new();
        // Early half: quick and correct. Late half: slow with repeated
        // errors.
        for i in 0..5 {
            responses.push(ResponseEvent::new(
                format!("e{i}"),
                ComponentType::Lexis,
                true,
                2000,
                now,
            ));
        }
        for i in 0..5 {
            responses.push(ResponseEvent::new(
                format!("l{i}"),
                ComponentType::Lexis,
                i == 0,
                6000,
                now,
            ));
        }

        let features = features_from_responses(&responses)
            .computed()
            .expect("enough samples");
        assert!(features.error_rate_trend > 0.5);
        assert!(features.rt_increase_rate > 1.0);
        assert!(features.repeat_errors >= 1);
    }
}
