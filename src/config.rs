use serde::{Deserialize, Serialize};

/// FSRS-style weight vector plus interval policy for the forgetting
/// curve scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// w0-w3 initial stability per rating, w4-w16 update shape.
    pub w: [f64; 17],
    pub target_retention: f64,
    pub min_interval_days: f64,
    pub max_interval_days: f64,
    pub min_stability: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            w: [
                0.4, 0.6, 2.4, 5.8, // w0-w3: initial stability
                4.93, 0.94, 0.86, 0.01, 1.49, // w4-w8
                0.14, 0.94, 2.18, 0.05, 0.34, // w9-w13
                1.26, 0.29, 2.61, // w14-w16
            ],
            target_retention: 0.9,
            min_interval_days: 1.0,
            max_interval_days: 365.0,
            min_stability: 0.1,
        }
    }
}

/// Latency cutoffs for the correctness+latency -> rating mapping.
/// Heuristic thresholds, deliberately configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConfig {
    pub fast_ratio: f64,
    pub normal_ratio: f64,
    pub slow_ratio: f64,
    pub default_expected_ms: i64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            fast_ratio: 0.8,
            normal_ratio: 1.2,
            slow_ratio: 1.5,
            default_expected_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityConfig {
    pub max_iterations: u32,
    pub convergence_tol: f64,
    pub theta_bound: f64,
    pub quadrature_points: usize,
    pub prior_mean: f64,
    pub prior_sd: f64,
    pub se_floor: f64,
    pub default_se: f64,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            convergence_tol: 1e-4,
            theta_bound: 3.0,
            quadrature_points: 16,
            prior_mean: 0.0,
            prior_sd: 1.0,
            se_floor: 0.15,
            default_se: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub min_respondents: usize,
    pub min_items: usize,
    pub min_responses_per_item: usize,
    pub max_iterations: u32,
    pub inner_iterations: u32,
    pub convergence_tol: f64,
    /// Parameters with a standard error above this are flagged untrustworthy.
    pub se_quality_threshold: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_respondents: 10,
            min_items: 10,
            min_responses_per_item: 10,
            max_iterations: 20,
            inner_iterations: 10,
            convergence_tol: 1e-3,
            se_quality_threshold: 0.5,
        }
    }
}

/// Weights for the three-factor intrinsic value score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreWeights {
    pub frequency: f64,
    pub relational_density: f64,
    pub contextual_contribution: f64,
}

impl FreWeights {
    pub fn beginner() -> Self {
        Self {
            frequency: 0.5,
            relational_density: 0.3,
            contextual_contribution: 0.2,
        }
    }

    pub fn advanced() -> Self {
        Self {
            frequency: 0.3,
            relational_density: 0.3,
            contextual_contribution: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    pub beginner_weights: FreWeights,
    pub advanced_weights: FreWeights,
    pub prerequisite_penalty: f64,
    /// A component counts as automated above this mastery share.
    pub automation_threshold: f64,
    pub new_item_urgency: f64,
    pub overdue_base: f64,
    pub urgency_bonus_scale: f64,
    pub min_cost_denominator: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            beginner_weights: FreWeights::beginner(),
            advanced_weights: FreWeights::advanced(),
            prerequisite_penalty: 0.5,
            automation_threshold: 0.6,
            new_item_urgency: 0.5,
            overdue_base: 1.0,
            urgency_bonus_scale: 1.0,
            min_cost_denominator: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleneckConfig {
    /// Trailing window of responses considered by one analysis pass.
    pub window_size: usize,
    pub error_rate_threshold: f64,
    pub min_responses_per_type: usize,
    /// Error rate above which a component counts as elevated for the
    /// cascade walk (lower than the flagging threshold).
    pub cascade_elevation_threshold: f64,
    /// Urgency boost applied to items of a detected root-cause component.
    pub root_cause_boost: f64,
}

impl Default for BottleneckConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            error_rate_threshold: 0.3,
            min_responses_per_type: 5,
            cascade_elevation_threshold: 0.25,
            root_cause_boost: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatigueParams {
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub k: f64,
    pub long_break_threshold: f64,
}

impl Default for FatigueParams {
    fn default() -> Self {
        Self {
            beta: 0.3,
            gamma: 0.3,
            delta: 0.2,
            k: 0.05,
            long_break_threshold: 30.0,
        }
    }
}

/// Scoring and ordering knobs for the session composer. The per-call
/// budget (max items, load ceiling) travels in `SessionConfig` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTuning {
    pub fsrs_weight: f64,
    pub priority_weight: f64,
    pub load_weight: f64,
    /// Below this urgency an item is not worth repeating yet.
    pub min_urgency: f64,
    /// A break is recommended once cumulative load since the last break
    /// exceeds this multiple of the per-item ceiling.
    pub break_load_factor: f64,
    pub high_fatigue_threshold: f64,
    pub same_type_repeat_penalty: f64,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            fsrs_weight: 0.4,
            priority_weight: 0.4,
            load_weight: 0.2,
            min_urgency: 0.05,
            break_load_factor: 3.0,
            high_fatigue_threshold: 0.7,
            same_type_repeat_penalty: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    pub memory: MemoryConfig,
    pub rating: RatingConfig,
    pub ability: AbilityConfig,
    pub calibration: CalibrationConfig,
    pub priority: PriorityConfig,
    pub bottleneck: BottleneckConfig,
    pub fatigue: FatigueParams,
    pub session: SessionTuning,
    pub cache: CacheConfig,
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GLOSSA_TARGET_RETENTION") {
            if let Ok(parsed) = val.parse::<f64>() {
                config.memory.target_retention = parsed.clamp(0.5, 0.99);
            }
        }
        if let Ok(val) = std::env::var("GLOSSA_MAX_INTERVAL_DAYS") {
            if let Ok(parsed) = val.parse::<f64>() {
                config.memory.max_interval_days = parsed.max(1.0);
            }
        }
        if let Ok(val) = std::env::var("GLOSSA_CACHE_CAPACITY") {
            if let Ok(parsed) = val.parse::<usize>() {
                config.cache.capacity = parsed;
            }
        }

        config
    }
}
