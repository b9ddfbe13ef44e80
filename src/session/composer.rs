//! Session composition: score candidates, admit greedily under the
//! cognitive-load budget, order with an interleaving strategy, place
//! breaks, and predict session efficiency.

use serde::{Deserialize, Serialize};

use crate::config::SessionTuning;
use crate::error::{CoreError, CoreResult};
use crate::fatigue::FatigueState;
use crate::priority::engine::QueueItem;
use crate::session::load::sequenced_load;
use crate::session::strategy::{order_candidates, select_strategy, InterleavingStrategy};
use crate::types::{ComponentType, ProficiencyLevel};

/// Per-call session budget, supplied by session execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub max_items: usize,
    /// Per-item cognitive load ceiling; the session budget is
    /// `max_cognitive_load * max_items`.
    pub max_cognitive_load: f64,
    /// Pomodoro-style fixed break cadence, in placed items.
    pub break_interval_items: usize,
    pub target_retention: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            max_cognitive_load: 7.0,
            break_interval_items: 10,
            target_retention: 0.9,
        }
    }
}

impl SessionConfig {
    pub fn budget(&self) -> f64 {
        self.max_cognitive_load * self.max_items as f64
    }

    fn validate(&self) -> CoreResult<()> {
        if self.max_items == 0 {
            return Err(CoreError::InvalidInput("max_items must be positive".into()));
        }
        if !self.max_cognitive_load.is_finite() || self.max_cognitive_load <= 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "max_cognitive_load must be positive, got {}",
                self.max_cognitive_load
            )));
        }
        if !self.target_retention.is_finite()
            || !(0.0..=1.0).contains(&self.target_retention)
        {
            return Err(CoreError::InvalidInput(format!(
                "target_retention out of range: {}",
                self.target_retention
            )));
        }
        Ok(())
    }
}

/// Learner-side inputs for one composition call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerSessionState {
    pub level: ProficiencyLevel,
    pub fatigue: f64,
    pub elapsed_minutes: f64,
}

impl LearnerSessionState {
    pub fn new(level: ProficiencyLevel, fatigue: f64) -> Self {
        Self {
            level,
            fatigue: fatigue.clamp(0.0, 1.0),
            elapsed_minutes: 0.0,
        }
    }

    /// Uses the internally tracked fatigue estimate when the session
    /// surface has no measurement of its own.
    pub fn with_estimated_fatigue(level: ProficiencyLevel, fatigue: &FatigueState) -> Self {
        Self::new(level, fatigue.value)
    }

    /// Raw fatigue plus time-on-task: an hour of continuous work reads
    /// as one extra tenth of fatigue.
    pub fn effective_fatigue(&self) -> f64 {
        (self.fatigue + self.elapsed_minutes.max(0.0) / 60.0 * 0.1).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    CognitiveOverload,
    LowPriority,
    RecentlySeen,
    PrerequisiteNotMet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExclusion {
    pub item_id: String,
    pub reason: ExclusionReason,
}

/// Candidate after the scoring phase. Load already includes the
/// consecutive-same-type penalty relative to the incoming queue order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub item_id: String,
    pub component: ComponentType,
    pub mastery_stage: u8,
    pub fsrs_priority: f64,
    pub cognitive_load: f64,
    pub combined_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItemPlacement {
    pub position: usize,
    pub item_id: String,
    pub component: ComponentType,
    pub cognitive_load: f64,
    pub combined_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionPrediction {
    /// Mean urgency of the placed items.
    pub learning_value: f64,
    pub retention_probability: f64,
    pub cognitive_load_average: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlan {
    pub items: Vec<SessionItemPlacement>,
    /// Positions after which a break is recommended.
    pub break_after: Vec<usize>,
    pub excluded: Vec<SessionExclusion>,
    pub strategy: InterleavingStrategy,
    pub prediction: SessionPrediction,
}

impl SessionPlan {
    pub fn total_load(&self) -> f64 {
        self.items.iter().map(|p| p.cognitive_load).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct SessionComposer {
    tuning: SessionTuning,
}

impl Default for SessionComposer {
    fn default() -> Self {
        Self::new(SessionTuning::default())
    }
}

impl SessionComposer {
    pub fn new(tuning: SessionTuning) -> Self {
        Self { tuning }
    }

    /// Builds one session plan from a ranked queue. An empty queue
    /// yields an empty plan with zero predicted efficiency.
    pub fn compose(
        &self,
        queue: &[QueueItem],
        learner: &LearnerSessionState,
        config: &SessionConfig,
        strategy: Option<InterleavingStrategy>,
    ) -> CoreResult<SessionPlan> {
        config.validate()?;
        if !learner.fatigue.is_finite() || !learner.elapsed_minutes.is_finite() {
            return Err(CoreError::NonFinite("fatigue"));
        }

        let fatigue = learner.effective_fatigue();
        let resolved = select_strategy(strategy, fatigue, learner.level, &self.tuning);
        if queue.is_empty() {
            return Ok(SessionPlan {
                items: Vec::new(),
                break_after: Vec::new(),
                excluded: Vec::new(),
                strategy: resolved,
                prediction: SessionPrediction::default(),
            });
        }

        let scored = self.score(queue);
        let (admitted, excluded) = self.filter(scored, queue, config);
        let ordered = order_candidates(admitted, resolved, fatigue, learner.level, &self.tuning);

        let items: Vec<SessionItemPlacement> = ordered
            .iter()
            .enumerate()
            .map(|(position, c)| SessionItemPlacement {
                position,
                item_id: c.item_id.clone(),
                component: c.component,
                cognitive_load: c.cognitive_load,
                combined_score: c.combined_score,
            })
            .collect();

        let break_after = self.place_breaks(&items, config);
        let prediction = self.predict(&ordered, learner, config);

        Ok(SessionPlan {
            items,
            break_after,
            excluded,
            strategy: resolved,
            prediction,
        })
    }

    /// Scoring phase: sequenced load plus the combined score
    /// `0.4 * fsrs + 0.4 * priority - 0.2 * load/10`, with priority
    /// max-normalized over the candidate set.
    fn score(&self, queue: &[QueueItem]) -> Vec<ScoredCandidate> {
        let max_priority = queue
            .iter()
            .map(|q| q.priority)
            .fold(f64::NEG_INFINITY, f64::max)
            .max(1e-9);

        let mut previous: Option<ComponentType> = None;
        queue
            .iter()
            .map(|q| {
                let load = sequenced_load(
                    q.component,
                    q.mastery_stage,
                    previous,
                    self.tuning.same_type_repeat_penalty,
                );
                previous = Some(q.component);
                let normalized_priority = (q.priority / max_priority).clamp(0.0, 1.0);
                let combined = self.tuning.fsrs_weight * q.fsrs_priority
                    + self.tuning.priority_weight * normalized_priority
                    - self.tuning.load_weight * (load / 10.0);
                ScoredCandidate {
                    item_id: q.item_id.clone(),
                    component: q.component,
                    mastery_stage: q.mastery_stage,
                    fsrs_priority: q.fsrs_priority,
                    cognitive_load: load,
                    combined_score: combined,
                }
            })
            .collect()
    }

    /// Greedy admission by descending combined score under both the
    /// item count and the cumulative load budget, with the exclusion
    /// reason recorded for everything left out.
    fn filter(
        &self,
        mut scored: Vec<ScoredCandidate>,
        queue: &[QueueItem],
        config: &SessionConfig,
    ) -> (Vec<ScoredCandidate>, Vec<SessionExclusion>) {
        scored.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });

        let budget = config.budget();
        let mut admitted = Vec::new();
        let mut excluded = Vec::new();
        let mut cumulative_load = 0.0;

        for candidate in scored {
            let prerequisite_met = queue
                .iter()
                .find(|q| q.item_id == candidate.item_id)
                .map(|q| q.prerequisite_met)
                .unwrap_or(true);

            if !prerequisite_met {
                excluded.push(SessionExclusion {
                    item_id: candidate.item_id,
                    reason: ExclusionReason::PrerequisiteNotMet,
                });
                continue;
            }
            if candidate.fsrs_priority < self.tuning.min_urgency {
                excluded.push(SessionExclusion {
                    item_id: candidate.item_id,
                    reason: ExclusionReason::RecentlySeen,
                });
                continue;
            }
            if admitted.len() >= config.max_items {
                excluded.push(SessionExclusion {
                    item_id: candidate.item_id,
                    reason: ExclusionReason::LowPriority,
                });
                continue;
            }
            if cumulative_load + candidate.cognitive_load > budget {
                excluded.push(SessionExclusion {
                    item_id: candidate.item_id,
                    reason: ExclusionReason::CognitiveOverload,
                });
                continue;
            }
            cumulative_load += candidate.cognitive_load;
            admitted.push(candidate);
        }

        (admitted, excluded)
    }

    /// A break lands wherever cumulative load since the last break
    /// exceeds `break_load_factor * max_cognitive_load`, plus at the
    /// fixed item-count cadence.
    fn place_breaks(&self, items: &[SessionItemPlacement], config: &SessionConfig) -> Vec<usize> {
        let load_threshold = self.tuning.break_load_factor * config.max_cognitive_load;
        let mut breaks = Vec::new();
        let mut load_since_break = 0.0;

        for (idx, item) in items.iter().enumerate() {
            load_since_break += item.cognitive_load;
            let cadence_break = config.break_interval_items > 0
                && (idx + 1) % config.break_interval_items == 0;
            if (load_since_break > load_threshold || cadence_break) && idx + 1 < items.len() {
                breaks.push(idx);
                load_since_break = 0.0;
            }
        }
        breaks
    }

    fn predict(
        &self,
        ordered: &[ScoredCandidate],
        learner: &LearnerSessionState,
        config: &SessionConfig,
    ) -> SessionPrediction {
        if ordered.is_empty() {
            return SessionPrediction::default();
        }
        let n = ordered.len() as f64;
        let learning_value = ordered.iter().map(|c| c.fsrs_priority).sum::<f64>() / n;
        let total_load: f64 = ordered.iter().map(|c| c.cognitive_load).sum();
        let load_ratio = (total_load / config.budget()).clamp(0.0, 1.0);

        let retention_probability = (config.target_retention
            * (1.0 - 0.1 * load_ratio)
            * (1.0 - 0.2 * learner.effective_fatigue()))
        .clamp(0.0, 1.0);

        SessionPrediction {
            learning_value,
            retention_probability,
            cognitive_load_average: total_load / n,
        }
    }
}
