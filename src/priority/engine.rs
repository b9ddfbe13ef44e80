//! Priority computation and queue building. The final score is
//! FRE / (cost - transfer + prerequisite penalty) + urgency, with
//! bottleneck signals boosting the deficient component and pressing on
//! its downstream dependents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ability::irt::ItemParameters;
use crate::bottleneck::BottleneckAnalysis;
use crate::cache::ComputeCache;
use crate::config::{BottleneckConfig, CoreConfig, MemoryConfig, PriorityConfig};
use crate::error::{CoreError, CoreResult};
use crate::memory::fsrs::{card_retrievability, mastery_stage, MemoryCard};
use crate::priority::cost::{item_cost, ComponentVector};
use crate::priority::fre::{weights_for_level, FreScore};
use crate::session::load::item_load;
use crate::types::{ComponentType, ProficiencyLevel};

const MAX_TRANSFER_BONUS: f64 = 0.5;

/// One learnable item as supplied by item storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnableItem {
    pub id: String,
    pub component: ComponentType,
    pub fre: FreScore,
    pub params: ItemParameters,
    pub vector: Option<ComponentVector>,
    /// Cross-language / cross-item transfer credit, e.g. a known root
    /// or cognate. Discounts cost, capped at 0.5.
    pub transfer_bonus: f64,
}

impl LearnableItem {
    pub fn new(id: impl Into<String>, component: ComponentType, fre: FreScore) -> Self {
        Self {
            id: id.into(),
            component,
            fre,
            params: ItemParameters::default(),
            vector: None,
            transfer_bonus: 0.0,
        }
    }
}

/// Learner-level inputs to ranking: proficiency and how automated each
/// skill component already is (0-1 mastered share).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerState {
    pub level: ProficiencyLevel,
    pub component_automation: BTreeMap<ComponentType, f64>,
}

impl LearnerState {
    pub fn new(level: ProficiencyLevel) -> Self {
        Self {
            level,
            component_automation: BTreeMap::new(),
        }
    }

    pub fn with_automation(mut self, component: ComponentType, share: f64) -> Self {
        self.component_automation
            .insert(component, share.clamp(0.0, 1.0));
        self
    }

    pub fn is_automated(&self, component: ComponentType, threshold: f64) -> bool {
        self.component_automation
            .get(&component)
            .copied()
            .unwrap_or(0.0)
            >= threshold
    }
}

/// Ranking output for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityRecord {
    pub item_id: String,
    pub fre: FreScore,
    pub cost: f64,
    pub urgency: f64,
    pub priority: f64,
    pub prerequisite_met: bool,
}

/// One ranked candidate for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub item_id: String,
    pub component: ComponentType,
    pub priority: f64,
    pub mastery_stage: u8,
    /// Urgency normalized to [0, 1] for session scoring.
    pub fsrs_priority: f64,
    pub cognitive_load: f64,
    pub prerequisite_met: bool,
}

/// Memory urgency in three tiers: due-for-review items dominate, never
/// seen items form a distinct middle tier, and not-yet-due items trail
/// with their small residual forgetting.
pub fn urgency(
    card: Option<&MemoryCard>,
    now: DateTime<Utc>,
    target_retention: f64,
    config: &PriorityConfig,
) -> f64 {
    match card {
        None => config.new_item_urgency,
        Some(card) => {
            let r = card_retrievability(card, now);
            let forgotten = (1.0 - r).max(0.0);
            if r <= target_retention {
                config.overdue_base + forgotten * config.urgency_bonus_scale
            } else {
                forgotten
            }
        }
    }
}

pub struct PriorityEngine {
    priority: PriorityConfig,
    memory: MemoryConfig,
    bottleneck: BottleneckConfig,
    cost_cache: ComputeCache<f64>,
}

impl PriorityEngine {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            priority: config.priority.clone(),
            memory: config.memory.clone(),
            bottleneck: config.bottleneck.clone(),
            cost_cache: ComputeCache::new(config.cache.capacity),
        }
    }

    /// Drops memoized per-item costs; call between scheduling passes if
    /// item metadata may have changed.
    pub fn clear_cache(&self) {
        self.cost_cache.clear();
    }

    pub fn compute_priority(
        &self,
        item: &LearnableItem,
        learner: &LearnerState,
        card: Option<&MemoryCard>,
        analysis: Option<&BottleneckAnalysis>,
        now: DateTime<Utc>,
    ) -> CoreResult<PriorityRecord> {
        item.params.validate()?;
        if !item.transfer_bonus.is_finite() {
            return Err(CoreError::NonFinite("transfer bonus"));
        }

        let weights = weights_for_level(&self.priority, learner.level);
        let fre_value = item.fre.composite(weights);

        let cost = self.cost_cache.get_or_insert_with(&item.id, || {
            item_cost(item.params.difficulty, item.vector.as_ref())
        });

        let prerequisite_met = item
            .component
            .upstream()
            .iter()
            .all(|&c| learner.is_automated(c, self.priority.automation_threshold));

        let mut penalty = if prerequisite_met {
            0.0
        } else {
            self.priority.prerequisite_penalty
        };
        if let Some(analysis) = analysis {
            penalty += analysis.prerequisite_boost(item.component, &self.bottleneck);
        }

        let transfer = item.transfer_bonus.clamp(0.0, MAX_TRANSFER_BONUS);
        let denominator = (cost - transfer + penalty).max(self.priority.min_cost_denominator);

        let mut urgency_value = urgency(card, now, self.memory.target_retention, &self.priority);
        if let Some(analysis) = analysis {
            urgency_value *= 1.0 + analysis.urgency_boost(item.component, &self.bottleneck);
        }

        Ok(PriorityRecord {
            item_id: item.id.clone(),
            fre: item.fre.clamped(),
            cost,
            urgency: urgency_value,
            priority: fre_value / denominator + urgency_value,
            prerequisite_met,
        })
    }

    /// Ranks all items for one learner. The output order is total and
    /// deterministic: score descending, ties by ascending item id.
    pub fn build_learning_queue(
        &self,
        items: &[LearnableItem],
        learner: &LearnerState,
        cards: &BTreeMap<String, MemoryCard>,
        analysis: Option<&BottleneckAnalysis>,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<QueueItem>> {
        let urgency_ceiling = self.priority.overdue_base + self.priority.urgency_bonus_scale;

        let mut queue = Vec::with_capacity(items.len());
        for item in items {
            let card = cards.get(&item.id);
            let record = self.compute_priority(item, learner, card, analysis, now)?;
            let stage = card.map(mastery_stage).unwrap_or(0);

            queue.push(QueueItem {
                item_id: record.item_id,
                component: item.component,
                priority: record.priority,
                mastery_stage: stage,
                fsrs_priority: (record.urgency / urgency_ceiling.max(1e-9)).clamp(0.0, 1.0),
                cognitive_load: item_load(item.component, stage),
                prerequisite_met: record.prerequisite_met,
            });
        }

        queue.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bottleneck;
    use crate::config::BottleneckConfig;
    use crate::memory::fsrs::CardState;
    use crate::types::ResponseEvent;
    use chrono::Duration;

    fn engine() -> PriorityEngine {
        PriorityEngine::new(&CoreConfig::default())
    }

    fn automated_learner() -> LearnerState {
        let mut learner = LearnerState::new(ProficiencyLevel::B1);
        for component in ComponentType::ORDER {
            learner = learner.with_automation(component, 1.0);
        }
        learner
    }

    fn item(id: &str, component: ComponentType) -> LearnableItem {
        LearnableItem::new(id, component, FreScore::new(0.6, 0.5, 0.4))
    }

    fn overdue_card(now: DateTime<Utc>) -> MemoryCard {
        MemoryCard {
            difficulty: 5.0,
            stability: 2.0,
            retrievability: 1.0,
            last_review: Some(now - Duration::days(10)),
            reps: 4,
            lapses: 0,
            state: CardState::Review,
        }
    }

    fn fresh_card(now: DateTime<Utc>) -> MemoryCard {
        MemoryCard {
            difficulty: 5.0,
            stability: 40.0,
            retrievability: 1.0,
            last_review: Some(now - Duration::days(1)),
            reps: 4,
            lapses: 0,
            state: CardState::Review,
        }
    }

    #[test]
    fn test_urgency_tiers() {
        let now = Utc::now();
        let config = PriorityConfig::default();
        let due = urgency(Some(&overdue_card(now)), now, 0.9, &config);
        let new = urgency(None, now, 0.9, &config);
        let not_due = urgency(Some(&fresh_card(now)), now, 0.9, &config);
        assert!(due > new, "due {due} should outrank new {new}");
        assert!(new > not_due, "new {new} should outrank not-due {not_due}");
    }

    #[test]
    fn test_priority_increases_with_fre() {
        let now = Utc::now();
        let engine = engine();
        let learner = automated_learner();
        let low = LearnableItem::new("a", ComponentType::Lexis, FreScore::new(0.2, 0.2, 0.2));
        let high = LearnableItem::new("a", ComponentType::Lexis, FreScore::new(0.8, 0.8, 0.8));
        let p_low = engine
            .compute_priority(&low, &learner, None, None, now)
            .unwrap();
        let p_high = engine
            .compute_priority(&high, &learner, None, None, now)
            .unwrap();
        assert!(p_high.priority > p_low.priority);
    }

    #[test]
    fn test_priority_decreases_with_cost() {
        let now = Utc::now();
        let engine = engine();
        let learner = automated_learner();
        let mut cheap = item("cheap", ComponentType::Lexis);
        cheap.params = ItemParameters::new(1.0, -2.0);
        let mut dear = item("dear", ComponentType::Lexis);
        dear.params = ItemParameters::new(1.0, 2.0);
        let p_cheap = engine
            .compute_priority(&cheap, &learner, None, None, now)
            .unwrap();
        let p_dear = engine
            .compute_priority(&dear, &learner, None, None, now)
            .unwrap();
        assert!(p_cheap.cost < p_dear.cost);
        assert!(p_cheap.priority > p_dear.priority);
    }

    #[test]
    fn test_prerequisite_penalty_lowers_priority() {
        let now = Utc::now();
        let engine = engine();
        let syntax_item = item("s1", ComponentType::Syntax);

        let ready = automated_learner();
        let unready = LearnerState::new(ProficiencyLevel::B1);

        let p_ready = engine
            .compute_priority(&syntax_item, &ready, None, None, now)
            .unwrap();
        let p_unready = engine
            .compute_priority(&syntax_item, &unready, None, None, now)
            .unwrap();
        assert!(p_ready.prerequisite_met);
        assert!(!p_unready.prerequisite_met);
        assert!(p_ready.priority > p_unready.priority);
    }

    #[test]
    fn test_phonology_has_no_prerequisites() {
        let now = Utc::now();
        let engine = engine();
        let unready = LearnerState::new(ProficiencyLevel::A1);
        let record = engine
            .compute_priority(&item("p1", ComponentType::Phonology), &unready, None, None, now)
            .unwrap();
        assert!(record.prerequisite_met);
    }

    #[test]
    fn test_transfer_bonus_raises_priority() {
        let now = Utc::now();
        let engine = engine();
        let learner = automated_learner();
        let plain = item("x", ComponentType::Lexis);
        let mut transferred = item("x", ComponentType::Lexis);
        transferred.transfer_bonus = 0.4;
        let p_plain = engine
            .compute_priority(&plain, &learner, None, None, now)
            .unwrap();
        let p_transfer = engine
            .compute_priority(&transferred, &learner, None, None, now)
            .unwrap();
        assert!(p_transfer.priority > p_plain.priority);
    }

    #[test]
    fn test_bottleneck_boost_raises_root_component() {
        let now = Utc::now();
        let engine = engine();
        let learner = automated_learner();
        let morph_item = item("m1", ComponentType::Morphology);

        let mut responses = Vec::new();
        for i in 0..10 {
            responses.push(ResponseEvent::new(
                format!("m{i}"),
                ComponentType::Morphology,
                i >= 5,
                4000,
                now,
            ));
            responses.push(ResponseEvent::new(
                format!("s{i}"),
                ComponentType::Syntax,
                i >= 4,
                4000,
                now,
            ));
        }
        let analysis = bottleneck::analyze(&responses, &BottleneckConfig::default());
        assert!(analysis.root_cause.is_some());

        let without = engine
            .compute_priority(&morph_item, &learner, None, None, now)
            .unwrap();
        let with = engine
            .compute_priority(&morph_item, &learner, None, Some(&analysis), now)
            .unwrap();
        assert!(with.priority > without.priority);
    }

    #[test]
    fn test_queue_order_is_deterministic_with_id_tiebreak() {
        let now = Utc::now();
        let engine = engine();
        let learner = automated_learner();
        let items = vec![
            item("b", ComponentType::Lexis),
            item("a", ComponentType::Lexis),
            item("c", ComponentType::Lexis),
        ];
        let cards = BTreeMap::new();

        let q1 = engine
            .build_learning_queue(&items, &learner, &cards, None, now)
            .unwrap();
        let q2 = engine
            .build_learning_queue(&items, &learner, &cards, None, now)
            .unwrap();

        let ids1: Vec<_> = q1.iter().map(|q| q.item_id.clone()).collect();
        let ids2: Vec<_> = q2.iter().map(|q| q.item_id.clone()).collect();
        assert_eq!(ids1, ids2);
        assert_eq!(ids1, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_queue_ranks_overdue_above_fresh() {
        let now = Utc::now();
        let engine = engine();
        let learner = automated_learner();
        let items = vec![item("due", ComponentType::Lexis), item("fresh", ComponentType::Lexis)];
        let mut cards = BTreeMap::new();
        cards.insert("due".to_string(), overdue_card(now));
        cards.insert("fresh".to_string(), fresh_card(now));

        let queue = engine
            .build_learning_queue(&items, &learner, &cards, None, now)
            .unwrap();
        assert_eq!(queue[0].item_id, "due");
        assert!(queue[0].fsrs_priority > queue[1].fsrs_priority);
    }

    #[test]
    fn test_cost_cache_is_exercised_and_clearable() {
        let now = Utc::now();
        let engine = engine();
        let learner = automated_learner();
        let items = vec![item("a", ComponentType::Lexis), item("b", ComponentType::Syntax)];
        let cards = BTreeMap::new();
        engine
            .build_learning_queue(&items, &learner, &cards, None, now)
            .unwrap();
        engine.clear_cache();
        let queue = engine
            .build_learning_queue(&items, &learner, &cards, None, now)
            .unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_invalid_item_params_fail_fast() {
        let now = Utc::now();
        let engine = engine();
        let learner = automated_learner();
        let mut bad = item("bad", ComponentType::Lexis);
        bad.params = ItemParameters::new(-1.0, 0.0);
        assert!(engine
            .compute_priority(&bad, &learner, None, None, now)
            .is_err());
    }
}
