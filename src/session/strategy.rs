//! Interleaving strategies: five ways to order an admitted candidate
//! set, plus the resolution rule that picks one from explicit choice,
//! fatigue, and proficiency level.

use serde::{Deserialize, Serialize};

use crate::config::SessionTuning;
use crate::session::composer::ScoredCandidate;
use crate::types::{ComponentType, ProficiencyLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterleavingStrategy {
    PureBlocking,
    PureInterleaving,
    Hybrid,
    Related,
    Adaptive,
}

/// Resolution order: explicit concrete strategy, then adaptive (high
/// fatigue forces blocking), then the level-mapped default.
pub fn select_strategy(
    explicit: Option<InterleavingStrategy>,
    fatigue: f64,
    level: ProficiencyLevel,
    tuning: &SessionTuning,
) -> InterleavingStrategy {
    match explicit {
        Some(strategy) if strategy != InterleavingStrategy::Adaptive => strategy,
        _ => {
            if fatigue >= tuning.high_fatigue_threshold {
                return InterleavingStrategy::PureBlocking;
            }
            match level {
                ProficiencyLevel::A1 | ProficiencyLevel::A2 => InterleavingStrategy::PureBlocking,
                ProficiencyLevel::B1 => InterleavingStrategy::Hybrid,
                ProficiencyLevel::B2 => InterleavingStrategy::Related,
                ProficiencyLevel::C1 | ProficiencyLevel::C2 => {
                    InterleavingStrategy::PureInterleaving
                }
            }
        }
    }
}

/// Applies the resolved strategy. Input arrives sorted by combined
/// score descending; every strategy is a permutation of it.
pub fn order_candidates(
    candidates: Vec<ScoredCandidate>,
    strategy: InterleavingStrategy,
    fatigue: f64,
    level: ProficiencyLevel,
    tuning: &SessionTuning,
) -> Vec<ScoredCandidate> {
    match strategy {
        InterleavingStrategy::PureBlocking => order_blocking(candidates),
        InterleavingStrategy::PureInterleaving => order_interleaving(candidates),
        InterleavingStrategy::Hybrid => order_hybrid(candidates),
        InterleavingStrategy::Related => order_related(candidates),
        InterleavingStrategy::Adaptive => {
            let delegated = select_strategy(None, fatigue, level, tuning);
            order_candidates(candidates, delegated, fatigue, level, tuning)
        }
    }
}

/// Groups by component type; groups ordered by their best score,
/// highest-scored item first within each group.
fn order_blocking(candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut groups: Vec<(ComponentType, Vec<ScoredCandidate>)> = Vec::new();
    for candidate in candidates {
        match groups.iter_mut().find(|(c, _)| *c == candidate.component) {
            Some((_, group)) => group.push(candidate),
            None => groups.push((candidate.component, vec![candidate])),
        }
    }
    for (_, group) in groups.iter_mut() {
        group.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
    }
    groups.sort_by(|a, b| {
        let best_a = a.1.first().map(|c| c.combined_score).unwrap_or(0.0);
        let best_b = b.1.first().map(|c| c.combined_score).unwrap_or(0.0);
        best_b
            .partial_cmp(&best_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    groups.into_iter().flat_map(|(_, group)| group).collect()
}

/// Never repeats the immediately preceding type unless no alternative
/// remains; picks the best-scored admissible candidate each step.
fn order_interleaving(mut pool: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut ordered = Vec::with_capacity(pool.len());
    let mut previous: Option<ComponentType> = None;

    while !pool.is_empty() {
        let pick = pool
            .iter()
            .position(|c| previous != Some(c.component))
            .unwrap_or(0);
        let candidate = pool.remove(pick);
        previous = Some(candidate.component);
        ordered.push(candidate);
    }
    ordered
}

/// Blocks the first half of the session, interleaves the second.
fn order_hybrid(candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let split = candidates.len().div_ceil(2);
    let mut first: Vec<ScoredCandidate> = candidates;
    let second = first.split_off(split);

    let mut ordered = order_blocking(first);
    let boundary = ordered.last().map(|c| c.component);
    let mut tail = order_interleaving_from(second, boundary);
    ordered.append(&mut tail);
    ordered
}

fn order_interleaving_from(
    mut pool: Vec<ScoredCandidate>,
    start_previous: Option<ComponentType>,
) -> Vec<ScoredCandidate> {
    let mut ordered = Vec::with_capacity(pool.len());
    let mut previous = start_previous;
    while !pool.is_empty() {
        let pick = pool
            .iter()
            .position(|c| previous != Some(c.component))
            .unwrap_or(0);
        let candidate = pool.remove(pick);
        previous = Some(candidate.component);
        ordered.push(candidate);
    }
    ordered
}

const MODERATE_RELATEDNESS: f64 = 0.5;

/// Relatedness by distance in the component chain: identical types are
/// maximally related, far layers barely.
fn relatedness(a: ComponentType, b: ComponentType) -> f64 {
    match a.layer().abs_diff(b.layer()) {
        0 => 1.0,
        1 => 0.6,
        2 => 0.4,
        _ => 0.2,
    }
}

/// Greedy walk preferring moderate relatedness to the previous item:
/// neither a same-type repeat nor an unrelated jump. Desirable
/// difficulty without thrash.
fn order_related(mut pool: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    if pool.is_empty() {
        return pool;
    }
    let mut ordered = Vec::with_capacity(pool.len());
    // Start from the strongest candidate.
    ordered.push(pool.remove(0));

    while !pool.is_empty() {
        let previous = ordered.last().map(|c| c.component).unwrap();
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (idx, candidate) in pool.iter().enumerate() {
            let distance = (relatedness(previous, candidate.component) - MODERATE_RELATEDNESS).abs();
            if distance < best_distance - 1e-12 {
                best = idx;
                best_distance = distance;
            }
        }
        ordered.push(pool.remove(best));
    }
    ordered
}
