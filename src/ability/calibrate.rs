//! Joint item-parameter calibration: alternating EAP ability
//! estimation and per-item Newton steps on the 2PL likelihood over a
//! person x item response matrix.
//!
//! Calibration is a batch job. It declines politely on sparse data and
//! reports per-parameter standard errors so callers can ignore
//! untrustworthy columns.

use serde::{Deserialize, Serialize};

use crate::ability::estimate::estimate_theta_eap;
use crate::ability::irt::{probability, ItemParameters};
use crate::config::{AbilityConfig, CalibrationConfig};
use crate::error::{CoreError, CoreResult};

const INFO_EPSILON: f64 = 1e-9;
const DISCRIMINATION_RANGE: (f64, f64) = (0.5, 2.5);
const DIFFICULTY_RANGE: (f64, f64) = (-3.0, 3.0);

/// Person x item boolean matrix; None marks an unobserved cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMatrix {
    rows: Vec<Vec<Option<bool>>>,
}

impl ResponseMatrix {
    pub fn new(rows: Vec<Vec<Option<bool>>>) -> CoreResult<Self> {
        if let Some(first) = rows.first() {
            let width = first.len();
            if rows.iter().any(|r| r.len() != width) {
                return Err(CoreError::InvalidInput(
                    "response matrix rows have unequal lengths".into(),
                ));
            }
        }
        Ok(Self { rows })
    }

    pub fn from_dense(rows: Vec<Vec<bool>>) -> CoreResult<Self> {
        Self::new(
            rows.into_iter()
                .map(|r| r.into_iter().map(Some).collect())
                .collect(),
        )
    }

    pub fn n_respondents(&self) -> usize {
        self.rows.len()
    }

    pub fn n_items(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn get(&self, person: usize, item: usize) -> Option<bool> {
        self.rows.get(person).and_then(|r| r.get(item)).copied().flatten()
    }

    pub fn item_response_count(&self, item: usize) -> usize {
        self.rows
            .iter()
            .filter(|r| r.get(item).copied().flatten().is_some())
            .count()
    }
}

/// Why calibration declined to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum CalibrationDecline {
    InsufficientRespondents { required: usize, actual: usize },
    InsufficientItems { required: usize, actual: usize },
    InsufficientItemResponses {
        item_index: usize,
        required: usize,
        actual: usize,
    },
}

impl CalibrationDecline {
    pub fn describe(&self) -> String {
        match self {
            Self::InsufficientRespondents { required, actual } => {
                format!("need {required} respondents, have {actual}")
            }
            Self::InsufficientItems { required, actual } => {
                format!("need {required} items, have {actual}")
            }
            Self::InsufficientItemResponses {
                item_index,
                required,
                actual,
            } => format!("item {item_index} has {actual} responses, need {required}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCalibration {
    pub item_index: usize,
    pub parameters: ItemParameters,
    pub se_discrimination: f64,
    pub se_difficulty: f64,
    pub n_responses: usize,
    /// False when either standard error exceeds the quality threshold;
    /// callers should not overwrite stored parameters with these.
    pub trustworthy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationResult {
    pub items: Vec<ItemCalibration>,
    pub iterations: u32,
    pub converged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum CalibrationOutcome {
    Declined { decline: CalibrationDecline },
    Calibrated(CalibrationResult),
}

impl CalibrationOutcome {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated(_))
    }
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(0.05, 0.95);
    (p / (1.0 - p)).ln()
}

/// Joint MLE/EM estimation of (a, b) per item column. Iteration count
/// is bounded; the outcome reports whether the parameter sweep
/// converged within it.
pub fn calibrate_items(
    matrix: &ResponseMatrix,
    config: &CalibrationConfig,
    ability: &AbilityConfig,
) -> CoreResult<CalibrationOutcome> {
    let n_persons = matrix.n_respondents();
    let n_items = matrix.n_items();

    if n_persons < config.min_respondents {
        return Ok(CalibrationOutcome::Declined {
            decline: CalibrationDecline::InsufficientRespondents {
                required: config.min_respondents,
                actual: n_persons,
            },
        });
    }
    if n_items < config.min_items {
        return Ok(CalibrationOutcome::Declined {
            decline: CalibrationDecline::InsufficientItems {
                required: config.min_items,
                actual: n_items,
            },
        });
    }
    for j in 0..n_items {
        let count = matrix.item_response_count(j);
        if count < config.min_responses_per_item {
            return Ok(CalibrationOutcome::Declined {
                decline: CalibrationDecline::InsufficientItemResponses {
                    item_index: j,
                    required: config.min_responses_per_item,
                    actual: count,
                },
            });
        }
    }

    // Initialize difficulties from item p-values and abilities from raw
    // score logits; discriminations start at 1.
    let mut items: Vec<ItemParameters> = (0..n_items)
        .map(|j| {
            let (correct, total) = column_counts(matrix, j);
            let p_value = correct as f64 / total.max(1) as f64;
            ItemParameters::new(1.0, (-logit(p_value)).clamp(DIFFICULTY_RANGE.0, DIFFICULTY_RANGE.1))
        })
        .collect();
    let mut thetas: Vec<f64> = (0..n_persons)
        .map(|p| {
            let (correct, total) = row_counts(matrix, p);
            logit((correct as f64 + 0.5) / (total as f64 + 1.0))
                .clamp(-ability.theta_bound, ability.theta_bound)
        })
        .collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        // E-step stand-in: re-estimate each person's theta by EAP under
        // the current item parameters.
        for p in 0..n_persons {
            let (responses, observed_items) = person_vectors(matrix, &items, p);
            if responses.is_empty() {
                continue;
            }
            let estimate = estimate_theta_eap(&responses, &observed_items, ability)?;
            thetas[p] = estimate.theta;
        }

        // M-step: per-item Newton ascent on the 2PL likelihood.
        let mut max_delta: f64 = 0.0;
        for (j, item) in items.iter_mut().enumerate() {
            let before = (item.discrimination, item.difficulty);
            newton_item_step(matrix, &thetas, j, item, config.inner_iterations);
            max_delta = max_delta
                .max((item.discrimination - before.0).abs())
                .max((item.difficulty - before.1).abs());
        }

        if max_delta < config.convergence_tol {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::debug!(iterations, "item calibration hit the iteration bound");
    }

    let calibrated = items
        .iter()
        .enumerate()
        .map(|(j, item)| {
            let (se_a, se_b) = standard_errors(matrix, &thetas, j, item);
            let n_responses = matrix.item_response_count(j);
            let trustworthy =
                se_a <= config.se_quality_threshold && se_b <= config.se_quality_threshold;
            ItemCalibration {
                item_index: j,
                parameters: item.clone(),
                se_discrimination: se_a,
                se_difficulty: se_b,
                n_responses,
                trustworthy,
            }
        })
        .collect();

    Ok(CalibrationOutcome::Calibrated(CalibrationResult {
        items: calibrated,
        iterations,
        converged,
    }))
}

fn column_counts(matrix: &ResponseMatrix, item: usize) -> (usize, usize) {
    let mut correct = 0;
    let mut total = 0;
    for p in 0..matrix.n_respondents() {
        if let Some(y) = matrix.get(p, item) {
            total += 1;
            if y {
                correct += 1;
            }
        }
    }
    (correct, total)
}

fn row_counts(matrix: &ResponseMatrix, person: usize) -> (usize, usize) {
    let mut correct = 0;
    let mut total = 0;
    for j in 0..matrix.n_items() {
        if let Some(y) = matrix.get(person, j) {
            total += 1;
            if y {
                correct += 1;
            }
        }
    }
    (correct, total)
}

fn person_vectors(
    matrix: &ResponseMatrix,
    items: &[ItemParameters],
    person: usize,
) -> (Vec<bool>, Vec<ItemParameters>) {
    let mut responses = Vec::new();
    let mut observed = Vec::new();
    for (j, item) in items.iter().enumerate() {
        if let Some(y) = matrix.get(person, j) {
            responses.push(y);
            observed.push(item.clone());
        }
    }
    (responses, observed)
}

fn newton_item_step(
    matrix: &ResponseMatrix,
    thetas: &[f64],
    item_index: usize,
    item: &mut ItemParameters,
    inner_iterations: u32,
) {
    for _ in 0..inner_iterations {
        let mut grad_a = 0.0;
        let mut grad_b = 0.0;
        let mut info_a = 0.0;
        let mut info_b = 0.0;

        for (p, &theta) in thetas.iter().enumerate() {
            let Some(y) = matrix.get(p, item_index) else {
                continue;
            };
            let prob = probability(theta, item).clamp(1e-9, 1.0 - 1e-9);
            let residual = if y { 1.0 - prob } else { -prob };
            let centered = theta - item.difficulty;
            let pq = prob * (1.0 - prob);

            grad_a += residual * centered;
            grad_b += -item.discrimination * residual;
            info_a += centered * centered * pq;
            info_b += item.discrimination * item.discrimination * pq;
        }

        if info_a < INFO_EPSILON || info_b < INFO_EPSILON {
            break;
        }

        let step_a = grad_a / info_a;
        let step_b = grad_b / info_b;
        item.discrimination =
            (item.discrimination + step_a).clamp(DISCRIMINATION_RANGE.0, DISCRIMINATION_RANGE.1);
        item.difficulty =
            (item.difficulty + step_b).clamp(DIFFICULTY_RANGE.0, DIFFICULTY_RANGE.1);

        if step_a.abs() < 1e-5 && step_b.abs() < 1e-5 {
            break;
        }
    }
}

fn standard_errors(
    matrix: &ResponseMatrix,
    thetas: &[f64],
    item_index: usize,
    item: &ItemParameters,
) -> (f64, f64) {
    let mut info_a = 0.0;
    let mut info_b = 0.0;
    for (p, &theta) in thetas.iter().enumerate() {
        if matrix.get(p, item_index).is_none() {
            continue;
        }
        let prob = probability(theta, item).clamp(1e-9, 1.0 - 1e-9);
        let pq = prob * (1.0 - prob);
        let centered = theta - item.difficulty;
        info_a += centered * centered * pq;
        info_b += item.discrimination * item.discrimination * pq;
    }
    (
        1.0 / info_a.max(INFO_EPSILON).sqrt(),
        1.0 / info_b.max(INFO_EPSILON).sqrt(),
    )
}
