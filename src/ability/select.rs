//! Adaptive item selection: maximum Fisher information and KL-index
//! variants. Both rank candidates by informativeness at the current
//! theta estimate, not by raw difficulty proximity.

use crate::ability::irt::{fisher_information, probability, ItemParameters};

const KL_GRID_POINTS: usize = 21;
const MIN_KL_HALF_WIDTH: f64 = 0.1;
const PROB_CLAMP: f64 = 1e-6;

/// Index of the unadministered item with maximum Fisher information at
/// theta. Ties break toward the lower index so selection is
/// deterministic. None when every item has been administered.
pub fn select_next_item(
    theta: f64,
    items: &[ItemParameters],
    administered: &[usize],
) -> Option<usize> {
    if !theta.is_finite() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (idx, item) in items.iter().enumerate() {
        if administered.contains(&idx) {
            continue;
        }
        let info = fisher_information(theta, item);
        match best {
            Some((_, best_info)) if info <= best_info => {}
            _ => best = Some((idx, info)),
        }
    }
    best.map(|(idx, _)| idx)
}

fn bernoulli_kl(p0: f64, p1: f64) -> f64 {
    let p0 = p0.clamp(PROB_CLAMP, 1.0 - PROB_CLAMP);
    let p1 = p1.clamp(PROB_CLAMP, 1.0 - PROB_CLAMP);
    p0 * (p0 / p1).ln() + (1.0 - p0) * ((1.0 - p0) / (1.0 - p1)).ln()
}

/// KL index of one item: KL divergence between the response
/// distribution at the current estimate and at nearby thetas,
/// integrated over [theta - delta, theta + delta].
fn kl_index(theta: f64, half_width: f64, item: &ItemParameters) -> f64 {
    let p_hat = probability(theta, item);
    let step = 2.0 * half_width / (KL_GRID_POINTS - 1) as f64;
    let mut total = 0.0;
    for k in 0..KL_GRID_POINTS {
        let t = theta - half_width + step * k as f64;
        total += bernoulli_kl(p_hat, probability(t, item));
    }
    total * step
}

/// Index of the unadministered item with maximum KL index around the
/// current estimate; the integration half-width scales with the
/// estimate's standard error, so uncertain thetas look further afield.
pub fn select_item_kl(
    theta: f64,
    se: f64,
    items: &[ItemParameters],
    administered: &[usize],
) -> Option<usize> {
    if !theta.is_finite() {
        return None;
    }
    let half_width = se.max(MIN_KL_HALF_WIDTH);
    let mut best: Option<(usize, f64)> = None;
    for (idx, item) in items.iter().enumerate() {
        if administered.contains(&idx) {
            continue;
        }
        let index = kl_index(theta, half_width, item);
        match best {
            Some((_, best_index)) if index <= best_index => {}
            _ => best = Some((idx, index)),
        }
    }
    best.map(|(idx, _)| idx)
}
