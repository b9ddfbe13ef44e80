//! Theta estimation: Newton-Raphson (Fisher scoring) MLE and
//! Gauss-Hermite EAP over a normal prior.
//!
//! MLE degrades to a flagged centered default on perfect/zero response
//! vectors and on non-convergence. EAP always converges and is the
//! small-sample workhorse.

use serde::{Deserialize, Serialize};

use crate::ability::irt::{fisher_information, probability, ItemParameters};
use crate::config::AbilityConfig;
use crate::error::{CoreError, CoreResult};

const INFO_EPSILON: f64 = 1e-9;
const GH_NEWTON_MAX: usize = 12;
const GH_NEWTON_TOL: f64 = 3e-14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMethod {
    Mle,
    Eap,
    /// Flagged fallback: too little signal for a real estimate.
    Default,
}

/// Learner ability on one latent dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThetaEstimate {
    pub theta: f64,
    pub se: f64,
    pub n_responses: usize,
    pub method: EstimationMethod,
}

impl ThetaEstimate {
    fn fallback(config: &AbilityConfig, n_responses: usize) -> Self {
        Self {
            theta: 0.0,
            se: config.default_se,
            n_responses,
            method: EstimationMethod::Default,
        }
    }
}

fn validate_inputs(responses: &[bool], items: &[ItemParameters]) -> CoreResult<()> {
    if responses.len() != items.len() {
        return Err(CoreError::LengthMismatch {
            left: responses.len(),
            right: items.len(),
        });
    }
    for item in items {
        item.validate()?;
    }
    Ok(())
}

fn log_likelihood(theta: f64, responses: &[bool], items: &[ItemParameters]) -> f64 {
    responses
        .iter()
        .zip(items)
        .map(|(&y, item)| {
            let p = probability(theta, item).clamp(1e-9, 1.0 - 1e-9);
            if y {
                p.ln()
            } else {
                (1.0 - p).ln()
            }
        })
        .sum()
}

fn score(theta: f64, responses: &[bool], items: &[ItemParameters]) -> f64 {
    responses
        .iter()
        .zip(items)
        .map(|(&y, item)| {
            let a = item.discrimination;
            let p = probability(theta, item).clamp(1e-9, 1.0 - 1e-9);
            let yv = if y { 1.0 } else { 0.0 };
            match item.guessing {
                Some(c) if c > 0.0 => a * (yv - p) * (p - c) / (p * (1.0 - c)),
                _ => a * (yv - p),
            }
        })
        .sum()
}

/// Maximum-likelihood theta via Fisher scoring. The likelihood has no
/// interior maximum for all-correct / all-incorrect vectors; those and
/// non-converging iterations return the flagged centered default.
pub fn estimate_theta_mle(
    responses: &[bool],
    items: &[ItemParameters],
    config: &AbilityConfig,
) -> CoreResult<ThetaEstimate> {
    validate_inputs(responses, items)?;
    let n = responses.len();

    if n == 0 {
        return Ok(ThetaEstimate::fallback(config, 0));
    }
    let correct = responses.iter().filter(|&&y| y).count();
    if correct == 0 || correct == n {
        tracing::debug!(
            n_responses = n,
            correct,
            "degenerate response vector, returning centered default"
        );
        return Ok(ThetaEstimate::fallback(config, n));
    }

    let bound = config.theta_bound;
    let mut theta = 0.0;
    let mut converged = false;
    let mut info = 0.0;

    for _ in 0..config.max_iterations {
        info = items
            .iter()
            .map(|item| fisher_information(theta, item))
            .sum::<f64>();
        if info < INFO_EPSILON {
            break;
        }
        let step = score(theta, responses, items) / info;
        theta = (theta + step).clamp(-bound, bound);
        if step.abs() < config.convergence_tol {
            converged = true;
            break;
        }
    }

    if !converged || info < INFO_EPSILON {
        tracing::debug!(n_responses = n, "theta MLE did not converge");
        return Ok(ThetaEstimate::fallback(config, n));
    }

    let se = (1.0 / info.sqrt()).max(config.se_floor);
    Ok(ThetaEstimate {
        theta,
        se,
        n_responses: n,
        method: EstimationMethod::Mle,
    })
}

/// Expected-a-posteriori theta over a normal prior, integrated with
/// Gauss-Hermite quadrature. Always produces a finite estimate.
pub fn estimate_theta_eap(
    responses: &[bool],
    items: &[ItemParameters],
    config: &AbilityConfig,
) -> CoreResult<ThetaEstimate> {
    validate_inputs(responses, items)?;
    let n = responses.len();

    if n == 0 {
        return Ok(ThetaEstimate {
            theta: config.prior_mean,
            se: config.prior_sd,
            n_responses: 0,
            method: EstimationMethod::Default,
        });
    }

    let points = config.quadrature_points.clamp(4, 64);
    let (nodes, weights) = gauss_hermite(points);

    // Substitution theta = mu + sqrt(2)*sigma*x folds the prior density
    // into the e^{-x^2} quadrature weight; constants cancel in the ratio.
    let scale = std::f64::consts::SQRT_2 * config.prior_sd;
    let thetas: Vec<f64> = nodes.iter().map(|x| config.prior_mean + scale * x).collect();
    let log_l: Vec<f64> = thetas
        .iter()
        .map(|&t| log_likelihood(t, responses, items))
        .collect();
    let max_log = log_l.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut norm = 0.0;
    let mut mean = 0.0;
    for k in 0..points {
        let u = weights[k] * (log_l[k] - max_log).exp();
        norm += u;
        mean += u * thetas[k];
    }

    if norm < INFO_EPSILON || !norm.is_finite() {
        return Ok(ThetaEstimate::fallback(config, n));
    }
    let theta = (mean / norm).clamp(-config.theta_bound, config.theta_bound);

    let mut var = 0.0;
    for k in 0..points {
        let u = weights[k] * (log_l[k] - max_log).exp();
        var += u * (thetas[k] - theta) * (thetas[k] - theta);
    }
    let se = (var / norm).sqrt().max(config.se_floor);

    Ok(ThetaEstimate {
        theta,
        se,
        n_responses: n,
        method: EstimationMethod::Eap,
    })
}

/// Nodes and weights for n-point Gauss-Hermite quadrature
/// (physicists' convention, weight e^{-x^2}), via Newton iteration on
/// the orthonormal Hermite recurrence. Deterministic; converges in a
/// handful of steps for the orders used here.
pub(crate) fn gauss_hermite(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let m = n.div_ceil(2);
    let nf = n as f64;

    let mut z = 0.0;
    for i in 0..m {
        z = match i {
            0 => (2.0 * nf + 1.0).sqrt() - 1.85575 * (2.0 * nf + 1.0).powf(-1.0 / 6.0),
            1 => z - 1.14 * nf.powf(0.426) / z,
            2 => 1.86 * z - 0.86 * nodes[0],
            3 => 1.91 * z - 0.91 * nodes[1],
            _ => 2.0 * z - nodes[i - 2],
        };

        let mut pp = 1.0;
        for _ in 0..GH_NEWTON_MAX {
            let mut p1 = std::f64::consts::PI.powf(-0.25);
            let mut p2 = 0.0;
            for j in 0..n {
                let p3 = p2;
                p2 = p1;
                let jf = j as f64;
                p1 = z * (2.0 / (jf + 1.0)).sqrt() * p2 - (jf / (jf + 1.0)).sqrt() * p3;
            }
            pp = (2.0 * nf).sqrt() * p2;
            let dz = p1 / pp;
            z -= dz;
            if dz.abs() <= GH_NEWTON_TOL {
                break;
            }
        }

        nodes[i] = z;
        nodes[n - 1 - i] = -z;
        weights[i] = 2.0 / (pp * pp);
        weights[n - 1 - i] = weights[i];
    }

    (nodes, weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AbilityConfig {
        AbilityConfig::default()
    }

    fn spread_items(n: usize) -> Vec<ItemParameters> {
        (0..n)
            .map(|i| {
                let b = -2.0 + 4.0 * i as f64 / (n - 1).max(1) as f64;
                ItemParameters::new(1.2, b)
            })
            .collect()
    }

    #[test]
    fn test_gauss_hermite_integrates_constants() {
        // integral of e^{-x^2} dx = sqrt(pi)
        for n in [4, 8, 16, 21] {
            let (_, weights) = gauss_hermite(n);
            let total: f64 = weights.iter().sum();
            assert!(
                (total - std::f64::consts::PI.sqrt()).abs() < 1e-10,
                "n={n}: {total}"
            );
        }
    }

    #[test]
    fn test_gauss_hermite_integrates_x_squared() {
        // integral of x^2 e^{-x^2} dx = sqrt(pi)/2
        let (nodes, weights) = gauss_hermite(16);
        let total: f64 = nodes.iter().zip(&weights).map(|(x, w)| w * x * x).sum();
        assert!((total - std::f64::consts::PI.sqrt() / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_mle_recovers_sign_of_ability() {
        let items = spread_items(10);
        let strong: Vec<bool> = (0..10).map(|i| i < 8).collect();
        let weak: Vec<bool> = (0..10).map(|i| i < 2).collect();
        let cfg = config();

        let est_strong = estimate_theta_mle(&strong, &items, &cfg).unwrap();
        let est_weak = estimate_theta_mle(&weak, &items, &cfg).unwrap();
        assert_eq!(est_strong.method, EstimationMethod::Mle);
        assert!(est_strong.theta > est_weak.theta);
    }

    #[test]
    fn test_mle_all_correct_returns_flagged_default() {
        let items = spread_items(8);
        let responses = vec![true; 8];
        let est = estimate_theta_mle(&responses, &items, &config()).unwrap();
        assert_eq!(est.method, EstimationMethod::Default);
        assert!(est.theta.is_finite());
        assert!(est.se.is_finite());
        assert_eq!(est.theta, 0.0);
    }

    #[test]
    fn test_mle_length_mismatch_fails_fast() {
        let items = spread_items(3);
        let responses = vec![true, false];
        assert!(estimate_theta_mle(&responses, &items, &config()).is_err());
    }

    #[test]
    fn test_eap_handles_all_correct() {
        let items = spread_items(8);
        let responses = vec![true; 8];
        let est = estimate_theta_eap(&responses, &items, &config()).unwrap();
        assert_eq!(est.method, EstimationMethod::Eap);
        assert!(est.theta > 0.5);
        assert!(est.theta <= 3.0);
    }

    #[test]
    fn test_eap_close_to_mle_on_clean_data() {
        let items = spread_items(20);
        let responses: Vec<bool> = (0..20).map(|i| i % 3 != 0).collect();
        let cfg = config();
        let mle = estimate_theta_mle(&responses, &items, &cfg).unwrap();
        let eap = estimate_theta_eap(&responses, &items, &cfg).unwrap();
        // The prior shrinks EAP toward 0, so allow a generous margin.
        assert!((mle.theta - eap.theta).abs() < 0.5);
    }

    #[test]
    fn test_eap_empty_returns_prior() {
        let est = estimate_theta_eap(&[], &[], &config()).unwrap();
        assert_eq!(est.method, EstimationMethod::Default);
        assert_eq!(est.theta, 0.0);
        assert_eq!(est.se, 1.0);
    }

    #[test]
    fn test_se_shrinks_with_more_observations() {
        let cfg = config();
        let few_items = spread_items(5);
        let few: Vec<bool> = vec![true, false, true, false, true];
        let many_items = spread_items(40);
        let many: Vec<bool> = (0..40).map(|i| i % 2 == 0).collect();

        let est_few = estimate_theta_eap(&few, &few_items, &cfg).unwrap();
        let est_many = estimate_theta_eap(&many, &many_items, &cfg).unwrap();
        assert!(est_many.se < est_few.se);
        assert!(est_many.se >= cfg.se_floor);
    }
}
