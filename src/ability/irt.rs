//! Logistic item response functions (1PL/2PL/3PL) and Fisher
//! information.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

const LOGIT_CLAMP: f64 = 20.0;

/// Psychometric profile of one learnable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParameters {
    /// Discrimination `a`, meaningful in [0.5, 2.5]; never <= 0.
    pub discrimination: f64,
    /// Difficulty `b` on the theta scale, [-3, 3].
    pub difficulty: f64,
    /// Guessing floor `c`, [0, 0.35]. None means a 2PL item.
    pub guessing: Option<f64>,
}

impl Default for ItemParameters {
    fn default() -> Self {
        Self {
            discrimination: 1.0,
            difficulty: 0.0,
            guessing: None,
        }
    }
}

impl ItemParameters {
    pub fn new(discrimination: f64, difficulty: f64) -> Self {
        Self {
            discrimination,
            difficulty,
            guessing: None,
        }
    }

    /// Converts an Elo-style difficulty score to the theta scale.
    pub fn from_elo(difficulty_elo: f64) -> Self {
        Self {
            discrimination: 1.0,
            difficulty: ((difficulty_elo - 1200.0) / 400.0).clamp(-3.0, 3.0),
            guessing: None,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if !self.discrimination.is_finite() || !self.difficulty.is_finite() {
            return Err(CoreError::NonFinite("item parameters"));
        }
        if self.discrimination <= 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "discrimination must be positive, got {}",
                self.discrimination
            )));
        }
        if let Some(c) = self.guessing {
            if !c.is_finite() || !(0.0..1.0).contains(&c) {
                return Err(CoreError::InvalidInput(format!(
                    "guessing parameter out of range: {c}"
                )));
            }
        }
        Ok(())
    }
}

fn logistic(z: f64) -> f64 {
    let z = z.clamp(-LOGIT_CLAMP, LOGIT_CLAMP);
    1.0 / (1.0 + (-z).exp())
}

pub fn probability_1pl(theta: f64, difficulty: f64) -> f64 {
    logistic(theta - difficulty)
}

pub fn probability_2pl(theta: f64, discrimination: f64, difficulty: f64) -> f64 {
    logistic(discrimination * (theta - difficulty))
}

pub fn probability_3pl(theta: f64, discrimination: f64, difficulty: f64, guessing: f64) -> f64 {
    let c = guessing.clamp(0.0, 0.99);
    c + (1.0 - c) * logistic(discrimination * (theta - difficulty))
}

/// Response probability under the item's own model (3PL when a
/// guessing floor is present, else 2PL). Always in (0, 1).
pub fn probability(theta: f64, item: &ItemParameters) -> f64 {
    match item.guessing {
        Some(c) => probability_3pl(theta, item.discrimination, item.difficulty, c),
        None => probability_2pl(theta, item.discrimination, item.difficulty),
    }
}

/// Fisher information contributed by one item at theta. For 3PL the
/// guessing floor discounts information at low theta.
pub fn fisher_information(theta: f64, item: &ItemParameters) -> f64 {
    let a = item.discrimination;
    let p = probability(theta, item);
    let q = 1.0 - p;
    match item.guessing {
        Some(c) if c > 0.0 => {
            let p = p.max(1e-9);
            let ratio = (p - c) / (1.0 - c);
            a * a * (q / p) * ratio * ratio
        }
        _ => a * a * p * q,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_in_open_unit_interval() {
        for theta in [-3.0, -1.0, 0.0, 1.0, 3.0] {
            for b in [-3.0, 0.0, 3.0] {
                for a in [0.5, 1.0, 2.5] {
                    let p = probability_2pl(theta, a, b);
                    assert!(p > 0.0 && p < 1.0, "p={p} at theta={theta} a={a} b={b}");
                }
            }
        }
    }

    #[test]
    fn test_higher_theta_higher_probability() {
        let item = ItemParameters::default();
        assert!(probability(1.0, &item) > probability(0.0, &item));
    }

    #[test]
    fn test_3pl_guessing_floor() {
        let p = probability_3pl(-10.0, 1.5, 0.0, 0.25);
        assert!(p >= 0.25);
        let p_high = probability_3pl(10.0, 1.5, 0.0, 0.25);
        assert!(p_high > 0.99);
    }

    #[test]
    fn test_1pl_is_unit_discrimination_2pl() {
        let p1 = probability_1pl(0.7, -0.2);
        let p2 = probability_2pl(0.7, 1.0, -0.2);
        assert!((p1 - p2).abs() < 1e-12);
    }

    #[test]
    fn test_fisher_information_peaks_near_difficulty() {
        let item = ItemParameters::new(1.5, 0.5);
        let at_b = fisher_information(0.5, &item);
        let far = fisher_information(2.5, &item);
        assert!(at_b > far);
    }

    #[test]
    fn test_fisher_information_discounted_by_guessing() {
        let plain = ItemParameters::new(1.5, 0.0);
        let guessy = ItemParameters {
            guessing: Some(0.25),
            ..ItemParameters::new(1.5, 0.0)
        };
        assert!(fisher_information(0.0, &guessy) < fisher_information(0.0, &plain));
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let bad = ItemParameters::new(0.0, 0.0);
        assert!(bad.validate().is_err());
        let nan = ItemParameters::new(f64::NAN, 0.0);
        assert!(nan.validate().is_err());
        let ok = ItemParameters::from_elo(1600.0);
        assert!(ok.validate().is_ok());
        assert!((ok.difficulty - 1.0).abs() < 1e-10);
    }
}
