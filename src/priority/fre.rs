//! FRE: the three-factor intrinsic value of a learnable item —
//! frequency, relational density, and contextual contribution, each
//! normalized to [0, 1] upstream.

use serde::{Deserialize, Serialize};

use crate::config::{FreWeights, PriorityConfig};
use crate::types::ProficiencyLevel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FreScore {
    pub frequency: f64,
    pub relational_density: f64,
    pub contextual_contribution: f64,
}

impl FreScore {
    pub fn new(frequency: f64, relational_density: f64, contextual_contribution: f64) -> Self {
        Self {
            frequency,
            relational_density,
            contextual_contribution,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            frequency: self.frequency.clamp(0.0, 1.0),
            relational_density: self.relational_density.clamp(0.0, 1.0),
            contextual_contribution: self.contextual_contribution.clamp(0.0, 1.0),
        }
    }

    /// Weighted composite in [0, 1] for normalized weights.
    pub fn composite(&self, weights: &FreWeights) -> f64 {
        let s = self.clamped();
        weights.frequency * s.frequency
            + weights.relational_density * s.relational_density
            + weights.contextual_contribution * s.contextual_contribution
    }
}

/// Beginners weight raw frequency heaviest; advanced learners shift
/// toward contextual contribution.
pub fn weights_for_level<'a>(config: &'a PriorityConfig, level: ProficiencyLevel) -> &'a FreWeights {
    if level.is_beginner() {
        &config.beginner_weights
    } else {
        &config.advanced_weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_monotone_in_each_factor() {
        let weights = FreWeights::beginner();
        let base = FreScore::new(0.4, 0.4, 0.4);
        let more_freq = FreScore::new(0.6, 0.4, 0.4);
        let more_rel = FreScore::new(0.4, 0.6, 0.4);
        let more_ctx = FreScore::new(0.4, 0.4, 0.6);
        assert!(more_freq.composite(&weights) > base.composite(&weights));
        assert!(more_rel.composite(&weights) > base.composite(&weights));
        assert!(more_ctx.composite(&weights) > base.composite(&weights));
    }

    #[test]
    fn test_out_of_range_inputs_clamped() {
        let score = FreScore::new(1.7, -0.2, 0.5);
        assert_eq!(score.frequency, 1.0);
        assert_eq!(score.relational_density, 0.0);
    }

    #[test]
    fn test_level_dependent_weighting() {
        let config = PriorityConfig::default();
        let frequency_heavy = FreScore::new(0.9, 0.1, 0.1);
        let context_heavy = FreScore::new(0.1, 0.1, 0.9);

        let beginner = weights_for_level(&config, ProficiencyLevel::A1);
        let advanced = weights_for_level(&config, ProficiencyLevel::C1);

        assert!(frequency_heavy.composite(beginner) > frequency_heavy.composite(advanced));
        assert!(context_heavy.composite(advanced) > context_heavy.composite(beginner));
    }
}
