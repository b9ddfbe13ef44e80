//! Acquisition cost of an item: a base cost from IRT difficulty,
//! shaped by a component-specific profile when one is available.

use serde::{Deserialize, Serialize};

use crate::types::ComponentType;

const MODIFIER_MIN: f64 = 0.5;
const MODIFIER_MAX: f64 = 2.0;

/// Component-specific acquisition profile. One variant per skill
/// component; the cost computation matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "component")]
pub enum ComponentVector {
    Phonology {
        /// 0 = fully regular sound pattern, 1 = highly irregular.
        irregularity: f64,
        is_cognate: bool,
    },
    Morphology {
        /// 0 = frozen form, 1 = fully productive pattern.
        productivity: f64,
        family_size: u32,
    },
    Lexis {
        concreteness: f64,
        polysemy: u32,
    },
    Syntax {
        complexity: f64,
        l1_parallel: bool,
    },
    Pragmatics {
        cultural_load: f64,
        usage_frequency: f64,
    },
}

impl ComponentVector {
    pub fn component(&self) -> ComponentType {
        match self {
            Self::Phonology { .. } => ComponentType::Phonology,
            Self::Morphology { .. } => ComponentType::Morphology,
            Self::Lexis { .. } => ComponentType::Lexis,
            Self::Syntax { .. } => ComponentType::Syntax,
            Self::Pragmatics { .. } => ComponentType::Pragmatics,
        }
    }

    /// Multiplicative cost modifier in [0.5, 2.0]. Irregularity,
    /// unproductive morphology and cultural load raise cost; cognate
    /// status, large families and an L1 parallel lower it.
    pub fn cost_modifier(&self) -> f64 {
        let raw = match self {
            Self::Phonology {
                irregularity,
                is_cognate,
            } => {
                let base = 1.0 + 0.6 * irregularity.clamp(0.0, 1.0);
                if *is_cognate {
                    base * 0.6
                } else {
                    base
                }
            }
            Self::Morphology {
                productivity,
                family_size,
            } => {
                let base = 1.0 + 0.5 * (1.0 - productivity.clamp(0.0, 1.0));
                base - (*family_size as f64 / 10.0).min(0.4)
            }
            Self::Lexis {
                concreteness,
                polysemy,
            } => {
                1.0 + 0.3 * (1.0 - concreteness.clamp(0.0, 1.0))
                    + 0.05 * (*polysemy).min(6) as f64
            }
            Self::Syntax {
                complexity,
                l1_parallel,
            } => {
                let base = 1.0 + 0.5 * complexity.clamp(0.0, 1.0);
                if *l1_parallel {
                    base - 0.3
                } else {
                    base
                }
            }
            Self::Pragmatics {
                cultural_load,
                usage_frequency,
            } => 1.0 + 0.7 * cultural_load.clamp(0.0, 1.0) - 0.2 * usage_frequency.clamp(0.0, 1.0),
        };
        raw.clamp(MODIFIER_MIN, MODIFIER_MAX)
    }
}

/// Cost from IRT difficulty b in [-3, 3], mapped to [0.5, 1.5] and
/// shaped by the component profile when present.
pub fn item_cost(difficulty: f64, vector: Option<&ComponentVector>) -> f64 {
    let base = 1.0 + difficulty.clamp(-3.0, 3.0) / 6.0;
    let modifier = vector.map(|v| v.cost_modifier()).unwrap_or(1.0);
    (base * modifier).max(0.1)
}
