//! Cognitive load estimation: a unitless 1-10 burden per practiced
//! item, from a type-based base load scaled by mastery stage. The
//! consecutive-same-type penalty is applied at ordering time.

use crate::types::ComponentType;

const LOAD_MIN: f64 = 1.0;
const LOAD_MAX: f64 = 10.0;

/// Base processing burden by component type. Higher layers integrate
/// more sub-skills per attempt.
pub fn base_load(component: ComponentType) -> f64 {
    match component {
        ComponentType::Phonology => 3.0,
        ComponentType::Lexis => 4.0,
        ComponentType::Morphology => 5.0,
        ComponentType::Syntax => 6.0,
        ComponentType::Pragmatics => 7.0,
    }
}

/// Unmastered material costs more working memory; automated material
/// costs less.
pub fn stage_multiplier(mastery_stage: u8) -> f64 {
    match mastery_stage {
        0 => 1.4,
        1 => 1.2,
        2 => 1.0,
        3 => 0.8,
        _ => 0.6,
    }
}

pub fn item_load(component: ComponentType, mastery_stage: u8) -> f64 {
    (base_load(component) * stage_multiplier(mastery_stage)).clamp(LOAD_MIN, LOAD_MAX)
}

/// Load including the repetition penalty for an item whose type
/// matches the immediately preceding placement.
pub fn sequenced_load(
    component: ComponentType,
    mastery_stage: u8,
    previous: Option<ComponentType>,
    repeat_penalty: f64,
) -> f64 {
    let mut load = item_load(component, mastery_stage);
    if previous == Some(component) {
        load += repeat_penalty;
    }
    load.clamp(LOAD_MIN, LOAD_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_always_in_range() {
        for component in ComponentType::ORDER {
            for stage in 0..=4 {
                let load = item_load(component, stage);
                assert!((1.0..=10.0).contains(&load));
            }
        }
    }

    #[test]
    fn test_new_items_heavier_than_mastered() {
        let new = item_load(ComponentType::Syntax, 0);
        let mastered = item_load(ComponentType::Syntax, 4);
        assert!(new > mastered);
    }

    #[test]
    fn test_repeat_penalty_applies_only_on_same_type() {
        let alone = sequenced_load(ComponentType::Lexis, 2, None, 1.0);
        let after_other = sequenced_load(
            ComponentType::Lexis,
            2,
            Some(ComponentType::Syntax),
            1.0,
        );
        let after_same = sequenced_load(
            ComponentType::Lexis,
            2,
            Some(ComponentType::Lexis),
            1.0,
        );
        assert_eq!(alone, after_other);
        assert!(after_same > alone);
    }
}
