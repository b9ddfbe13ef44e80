//! Component-level error clustering over a trailing response window,
//! plus cascade analysis: a deficit low in the component chain
//! (PHON -> MORPH -> LEX -> SYNT -> PRAG) predictably produces errors
//! in the layers above it, so co-elevated layers are attributed to the
//! most upstream one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BottleneckConfig;
use crate::types::{ComponentType, ResponseEvent};

/// Error-rate signal for one skill component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckEvidence {
    pub component: ComponentType,
    pub error_rate: f64,
    pub response_count: usize,
    pub error_count: usize,
    /// Other components elevated in the same window.
    pub co_occurring: Vec<ComponentType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeRootCause {
    pub component: ComponentType,
    pub confidence: f64,
    /// Downstream components whose errors the root cause explains.
    pub affected: Vec<ComponentType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckAnalysis {
    /// Number of responses actually analyzed after windowing.
    pub window_len: usize,
    pub bottlenecks: Vec<BottleneckEvidence>,
    pub root_cause: Option<CascadeRootCause>,
}

impl BottleneckAnalysis {
    pub fn is_bottleneck(&self, component: ComponentType) -> bool {
        self.bottlenecks.iter().any(|b| b.component == component)
    }

    /// Urgency boost for items of the root-cause component, scaled by
    /// attribution confidence. Zero for everything else.
    pub fn urgency_boost(&self, component: ComponentType, config: &BottleneckConfig) -> f64 {
        match &self.root_cause {
            Some(root) if root.component == component => config.root_cause_boost * root.confidence,
            _ => 0.0,
        }
    }

    /// Extra prerequisite pressure for items whose component sits
    /// downstream of the detected root cause.
    pub fn prerequisite_boost(&self, component: ComponentType, config: &BottleneckConfig) -> f64 {
        match &self.root_cause {
            Some(root) if component.upstream().contains(&root.component) => {
                config.root_cause_boost * root.confidence
            }
            _ => 0.0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ComponentStats {
    errors: usize,
    total: usize,
}

impl ComponentStats {
    fn error_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.errors as f64 / self.total as f64
        }
    }
}

/// Analyzes the trailing window of a chronological response stream.
/// Sparse input produces an empty analysis, never an error.
pub fn analyze(responses: &[ResponseEvent], config: &BottleneckConfig) -> BottleneckAnalysis {
    if responses.is_empty() || config.window_size == 0 {
        return BottleneckAnalysis::default();
    }

    let start = responses.len().saturating_sub(config.window_size);
    let window = &responses[start..];

    let mut stats: BTreeMap<ComponentType, ComponentStats> = BTreeMap::new();
    for event in window {
        let entry = stats.entry(event.component).or_default();
        entry.total += 1;
        if !event.is_correct {
            entry.errors += 1;
        }
    }

    let elevated: Vec<ComponentType> = ComponentType::ORDER
        .iter()
        .copied()
        .filter(|c| {
            stats.get(c).is_some_and(|s| {
                s.total >= config.min_responses_per_type
                    && s.error_rate() >= config.cascade_elevation_threshold
            })
        })
        .collect();

    let mut bottlenecks: Vec<BottleneckEvidence> = ComponentType::ORDER
        .iter()
        .copied()
        .filter_map(|c| {
            let s = stats.get(&c)?;
            if s.total < config.min_responses_per_type
                || s.error_rate() <= config.error_rate_threshold
            {
                return None;
            }
            Some(BottleneckEvidence {
                component: c,
                error_rate: s.error_rate(),
                response_count: s.total,
                error_count: s.errors,
                co_occurring: elevated.iter().copied().filter(|&o| o != c).collect(),
            })
        })
        .collect();
    bottlenecks.sort_by(|a, b| {
        b.error_rate
            .partial_cmp(&a.error_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.component.cmp(&b.component))
    });

    let root_cause = find_root_cause(&elevated, &stats, config);

    BottleneckAnalysis {
        window_len: window.len(),
        bottlenecks,
        root_cause,
    }
}

/// Walks the chain upstream-first: the first elevated component with
/// at least one elevated downstream dependent is the root cause.
fn find_root_cause(
    elevated: &[ComponentType],
    stats: &BTreeMap<ComponentType, ComponentStats>,
    config: &BottleneckConfig,
) -> Option<CascadeRootCause> {
    for &candidate in elevated {
        let affected: Vec<ComponentType> = candidate
            .downstream()
            .iter()
            .copied()
            .filter(|c| elevated.contains(c))
            .collect();
        if affected.is_empty() {
            continue;
        }

        let up = stats.get(&candidate).copied().unwrap_or_default();
        let downstream_mean = affected
            .iter()
            .map(|c| stats.get(c).copied().unwrap_or_default().error_rate())
            .sum::<f64>()
            / affected.len() as f64;
        let sample_factor =
            (up.total as f64 / (2 * config.min_responses_per_type.max(1)) as f64).min(1.0);

        let confidence =
            (0.5 * up.error_rate() + 0.3 * downstream_mean + 0.2 * sample_factor).clamp(0.0, 1.0);

        return Some(CascadeRootCause {
            component: candidate,
            confidence,
            affected,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn events(spec: &[(ComponentType, usize, usize)]) -> Vec<ResponseEvent> {
        // spec: (component, errors, correct)
        let now = Utc::now();
        let mut out = Vec::new();
        for &(component, errors, correct) in spec {
            for i in 0..errors {
                out.push(ResponseEvent::new(
                    format!("{}-e{}", component.as_str(), i),
                    component,
                    false,
                    4000,
                    now,
                ));
            }
            for i in 0..correct {
                out.push(ResponseEvent::new(
                    format!("{}-c{}", component.as_str(), i),
                    component,
                    true,
                    2500,
                    now,
                ));
            }
        }
        out
    }

    #[test]
    fn test_empty_stream_yields_empty_analysis() {
        let analysis = analyze(&[], &BottleneckConfig::default());
        assert!(analysis.bottlenecks.is_empty());
        assert!(analysis.root_cause.is_none());
    }

    #[test]
    fn test_too_few_responses_not_flagged() {
        let config = BottleneckConfig::default();
        // 3 of 4 wrong but below min_responses_per_type=5.
        let analysis = analyze(&events(&[(ComponentType::Lexis, 3, 1)]), &config);
        assert!(analysis.bottlenecks.is_empty());
    }

    #[test]
    fn test_high_error_component_flagged() {
        let config = BottleneckConfig::default();
        let analysis = analyze(
            &events(&[
                (ComponentType::Lexis, 6, 4),
                (ComponentType::Syntax, 1, 9),
            ]),
            &config,
        );
        assert_eq!(analysis.bottlenecks.len(), 1);
        let evidence = &analysis.bottlenecks[0];
        assert_eq!(evidence.component, ComponentType::Lexis);
        assert!((evidence.error_rate - 0.6).abs() < 1e-9);
        assert_eq!(evidence.response_count, 10);
    }

    #[test]
    fn test_cascade_attributes_upstream_root() {
        let config = BottleneckConfig::default();
        let analysis = analyze(
            &events(&[
                (ComponentType::Morphology, 5, 5),
                (ComponentType::Syntax, 4, 6),
                (ComponentType::Phonology, 0, 10),
            ]),
            &config,
        );
        let root = analysis.root_cause.expect("cascade expected");
        assert_eq!(root.component, ComponentType::Morphology);
        assert!(root.affected.contains(&ComponentType::Syntax));
        assert!(root.confidence > 0.0 && root.confidence <= 1.0);
    }

    #[test]
    fn test_isolated_elevation_has_no_root_cause() {
        let config = BottleneckConfig::default();
        let analysis = analyze(
            &events(&[
                (ComponentType::Pragmatics, 5, 5),
                (ComponentType::Lexis, 0, 10),
            ]),
            &config,
        );
        assert!(analysis.root_cause.is_none());
    }

    #[test]
    fn test_trailing_window_drops_old_events() {
        let mut config = BottleneckConfig::default();
        config.window_size = 10;
        // Errors first, then a long run of correct answers: only the
        // correct tail is inside the window.
        let mut stream = events(&[(ComponentType::Lexis, 8, 0)]);
        stream.extend(events(&[(ComponentType::Lexis, 0, 10)]));
        let analysis = analyze(&stream, &config);
        assert_eq!(analysis.window_len, 10);
        assert!(analysis.bottlenecks.is_empty());
    }

    #[test]
    fn test_boosts_target_root_and_downstream() {
        let config = BottleneckConfig::default();
        let analysis = analyze(
            &events(&[
                (ComponentType::Morphology, 5, 5),
                (ComponentType::Syntax, 4, 6),
            ]),
            &config,
        );
        assert!(analysis.urgency_boost(ComponentType::Morphology, &config) > 0.0);
        assert_eq!(analysis.urgency_boost(ComponentType::Lexis, &config), 0.0);
        assert!(analysis.prerequisite_boost(ComponentType::Syntax, &config) > 0.0);
        assert_eq!(
            analysis.prerequisite_boost(ComponentType::Phonology, &config),
            0.0
        );
    }
}
