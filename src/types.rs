use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Skill components in fixed dependency order: lower layers feed the
/// ones above them (PHON -> MORPH -> LEX -> SYNT -> PRAG).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Phonology,
    Morphology,
    Lexis,
    Syntax,
    Pragmatics,
}

impl ComponentType {
    pub const ORDER: [ComponentType; 5] = [
        Self::Phonology,
        Self::Morphology,
        Self::Lexis,
        Self::Syntax,
        Self::Pragmatics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phonology => "phonology",
            Self::Morphology => "morphology",
            Self::Lexis => "lexis",
            Self::Syntax => "syntax",
            Self::Pragmatics => "pragmatics",
        }
    }

    /// Position in the dependency chain, 0 = most upstream.
    pub fn layer(&self) -> usize {
        Self::ORDER.iter().position(|c| c == self).unwrap_or(0)
    }

    /// Components strictly below this one in the chain.
    pub fn upstream(&self) -> &'static [ComponentType] {
        &Self::ORDER[..self.layer()]
    }

    /// Components strictly above this one in the chain.
    pub fn downstream(&self) -> &'static [ComponentType] {
        &Self::ORDER[self.layer() + 1..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ProficiencyLevel {
    A1,
    #[default]
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl ProficiencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "a1",
            Self::A2 => "a2",
            Self::B1 => "b1",
            Self::B2 => "b2",
            Self::C1 => "c1",
            Self::C2 => "c2",
        }
    }

    pub fn is_beginner(&self) -> bool {
        matches!(self, Self::A1 | Self::A2)
    }
}

/// One graded attempt, as handed over by the response-evaluation
/// boundary. The core never parses free-text answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEvent {
    pub item_id: String,
    pub component: ComponentType,
    pub is_correct: bool,
    pub cue_level: u8,
    pub response_time_ms: i64,
    pub timestamp: DateTime<Utc>,
}

impl ResponseEvent {
    pub fn new(
        item_id: impl Into<String>,
        component: ComponentType,
        is_correct: bool,
        response_time_ms: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            component,
            is_correct,
            cue_level: 0,
            response_time_ms,
            timestamp,
        }
    }
}

/// Result of an estimator that can decline on sparse data. Callers must
/// handle the insufficient branch explicitly; it is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum Estimate<T> {
    Insufficient { reason: String },
    Computed(T),
}

impl<T> Estimate<T> {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        Self::Insufficient {
            reason: reason.into(),
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub fn computed(self) -> Option<T> {
        match self {
            Self::Computed(v) => Some(v),
            Self::Insufficient { .. } => None,
        }
    }

    pub fn as_computed(&self) -> Option<&T> {
        match self {
            Self::Computed(v) => Some(v),
            Self::Insufficient { .. } => None,
        }
    }
}

pub(crate) fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let ms = (to - from).num_milliseconds();
    (ms as f64 / 86_400_000.0).max(0.0)
}
