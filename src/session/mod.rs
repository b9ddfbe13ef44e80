//! Session composition under a cognitive-load budget: candidate
//! scoring, greedy admission, interleaving strategies, break placement
//! and efficiency prediction.

pub mod composer;
pub mod load;
pub mod strategy;

pub use composer::{
    ExclusionReason, LearnerSessionState, ScoredCandidate, SessionComposer, SessionConfig,
    SessionExclusion, SessionItemPlacement, SessionPlan, SessionPrediction,
};
pub use load::{base_load, item_load, sequenced_load, stage_multiplier};
pub use strategy::{select_strategy, InterleavingStrategy};
