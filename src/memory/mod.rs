//! Forgetting-curve memory model: per-item scheduling state, the
//! review update rule, and the correctness+latency -> rating mapping.

pub mod fsrs;
pub mod rating;

pub use fsrs::{
    card_retrievability, interval_days, is_mastered, mastery_stage, retrievability_at, schedule,
    CardState, MemoryCard, Rating, ScheduleResult,
};
pub use rating::derive_rating;
