//! Multi-factor priority ranking: intrinsic item value (FRE), cost
//! from difficulty and component profile, memory urgency, and the
//! prerequisite chain, combined into a deterministic ranked queue.

pub mod cost;
pub mod engine;
pub mod fre;

pub use cost::{item_cost, ComponentVector};
pub use engine::{
    urgency, LearnableItem, LearnerState, PriorityEngine, PriorityRecord, QueueItem,
};
pub use fre::FreScore;
