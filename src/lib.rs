//! Adaptive learning scheduling core: forgetting-curve memory
//! scheduling, latent-ability (IRT) estimation, multi-factor priority
//! ranking, bottleneck/cascade detection, and cognitive-load-bounded
//! session composition.
//!
//! The crate is a pure computation library: callers own persistence
//! and thread explicit state values (`MemoryCard`, `ThetaEstimate`,
//! item parameters) through every call. Nothing here touches I/O.

pub mod ability;
pub mod bottleneck;
pub mod cache;
pub mod config;
pub mod error;
pub mod fatigue;
pub mod memory;
pub mod priority;
pub mod session;
pub mod types;

pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use types::{ComponentType, Estimate, ProficiencyLevel, ResponseEvent};
