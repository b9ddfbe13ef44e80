use thiserror::Error;

/// Hard failures. Only programmer errors surface here; sparse-data
/// conditions degrade to flagged defaults instead (see `Estimate`).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("non-finite value for {0}")]
    NonFinite(&'static str),

    #[error("mismatched lengths: {left} responses vs {right} items")]
    LengthMismatch { left: usize, right: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
