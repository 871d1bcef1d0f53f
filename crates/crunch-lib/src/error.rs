//! Typed errors raised by the scoring and regression engine

use thiserror::Error;

/// Errors raised by curve fitting, scoring, training and the record stores
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScorerError {
    #[error("dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("value outside the function domain: {0}")]
    InvalidDomain(String),

    #[error("degenerate fit: {0}")]
    DivisionByZero(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("studio not found: {name} (tried {tried} names)")]
    StudioNotFound { name: String, tried: usize },

    #[error("logistic regression did not converge within {iterations} iterations")]
    ConvergenceFailure { iterations: usize },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

impl ScorerError {
    /// Whether the error only affects a single record or studio and the
    /// surrounding batch can carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScorerError::StudioNotFound { .. }
                | ScorerError::ModelNotFound(_)
                | ScorerError::MalformedRecord { .. }
                | ScorerError::InsufficientData(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScorerError>;
