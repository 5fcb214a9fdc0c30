use thiserror::Error;

/// Errors surfaced by training, inference and model persistence.
#[derive(Debug, Error)]
pub enum LatentRecError {
    /// Caller supplied input the model cannot accept. Raised before any state is mutated.
    #[error("Precondition violation: {message}")]
    PreconditionViolation { message: String },

    /// The computation produced no usable number (empty error set, diverged parameters).
    #[error("Numerical degeneracy: {message}")]
    NumericalDegenerate { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl LatentRecError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            message: message.into(),
        }
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::NumericalDegenerate {
            message: message.into(),
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::PreconditionViolation { .. })
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::NumericalDegenerate { .. })
    }
}

pub type Result<T> = std::result::Result<T, LatentRecError>;
