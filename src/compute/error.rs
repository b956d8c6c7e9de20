//! Engine-level errors.

use std::io;

use super::indicator::SelectionError;
use crate::schema::ConfigError;

/// Errors surfaced by [`crate::compute::Mocma`].
#[derive(Debug, thiserror::Error)]
pub enum MocmaError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Covariance of individual {individual} is unusable in generation {generation}")]
    Numerical { generation: usize, individual: usize },
    #[error("Problem '{name}' has no bounded search space to sample from")]
    UnboundedProblem { name: String },
    #[error("Engine has no population, call init_with first")]
    NotInitialized,
    #[error("Selection ran out of candidates ({missing} short)")]
    DegenerateFront { missing: usize },
    #[error("Expected dimension {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SelectionError> for MocmaError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::DegenerateFront { missing } => MocmaError::DegenerateFront { missing },
        }
    }
}
