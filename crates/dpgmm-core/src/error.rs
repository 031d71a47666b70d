//! Error kinds raised by the mixture engine.

use dpgmm_math::LinalgError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, MixtureError>;

/// Failures of the density estimator.
///
/// Samples on or outside the bounds are deliberately *not* represented here:
/// they flow through the probit map as non-finite coordinates and are only
/// logged.
#[derive(Debug, Error)]
pub enum MixtureError {
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid prior: {0}")]
    InvalidPrior(String),

    #[error("session has been sealed; call initialise() before reuse")]
    UseAfterBuild,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("hierarchical observation contains no draws")]
    EmptyEvent,

    #[error("draw bounds {found:?} differ from session bounds {expected:?}")]
    BoundsMismatch {
        expected: Vec<[f64; 2]>,
        found: Vec<[f64; 2]>,
    },

    #[error("covariance is not positive definite: {0}")]
    NotPositiveDefinite(String),

    #[error("invalid draw: {0}")]
    InvalidDraw(String),

    #[error("invalid samples: {0}")]
    InvalidSamples(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MixtureError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            MixtureError::InvalidBounds(_) => 70,
            MixtureError::DimensionMismatch { .. } => 71,
            MixtureError::InvalidPrior(_) => 72,
            MixtureError::UseAfterBuild => 73,
            MixtureError::UnsupportedOperation(_) => 74,
            MixtureError::EmptyEvent => 75,
            MixtureError::BoundsMismatch { .. } => 76,
            MixtureError::NotPositiveDefinite(_) => 77,
            MixtureError::InvalidDraw(_) => 78,
            MixtureError::Io { .. } => 79,
            MixtureError::Serialization(_) => 80,
            MixtureError::InvalidSamples(_) => 81,
        }
    }

    /// Whether the caller supplied bad input (as opposed to a numerical or
    /// environmental failure).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MixtureError::InvalidBounds(_)
                | MixtureError::DimensionMismatch { .. }
                | MixtureError::InvalidPrior(_)
                | MixtureError::EmptyEvent
                | MixtureError::BoundsMismatch { .. }
                | MixtureError::InvalidDraw(_)
                | MixtureError::InvalidSamples(_)
                | MixtureError::Serialization(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MixtureError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<LinalgError> for MixtureError {
    fn from(err: LinalgError) -> Self {
        match err {
            LinalgError::DimensionMismatch { expected, actual } => {
                MixtureError::DimensionMismatch { expected, actual }
            }
            other => MixtureError::NotPositiveDefinite(other.to_string()),
        }
    }
}
