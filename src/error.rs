use thiserror::Error;

use crate::solving::ClearingMethod;

/// Unified error type for `enclear` operations.
#[derive(Debug, Error)]
pub enum ClearingError {
    /// Raised when asset vectors or liability matrices have incompatible dimensions.
    #[error("shape mismatch in {context}: expected {expected} but found {found}")]
    ShapeMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension, usually the node count.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when a solve-method tag is not recognised.
    #[error("unknown clearing method `{method}`; must be Standard or Iterate")]
    InvalidMethod { method: String },

    /// Raised on request when the payment iteration stopped before settling.
    #[error(
        "{method} clearing did not converge after {iterations} iterations; last residual {residual}"
    )]
    NonConvergence {
        /// Algorithm that was running.
        method: ClearingMethod,
        /// Number of iterations performed before termination.
        iterations: usize,
        /// Euclidean norm of the last payment update.
        residual: f64,
    },

    /// Raised when a configuration parameter is outside its valid range.
    #[error("invalid value {value} for `{parameter}`")]
    InvalidConfig { parameter: &'static str, value: f64 },
}

impl ClearingError {
    /// Helper to format a [`ShapeMismatch`](ClearingError::ShapeMismatch) error.
    pub fn shape_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper for rejecting an unrecognised method tag.
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod {
            method: method.into(),
        }
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, ClearingError>;
