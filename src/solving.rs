//! Clearing solver configuration and diagnostics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClearingError;

/// Iteration scheme used to find the clearing payment vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClearingMethod {
    /// Default-detection sweep that stops once the payment vector repeats exactly.
    #[default]
    Standard,
    /// Fixed-point iteration that stops once the update norm falls below the tolerance.
    Iterate,
}

impl ClearingMethod {
    /// Tag accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ClearingMethod::Standard => "Standard",
            ClearingMethod::Iterate => "Iterate",
        }
    }
}

impl fmt::Display for ClearingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClearingMethod {
    type Err = ClearingError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "Standard" => Ok(ClearingMethod::Standard),
            "Iterate" => Ok(ClearingMethod::Iterate),
            other => Err(ClearingError::invalid_method(other)),
        }
    }
}

/// Configuration for the clearing fixed-point solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Which iteration scheme to run.
    pub method: ClearingMethod,
    /// Maximum number of iterations before giving up; only `Iterate` reads it.
    pub max_iterations: usize,
    /// Euclidean norm tolerance on the payment update; only `Iterate` reads it.
    pub tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            method: ClearingMethod::Standard,
            max_iterations: 500,
            tolerance: 1e-4,
        }
    }
}

impl SolverOptions {
    /// Builds options from all three knobs at once.
    pub fn new(method: ClearingMethod, max_iterations: usize, tolerance: f64) -> Self {
        Self {
            method,
            max_iterations: max_iterations.max(1),
            tolerance,
        }
    }

    /// Override the iteration scheme while preserving other defaults.
    pub fn with_method(mut self, method: ClearingMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the iteration cap used by [`ClearingMethod::Iterate`].
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Set the convergence tolerance used by [`ClearingMethod::Iterate`].
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Diagnostics returned alongside the clearing payment vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolveSummary {
    /// Algorithm that produced the payments.
    pub method: ClearingMethod,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Euclidean norm of the change in the final iteration.
    pub residual: f64,
    /// Whether the stopping rule was met before the iteration cap or a non-finite payment.
    pub converged: bool,
    /// Number of defaulted nodes observed at each iteration, in order.
    pub default_cascade: Vec<usize>,
}
