//! Error types for structured error handling.
//!
//! This module provides:
//! - `MathError`: Errors from least squares, coordinate transforms and basis systems

use thiserror::Error;

/// Categorised numerical errors.
///
/// Raised by the linear algebra and basis system helpers. Floating-point edge
/// cases (division by zero, logarithm of a non-positive number) are *not*
/// errors; they propagate as IEEE values.
///
/// # Examples
/// ```
/// use pricer_core::types::MathError;
///
/// let err = MathError::DimensionMismatch { expected: 3, got: 2 };
/// assert_eq!(format!("{}", err), "Dimension mismatch: expected 3, got 2");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    /// Two operands do not have compatible sizes.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },

    /// The least squares system could not be solved.
    #[error("Singular system: {0}")]
    SingularSystem(String),

    /// A basis system descriptor is inconsistent.
    #[error("Invalid basis system: {0}")]
    InvalidBasis(String),

    /// A variable that must be initialised was not.
    #[error("Uninitialised variable: {0}")]
    Uninitialised(String),
}
