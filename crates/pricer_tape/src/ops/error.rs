//! Error types for operation and gradient evaluation.

use pricer_core::types::MathError;
use thiserror::Error;

use super::opcode::{Arity, OpCode};

/// Failure while evaluating an operation or its local derivatives.
///
/// Numerical edge cases (division by zero, logarithm of a negative number)
/// are not errors; they propagate as IEEE values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    /// An op id outside the built-in table.
    #[error("unknown op id {0}")]
    UnknownOp(usize),

    /// Wrong number of arguments for an operation.
    #[error("{op}: expected {expected} arguments, got {got}")]
    ArityMismatch {
        /// Operation
        op: OpCode,
        /// Accepted argument count
        expected: Arity,
        /// Supplied argument count
        got: usize,
    },

    /// Initialised arguments disagree on the number of paths.
    #[error("{op}: arguments have {expected} and {got} paths")]
    SizeMismatch {
        /// Operation
        op: OpCode,
        /// Sample count of the first initialised argument
        expected: usize,
        /// First differing sample count
        got: usize,
    },

    /// The operation has no gradient rule; a reverse sweep must abort.
    #[error("gradient of {0} is not supported")]
    GradientNotSupported(OpCode),

    /// A regression inside a conditional expectation failed.
    #[error("regression failed: {0}")]
    Regression(#[from] MathError),
}
