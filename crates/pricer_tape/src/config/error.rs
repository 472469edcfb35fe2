//! Error types for tape configuration.
//!
//! Raised when a [`TapeConfig`](super::TapeConfig) or
//! [`RegressionSettings`](crate::regression::RegressionSettings) is built
//! with invalid parameters.

use std::fmt;

/// Configuration error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Sample size must be at least 1.
    InvalidSampleSize(usize),
    /// Regression order must be at least 1.
    InvalidRegressionOrder(usize),
    /// Invalid parameter value with name and description.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSampleSize(size) => {
                write!(f, "Invalid sample size {}: must be at least 1", size)
            }
            Self::InvalidRegressionOrder(order) => {
                write!(f, "Invalid regression order {}: must be at least 1", order)
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid parameter '{}': {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
