//! Error types for the regression model.

use pricer_core::types::MathError;
use thiserror::Error;

use crate::config::ConfigError;

/// Failure while building, training, applying or restoring a
/// [`RegressionModel`](super::RegressionModel).
#[derive(Debug, Error)]
pub enum RegressionError {
    /// `train` was called on a model that is already trained.
    #[error("regression model is already trained")]
    AlreadyTrained,

    /// `apply` was called before `train`.
    #[error("regression model is not trained")]
    NotTrained,

    /// A regressor time is not among the simulated path times.
    #[error("regressor time {0} not found in path times")]
    MissingPathTime(f64),

    /// A regressor state index is not available at a path time.
    #[error("state index {index} not available at time {time}")]
    MissingState {
        /// Path time
        time: f64,
        /// Model state index
        index: usize,
    },

    /// The regressor is empty but the regressand is not identically zero.
    #[error("regressand is not identically zero, but no regressor was built")]
    InconsistentRegressand,

    /// `apply` was called without any path data.
    #[error("paths are empty or have an empty first component")]
    EmptyPaths,

    /// Number of path rows and path times differ.
    #[error("got {paths} path rows for {times} path times")]
    PathTimesMismatch {
        /// Number of path rows
        paths: usize,
        /// Number of path times
        times: usize,
    },

    /// Numerical failure in PCA, basis evaluation or least squares.
    #[error("regression failed: {0}")]
    Math(#[from] MathError),

    /// Invalid regression settings.
    #[error("invalid regression settings: {0}")]
    Config(#[from] ConfigError),

    /// Model persistence failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
