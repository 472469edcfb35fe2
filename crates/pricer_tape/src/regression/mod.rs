//! # AMC Regression Model
//!
//! Conditional expectation estimates for American Monte Carlo: a
//! [`RegressionModel`] selects a regressor from simulated model state,
//! optionally compresses it with PCA, fits basis function coefficients on a
//! training batch and evaluates the fitted approximation on later batches.
//!
//! ## Module Structure
//!
//! - `layout`: [`StateLayout`] seam to the cross-asset model
//! - `settings`: [`RegressionSettings`] and its builder
//! - `model`: [`RegressionModel`], [`CashflowInfo`], [`RegressorKey`]
//! - `error`: [`RegressionError`]

mod error;
mod layout;
mod model;
mod settings;

pub use error::RegressionError;
pub use layout::{AssetClass, SimpleStateLayout, StateLayout};
pub use model::{CashflowInfo, RegressionModel, RegressorKey};
pub use settings::{RegressionSettings, RegressionSettingsBuilder, RegressorModel, VarGroupMode};
