//! Core types for the tape foundation.
//!
//! - [`RandomVariable`]: a vector of Monte Carlo samples that may be
//!   deterministic (one broadcast value) or stochastic (one value per path)
//! - [`MathError`]: structured numerical errors

pub mod error;
pub mod random_variable;

pub use error::MathError;
pub use random_variable::RandomVariable;
