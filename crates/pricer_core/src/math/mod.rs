//! Mathematical utilities for the tape foundation.
//!
//! This module provides:
//! - [`comparison`]: "close enough" floating-point comparison
//! - [`distributions`]: standard normal CDF and density
//! - [`smoothing`]: logistic step functions for indicator derivatives
//! - [`linalg`]: least squares and PCA coordinate transforms
//! - [`basis`]: multi-dimensional polynomial basis systems

pub mod basis;
pub mod comparison;
pub mod distributions;
pub mod linalg;
pub mod smoothing;
