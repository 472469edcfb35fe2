//! # pricer_core: Numeric Foundation for the Scripted-Payoff Tape
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core serves as the bottom layer of the tape architecture, providing:
//! - Vectorised Monte Carlo path variables (`types::random_variable`)
//! - "Close enough" floating-point comparison (`math::comparison`)
//! - Standard normal distribution functions (`math::distributions`)
//! - Logistic step smoothing used by indicator derivatives (`math::smoothing`)
//! - QR least squares and PCA coordinate transforms (`math::linalg`)
//! - Multi-dimensional polynomial basis systems (`math::basis`)
//! - Error types: `MathError` (`types::error`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other pricer_* crates, with minimal external dependencies:
//! - num-traits: Traits for generic numerical computation
//! - nalgebra: Dense QR / SVD / symmetric eigen-decomposition
//! - statrs: Complementary error function
//! - serde: Serialisation of basis descriptors and transforms
//! - tracing: Debug events for PCA reductions
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::math::comparison::close_enough;
//! use pricer_core::types::RandomVariable;
//!
//! let spot = RandomVariable::from_values(vec![8.0, 10.0, 12.0]);
//! let strike = RandomVariable::new(3, 10.0);
//! let intrinsic = (&spot - &strike).map(|x| x.max(0.0));
//!
//! assert_eq!(intrinsic.to_vec(), vec![0.0, 0.0, 2.0]);
//! assert!(close_enough(intrinsic.expectation().at(0), 2.0 / 3.0));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod types;
