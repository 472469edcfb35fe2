//! # Computation Graph
//!
//! Append-only expression IR recorded by a payoff script interpreter and
//! replayed by forward executors and adjoint drivers.
//!
//! ## Module Structure
//!
//! - `types`: [`ComputationGraph`], node ids and the missing-variable policy
//! - `red_block`: checkpoint region bookkeeping ([`RedBlock`])
//! - [`builder`]: simplifying constructors (`add`, `mult`, `max`, ...)
//! - `ssa`: debug listing ([`ssa_form`])
//! - `error`: [`GraphError`]
//!
//! ## Example
//!
//! ```rust
//! use pricer_tape::graph::{builder, ComputationGraph, MissingVariable};
//!
//! let mut g = ComputationGraph::new();
//! let spot = g.variable("Spot", MissingVariable::Create).unwrap();
//! let strike = g.constant(10.0);
//! let zero = g.constant(0.0);
//!
//! let diff = builder::subtract(&mut g, spot, strike, "").unwrap();
//! let payoff = builder::max(&mut g, diff, zero, "Payoff").unwrap();
//! g.set_variable("Payoff", payoff);
//!
//! assert_eq!(g.size(), 5);
//! assert!(g.predecessors(payoff).iter().all(|&p| p < payoff));
//! ```

pub mod builder;
mod error;
mod red_block;
mod ssa;
mod types;

pub use error::GraphError;
pub use red_block::RedBlock;
pub use ssa::ssa_form;
pub use types::{ComputationGraph, MissingVariable, NodeId, LEAF_OP};
