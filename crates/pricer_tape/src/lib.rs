//! # pricer_tape: Scripted-Payoff Tape (L3: Engine)
//!
//! Infrastructure that lets payoff scripts be evaluated forward over Monte
//! Carlo paths and differentiated in reverse mode, with regression-based
//! conditional expectations for early exercise.
//!
//! This crate provides:
//! - An append-only computation graph with constant interning, eager
//!   algebraic simplification and red-block (checkpoint region) bookkeeping
//!   (`graph`)
//! - Forward evaluators and node requirement descriptors per operation
//!   (`ops::OpTable`)
//! - Local adjoint rules per operation (`ops::GradientTable`)
//! - A trainable, persistable AMC regression model (`regression`)
//! - Table configuration with validation (`config`)
//!
//! ## Design Principles
//!
//! - **Dense op codes** index arrays of boxed `Send + Sync` closures
//! - **Explicit liveness**: every node records its last consumer at insertion
//! - **Typed errors** for programmer misuse; numerical edge cases propagate
//!   as IEEE values
//!
//! ## Usage Example
//!
//! ```rust
//! use pricer_core::types::RandomVariable;
//! use pricer_tape::config::TapeConfig;
//! use pricer_tape::graph::{builder, ComputationGraph, MissingVariable};
//! use pricer_tape::ops::{OpCode, OpTable};
//!
//! let mut g = ComputationGraph::new();
//! let spot = g.variable("Spot", MissingVariable::Create).unwrap();
//! let strike = g.constant(10.0);
//! let zero = g.constant(0.0);
//! let diff = builder::subtract(&mut g, spot, strike, "").unwrap();
//! let payoff = builder::max(&mut g, diff, zero, "Payoff").unwrap();
//!
//! let config = TapeConfig::builder().sample_size(3).build().unwrap();
//! let table = OpTable::new(&config);
//!
//! let mut values: Vec<RandomVariable> = Vec::with_capacity(g.size());
//! for node in 0..g.size() {
//!     let value = match (g.constant_value(node), node) {
//!         (Some(c), _) => RandomVariable::new(3, c),
//!         (None, n) if n == spot => RandomVariable::from_values(vec![9.0, 10.0, 12.0]),
//!         _ => {
//!             let args: Vec<&RandomVariable> =
//!                 g.predecessors(node).iter().map(|&p| &values[p]).collect();
//!             table.evaluate_id(g.op_id(node), &args).unwrap()
//!         }
//!     };
//!     values.push(value);
//! }
//!
//! assert_eq!(values[payoff].to_vec(), vec![0.0, 0.0, 2.0]);
//! assert_eq!(g.op_id(payoff), usize::from(OpCode::Max));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod config;
pub mod graph;
pub mod ops;
pub mod regression;
