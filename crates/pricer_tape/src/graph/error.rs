//! # Graph Error Types
//!
//! Errors raised while recording a computation graph.

use thiserror::Error;

use super::NodeId;

// =============================================================================
// GraphError Enumeration
// =============================================================================

/// Misuse of the [`ComputationGraph`](super::ComputationGraph) recording API.
///
/// # Example
///
/// ```rust
/// use pricer_tape::graph::{ComputationGraph, GraphError};
///
/// let mut g = ComputationGraph::new();
/// assert_eq!(g.end_red_block(), Err(GraphError::NoActiveRedBlock));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A variable was looked up with `MissingVariable::Fail` and is not bound.
    #[error("variable '{0}' not found")]
    VariableNotFound(String),

    /// `end_red_block` was called outside an active red block.
    #[error("not in an active red block")]
    NoActiveRedBlock,

    /// An operation referenced a node that does not exist yet.
    #[error("predecessor {predecessor} does not exist (graph size {size})")]
    InvalidPredecessor {
        /// Referenced node
        predecessor: NodeId,
        /// Graph size at insertion time
        size: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::VariableNotFound("notional".to_string());
        assert_eq!(err.to_string(), "variable 'notional' not found");

        let err = GraphError::InvalidPredecessor {
            predecessor: 7,
            size: 3,
        };
        assert!(err.to_string().contains("predecessor 7"));
    }
}
