//! Red block (checkpoint region) bookkeeping.
//!
//! A red block is a contiguous range of tape nodes that an adjoint driver can
//! recompute instead of storing. Besides its range, each block remembers the
//! nodes *outside* of it that its nodes read from: these are the values that
//! must be kept alive to replay the block.

use std::collections::BTreeSet;

use super::NodeId;

/// A recorded red block.
///
/// # Example
///
/// ```rust
/// use pricer_tape::graph::ComputationGraph;
///
/// let mut g = ComputationGraph::new();
/// let x = g.insert_leaf("x");
/// g.start_red_block();
/// let y = g.insert_op(&[x, x], 4, "y").unwrap();
/// g.end_red_block().unwrap();
///
/// let block = &g.red_blocks()[0];
/// assert_eq!(block.range(), (1, Some(2)));
/// assert!(block.contains(y));
/// assert!(block.dependencies().contains(&x));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedBlock {
    id: usize,
    start: NodeId,
    end: Option<NodeId>,
    dependencies: BTreeSet<NodeId>,
}

impl RedBlock {
    pub(crate) fn open(id: usize, start: NodeId) -> Self {
        Self {
            id,
            start,
            end: None,
            dependencies: BTreeSet::new(),
        }
    }

    pub(crate) fn close(&mut self, end: NodeId) {
        self.end = Some(end);
    }

    pub(crate) fn add_dependency(&mut self, node: NodeId) {
        self.dependencies.insert(node);
    }

    /// Region id (1-based; 0 is reserved for "no region").
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Half-open node range `[start, end)`; `end` is `None` while the block
    /// is still open.
    #[inline]
    pub fn range(&self) -> (NodeId, Option<NodeId>) {
        (self.start, self.end)
    }

    /// Returns `true` once the block has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.end.is_some()
    }

    /// Number of nodes recorded in a closed block.
    pub fn len(&self) -> Option<usize> {
        self.end.map(|end| end - self.start)
    }

    /// Returns `true` if `node` lies inside a closed block's range.
    pub fn contains(&self, node: NodeId) -> bool {
        match self.end {
            Some(end) => (self.start..end).contains(&node),
            None => node >= self.start,
        }
    }

    /// Nodes outside this block referenced by nodes inside it.
    pub fn dependencies(&self) -> &BTreeSet<NodeId> {
        &self.dependencies
    }
}
