//! # Computation Graph Data Types
//!
//! The append-only tape recorded while a payoff script is interpreted.
//!
//! Nodes are identified by their insertion index. A node is either a leaf
//! (op id 0: free inputs, variables and constants) or an operation with an
//! ordered list of predecessors. Every predecessor index is strictly smaller
//! than the index of the node consuming it, so the insertion order is a
//! topological order and a forward sweep is a single pass over the indices.
//!
//! Op ids are plain integers; the operation table of the executor gives them
//! meaning (see [`OpCode`](crate::ops::OpCode) for the built-in set).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, trace};

use super::error::GraphError;
use super::red_block::RedBlock;

/// Index of a node in a [`ComputationGraph`].
pub type NodeId = usize;

/// Op id of leaf nodes.
pub const LEAF_OP: usize = 0;

// =============================================================================
// MissingVariable
// =============================================================================

/// What [`ComputationGraph::variable`] does when the name is not bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MissingVariable {
    /// Insert a fresh leaf and bind the name to it.
    #[default]
    Create,
    /// Return [`ComputationGraph::SENTINEL`].
    Sentinel,
    /// Return [`GraphError::VariableNotFound`].
    Fail,
}

// =============================================================================
// ComputationGraph
// =============================================================================

/// Append-only expression graph with constant interning, variable bindings
/// and red block regions.
///
/// # Example
///
/// ```rust
/// use pricer_tape::graph::{ComputationGraph, MissingVariable};
///
/// let mut g = ComputationGraph::new();
/// let spot = g.variable("Spot", MissingVariable::Create).unwrap();
/// let strike = g.constant(100.0);
/// let diff = g.insert_op(&[spot, strike], 2, "diff").unwrap();
///
/// assert_eq!(g.size(), 3);
/// assert_eq!(g.predecessors(diff), &[spot, strike]);
/// assert_eq!(g.max_node_requiring_arg(spot), diff);
/// assert_eq!(g.constant(100.0), strike);
/// ```
#[derive(Debug, Clone)]
pub struct ComputationGraph {
    predecessors: Vec<Vec<NodeId>>,
    op_id: Vec<usize>,
    max_node_requiring_arg: Vec<NodeId>,
    red_block_id: Vec<usize>,
    constant_value: Vec<Option<f64>>,

    constants: HashMap<u64, NodeId>,
    variables: BTreeMap<String, NodeId>,
    variable_version: HashMap<String, usize>,

    labels: BTreeMap<NodeId, BTreeSet<String>>,
    enable_labels: bool,

    red_blocks: Vec<RedBlock>,
    current_red_block: usize,
}

impl Default for ComputationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputationGraph {
    /// Returned by [`variable`](Self::variable) for unbound names under
    /// [`MissingVariable::Sentinel`].
    pub const SENTINEL: NodeId = NodeId::MAX;

    /// Creates an empty graph with labels enabled.
    pub fn new() -> Self {
        Self {
            predecessors: Vec::new(),
            op_id: Vec::new(),
            max_node_requiring_arg: Vec::new(),
            red_block_id: Vec::new(),
            constant_value: Vec::new(),
            constants: HashMap::new(),
            variables: BTreeMap::new(),
            variable_version: HashMap::new(),
            labels: BTreeMap::new(),
            enable_labels: true,
            red_blocks: Vec::new(),
            current_red_block: 0,
        }
    }

    /// Creates an empty graph with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut g = Self::new();
        g.predecessors.reserve(capacity);
        g.op_id.reserve(capacity);
        g.max_node_requiring_arg.reserve(capacity);
        g.red_block_id.reserve(capacity);
        g.constant_value.reserve(capacity);
        g
    }

    /// Number of nodes.
    #[inline]
    pub fn size(&self) -> usize {
        self.predecessors.len()
    }

    /// Returns `true` if no node has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.predecessors.is_empty()
    }

    /// Removes all nodes, constants, variables, labels and red blocks.
    ///
    /// The label switch is kept.
    pub fn clear(&mut self) {
        self.predecessors.clear();
        self.op_id.clear();
        self.max_node_requiring_arg.clear();
        self.red_block_id.clear();
        self.constant_value.clear();
        self.constants.clear();
        self.variables.clear();
        self.variable_version.clear();
        self.labels.clear();
        self.red_blocks.clear();
        self.current_red_block = 0;
    }

    // =========================================================================
    // Recording
    // =========================================================================

    fn push_node(&mut self, predecessors: Vec<NodeId>, op_id: usize, constant: Option<f64>) -> NodeId {
        let node = self.size();
        self.predecessors.push(predecessors);
        self.op_id.push(op_id);
        self.max_node_requiring_arg.push(0);
        self.red_block_id.push(self.current_red_block);
        self.constant_value.push(constant);
        node
    }

    fn add_label(&mut self, node: NodeId, label: String) {
        if self.enable_labels && !label.is_empty() {
            self.labels.entry(node).or_default().insert(label);
        }
    }

    /// Appends a free leaf node.
    pub fn insert_leaf(&mut self, label: &str) -> NodeId {
        let node = self.push_node(Vec::new(), LEAF_OP, None);
        self.add_label(node, label.to_string());
        node
    }

    /// Appends an operation node consuming `predecessors`.
    ///
    /// Updates the max consumer index of every predecessor and, inside an
    /// open red block, records predecessors from other regions as
    /// dependencies of the block.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidPredecessor`] if a predecessor is not an
    /// existing node; the graph is left unchanged.
    pub fn insert_op(
        &mut self,
        predecessors: &[NodeId],
        op_id: usize,
        label: &str,
    ) -> Result<NodeId, GraphError> {
        let size = self.size();
        if let Some(&predecessor) = predecessors.iter().find(|&&p| p >= size) {
            return Err(GraphError::InvalidPredecessor { predecessor, size });
        }

        let node = self.push_node(predecessors.to_vec(), op_id, None);
        for &p in predecessors {
            self.max_node_requiring_arg[p] = node;
        }
        if self.current_red_block != 0 {
            let outside: Vec<NodeId> = predecessors
                .iter()
                .copied()
                .filter(|&p| self.red_block_id[p] != self.current_red_block)
                .collect();
            if let Some(block) = self.red_blocks.last_mut() {
                for p in outside {
                    block.add_dependency(p);
                }
            }
        }
        self.add_label(node, label.to_string());
        trace!(node, op_id, args = predecessors.len(), "insert op");
        Ok(node)
    }

    /// Returns the node holding `value`, creating it on first use.
    ///
    /// `0.0` and `-0.0` share a node, as do all NaN payloads.
    pub fn constant(&mut self, value: f64) -> NodeId {
        let key = constant_key(value);
        if let Some(&node) = self.constants.get(&key) {
            return node;
        }
        let node = self.push_node(Vec::new(), LEAF_OP, Some(value));
        self.constants.insert(key, node);
        self.add_label(node, value.to_string());
        node
    }

    /// Node of an already interned constant.
    pub fn constant_node(&self, value: f64) -> Option<NodeId> {
        self.constants.get(&constant_key(value)).copied()
    }

    /// Number of distinct interned constants.
    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    /// Node currently bound to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::VariableNotFound`] for an unbound name under
    /// [`MissingVariable::Fail`].
    pub fn variable(&mut self, name: &str, missing: MissingVariable) -> Result<NodeId, GraphError> {
        if let Some(&node) = self.variables.get(name) {
            return Ok(node);
        }
        match missing {
            MissingVariable::Create => {
                let node = self.push_node(Vec::new(), LEAF_OP, None);
                self.variables.insert(name.to_string(), node);
                self.variable_version.insert(name.to_string(), 0);
                self.label_new_version(name, node);
                Ok(node)
            }
            MissingVariable::Sentinel => Ok(Self::SENTINEL),
            MissingVariable::Fail => Err(GraphError::VariableNotFound(name.to_string())),
        }
    }

    /// Binds `name` to `node`.
    ///
    /// Rebinding to a different node advances the variable's version, which
    /// shows up in the node label as `name(vN)`.
    pub fn set_variable(&mut self, name: &str, node: NodeId) {
        match self.variables.get_mut(name) {
            Some(bound) if *bound == node => {}
            Some(bound) => {
                *bound = node;
                self.label_new_version(name, node);
            }
            None => {
                self.variables.insert(name.to_string(), node);
                self.variable_version.insert(name.to_string(), 0);
                self.label_new_version(name, node);
            }
        }
    }

    fn label_new_version(&mut self, name: &str, node: NodeId) {
        let version = self.variable_version.entry(name.to_string()).or_insert(0);
        *version += 1;
        let label = format!("{}(v{})", name, version);
        self.add_label(node, label);
    }

    /// Current variable bindings.
    pub fn variables(&self) -> &BTreeMap<String, NodeId> {
        &self.variables
    }

    /// Turns label recording on or off for subsequent insertions.
    pub fn enable_labels(&mut self, enable: bool) {
        self.enable_labels = enable;
    }

    /// Labels recorded so far.
    pub fn labels(&self) -> &BTreeMap<NodeId, BTreeSet<String>> {
        &self.labels
    }

    // =========================================================================
    // Red blocks
    // =========================================================================

    /// Opens a new red block at the current size.
    ///
    /// An already open block is closed at the current size first.
    pub fn start_red_block(&mut self) {
        let size = self.size();
        if let Some(previous) = self.red_blocks.last_mut() {
            if !previous.is_closed() {
                previous.close(size);
            }
        }
        let id = self.red_blocks.len() + 1;
        self.red_blocks.push(RedBlock::open(id, size));
        self.current_red_block = id;
        debug!(id, start = size, "red block started");
    }

    /// Closes the active red block at the current size.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NoActiveRedBlock`] if no block is open.
    pub fn end_red_block(&mut self) -> Result<(), GraphError> {
        if self.current_red_block == 0 {
            return Err(GraphError::NoActiveRedBlock);
        }
        let size = self.size();
        if let Some(block) = self.red_blocks.last_mut() {
            block.close(size);
            debug!(
                id = block.id(),
                end = size,
                dependencies = block.dependencies().len(),
                "red block ended"
            );
        }
        self.current_red_block = 0;
        Ok(())
    }

    /// Id of the active red block (0 if none).
    #[inline]
    pub fn current_red_block(&self) -> usize {
        self.current_red_block
    }

    /// All red blocks in creation order.
    pub fn red_blocks(&self) -> &[RedBlock] {
        &self.red_blocks
    }

    /// `[start, end)` ranges of all red blocks (`end` is `None` while open).
    pub fn red_block_ranges(&self) -> Vec<(NodeId, Option<NodeId>)> {
        self.red_blocks.iter().map(RedBlock::range).collect()
    }

    /// Union of the dependencies of all red blocks.
    pub fn red_block_dependencies(&self) -> BTreeSet<NodeId> {
        self.red_blocks
            .iter()
            .flat_map(|b| b.dependencies().iter().copied())
            .collect()
    }

    // =========================================================================
    // Node accessors
    // =========================================================================
    //
    // All accessors panic if `node` is out of range.

    /// Ordered arguments of `node`.
    #[inline]
    pub fn predecessors(&self, node: NodeId) -> &[NodeId] {
        &self.predecessors[node]
    }

    /// Op id of `node` ([`LEAF_OP`] for leaves).
    #[inline]
    pub fn op_id(&self, node: NodeId) -> usize {
        self.op_id[node]
    }

    /// Largest index of a node consuming `node` (0 if never consumed).
    #[inline]
    pub fn max_node_requiring_arg(&self, node: NodeId) -> NodeId {
        self.max_node_requiring_arg[node]
    }

    /// Red block id of `node` (0 outside of any block).
    #[inline]
    pub fn red_block_id(&self, node: NodeId) -> usize {
        self.red_block_id[node]
    }

    /// Returns `true` for interned constants.
    #[inline]
    pub fn is_constant(&self, node: NodeId) -> bool {
        self.constant_value[node].is_some()
    }

    /// Value of a constant node.
    #[inline]
    pub fn constant_value(&self, node: NodeId) -> Option<f64> {
        self.constant_value[node]
    }
}

/// Hash key of a constant; folds `-0.0` onto `0.0` and all NaNs together.
fn constant_key(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}
