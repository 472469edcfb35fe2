//! Human readable SSA listing of a graph, for debugging tapes.

use std::fmt::Write;

use pricer_core::types::RandomVariable;

use super::types::{ComputationGraph, LEAF_OP};

/// Renders one line per node:
///
/// ```text
/// v3 = Mult(v1, v2)    # Payoff(v1) [rb 1]
/// ```
///
/// Leaves are shown as `input`, constants as `const <value>`. Op ids without
/// an entry in `op_labels` are printed as `op<id>`. When `values` is given,
/// the mean of each evaluated node is appended.
///
/// # Example
///
/// ```rust
/// use pricer_tape::graph::{builder, ssa_form, ComputationGraph};
/// use pricer_tape::ops::OpCode;
///
/// let mut g = ComputationGraph::new();
/// let x = g.insert_leaf("x");
/// let two = g.constant(2.0);
/// builder::mult(&mut g, x, two, "y").unwrap();
///
/// let listing = ssa_form(&g, &OpCode::LABELS, None);
/// assert!(listing.contains("v2 = Mult(v0, v1)"));
/// ```
pub fn ssa_form(g: &ComputationGraph, op_labels: &[&str], values: Option<&[RandomVariable]>) -> String {
    let mut out = String::new();
    for node in 0..g.size() {
        let mut line = format!("v{} = ", node);
        if let Some(c) = g.constant_value(node) {
            let _ = write!(line, "const {}", c);
        } else if g.op_id(node) == LEAF_OP && g.predecessors(node).is_empty() {
            line.push_str("input");
        } else {
            let op = g.op_id(node);
            match op_labels.get(op) {
                Some(name) => line.push_str(name),
                None => {
                    let _ = write!(line, "op{}", op);
                }
            }
            let args: Vec<String> = g.predecessors(node).iter().map(|p| format!("v{}", p)).collect();
            let _ = write!(line, "({})", args.join(", "));
        }

        let mut notes = Vec::new();
        if let Some(labels) = g.labels().get(&node) {
            notes.push(labels.iter().cloned().collect::<Vec<_>>().join(", "));
        }
        if g.red_block_id(node) != 0 {
            notes.push(format!("[rb {}]", g.red_block_id(node)));
        }
        if let Some(v) = values.and_then(|v| v.get(node)).filter(|v| v.is_initialised()) {
            notes.push(format!("mean {}", v.mean()));
        }
        if !notes.is_empty() {
            let _ = write!(line, "    # {}", notes.join(" "));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}
