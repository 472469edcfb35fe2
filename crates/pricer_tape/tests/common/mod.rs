//! Minimal forward and reverse sweeps over a recorded graph.
//!
//! Used to exercise the operation and gradient tables end to end; leaf
//! inputs are supplied by node id.

#![allow(dead_code)]

use std::collections::BTreeMap;

use pricer_core::types::RandomVariable;
use pricer_tape::graph::{ComputationGraph, NodeId, LEAF_OP};
use pricer_tape::ops::{GradientTable, OpError, OpTable};

/// Evaluates every node in insertion order.
///
/// Constants broadcast to `size` samples; free leaves without an input are
/// uninitialised.
pub fn forward(
    g: &ComputationGraph,
    table: &OpTable,
    inputs: &BTreeMap<NodeId, RandomVariable>,
    size: usize,
) -> Result<Vec<RandomVariable>, OpError> {
    let mut values: Vec<RandomVariable> = Vec::with_capacity(g.size());
    for node in 0..g.size() {
        let value = if let Some(c) = g.constant_value(node) {
            RandomVariable::new(size, c)
        } else if g.op_id(node) == LEAF_OP && g.predecessors(node).is_empty() {
            inputs
                .get(&node)
                .cloned()
                .unwrap_or_else(RandomVariable::uninitialised)
        } else {
            let args: Vec<&RandomVariable> =
                g.predecessors(node).iter().map(|&p| &values[p]).collect();
            table.evaluate_id(g.op_id(node), &args)?
        };
        values.push(value);
    }
    Ok(values)
}

/// Adjoints of all nodes with respect to `output`.
pub fn backward(
    g: &ComputationGraph,
    grads: &GradientTable,
    values: &[RandomVariable],
    output: NodeId,
    size: usize,
) -> Result<Vec<RandomVariable>, OpError> {
    let mut adjoints: Vec<RandomVariable> = (0..g.size())
        .map(|_| RandomVariable::new(size, 0.0))
        .collect();
    adjoints[output] = RandomVariable::new(size, 1.0);

    for node in (0..=output).rev() {
        let preds = g.predecessors(node);
        let unreached = adjoints[node].is_deterministic() && adjoints[node].at(0) == 0.0;
        if preds.is_empty() || unreached {
            continue;
        }
        let args: Vec<&RandomVariable> = preds.iter().map(|&p| &values[p]).collect();
        let local = grads.gradient_id(g.op_id(node), &args, &values[node])?;
        for (&p, d) in preds.iter().zip(&local) {
            let contribution = &adjoints[node] * d;
            adjoints[p] = &adjoints[p] + &contribution;
        }
    }
    Ok(adjoints)
}
