//! Simplifying node constructors.
//!
//! These are the functions a script interpreter calls to record arithmetic.
//! Each one folds constant arguments into an interned constant and applies
//! the algebraic identities below before falling back to a new op node:
//!
//! | expression | result |
//! |---|---|
//! | `a + 0`, `0 + a`, `a - 0`, `a * 1`, `1 * a`, `a / 1` | `a` |
//! | `a * 0`, `0 * a`, `0 / b`, `a - a` | `constant(0)` |
//! | `a / a` | `constant(1)` |
//! | `0 - b` | `negative(b)` |
//!
//! Zero and one are tested with [`close_enough`].
//!
//! # Example
//!
//! ```rust
//! use pricer_tape::graph::{builder, ComputationGraph};
//!
//! let mut g = ComputationGraph::new();
//! let x = g.insert_leaf("x");
//! let zero = g.constant(0.0);
//! let one = g.constant(1.0);
//!
//! assert_eq!(builder::add(&mut g, x, zero, "").unwrap(), x);
//! assert_eq!(builder::mult(&mut g, one, x, "").unwrap(), x);
//! assert_eq!(builder::subtract(&mut g, x, x, "").unwrap(), zero);
//!
//! let two = g.constant(2.0);
//! let three = g.constant(3.0);
//! let five = builder::add(&mut g, two, three, "").unwrap();
//! assert_eq!(g.constant_value(five), Some(5.0));
//! ```

use pricer_core::math::comparison::close_enough;
use pricer_core::math::distributions::{norm_cdf, norm_pdf};

use super::error::GraphError;
use super::types::{ComputationGraph, NodeId};
use crate::ops::OpCode;

type Result<T> = std::result::Result<T, GraphError>;

/// Constant value of `node`, after checking that it exists.
fn value_of(g: &ComputationGraph, node: NodeId) -> Result<Option<f64>> {
    if node >= g.size() {
        return Err(GraphError::InvalidPredecessor {
            predecessor: node,
            size: g.size(),
        });
    }
    Ok(g.constant_value(node))
}

fn is_close(value: Option<f64>, target: f64) -> bool {
    value.is_some_and(|v| close_enough(v, target))
}

fn unary(g: &mut ComputationGraph, a: NodeId, op: OpCode, f: fn(f64) -> f64, label: &str) -> Result<NodeId> {
    match value_of(g, a)? {
        Some(x) => Ok(g.constant(f(x))),
        None => g.insert_op(&[a], op.into(), label),
    }
}

fn binary(
    g: &mut ComputationGraph,
    a: NodeId,
    b: NodeId,
    op: OpCode,
    f: impl Fn(f64, f64) -> f64,
    label: &str,
) -> Result<NodeId> {
    match (value_of(g, a)?, value_of(g, b)?) {
        (Some(x), Some(y)) => Ok(g.constant(f(x, y))),
        _ => g.insert_op(&[a, b], op.into(), label),
    }
}

/// `a + b`.
pub fn add(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    let (va, vb) = (value_of(g, a)?, value_of(g, b)?);
    if let (Some(x), Some(y)) = (va, vb) {
        return Ok(g.constant(x + y));
    }
    if is_close(va, 0.0) {
        return Ok(b);
    }
    if is_close(vb, 0.0) {
        return Ok(a);
    }
    g.insert_op(&[a, b], OpCode::Add.into(), label)
}

/// Sum of all `args` as a single n-ary add node.
///
/// Two arguments go through [`add`]; a single argument is returned as is,
/// an empty sum is `constant(0)` and an all-constant sum is folded.
pub fn add_all(g: &mut ComputationGraph, args: &[NodeId], label: &str) -> Result<NodeId> {
    match args {
        [] => Ok(g.constant(0.0)),
        [a] => {
            value_of(g, *a)?;
            Ok(*a)
        }
        [a, b] => add(g, *a, *b, label),
        _ => {
            let mut sum = 0.0;
            let mut all_constant = true;
            for &a in args {
                match value_of(g, a)? {
                    Some(v) => sum += v,
                    None => all_constant = false,
                }
            }
            if all_constant {
                Ok(g.constant(sum))
            } else {
                g.insert_op(args, OpCode::Add.into(), label)
            }
        }
    }
}

/// `a - b`.
pub fn subtract(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    let (va, vb) = (value_of(g, a)?, value_of(g, b)?);
    if a == b {
        return Ok(g.constant(0.0));
    }
    if let (Some(x), Some(y)) = (va, vb) {
        return Ok(g.constant(x - y));
    }
    if is_close(va, 0.0) {
        return negative(g, b, label);
    }
    if is_close(vb, 0.0) {
        return Ok(a);
    }
    g.insert_op(&[a, b], OpCode::Subtract.into(), label)
}

/// `-a`.
pub fn negative(g: &mut ComputationGraph, a: NodeId, label: &str) -> Result<NodeId> {
    unary(g, a, OpCode::Negative, |x| -x, label)
}

/// `a * b`.
pub fn mult(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    let (va, vb) = (value_of(g, a)?, value_of(g, b)?);
    if let (Some(x), Some(y)) = (va, vb) {
        return Ok(g.constant(x * y));
    }
    if is_close(va, 1.0) {
        return Ok(b);
    }
    if is_close(vb, 1.0) {
        return Ok(a);
    }
    if is_close(va, 0.0) || is_close(vb, 0.0) {
        return Ok(g.constant(0.0));
    }
    g.insert_op(&[a, b], OpCode::Mult.into(), label)
}

/// `a / b`.
///
/// `a / a` is `1` for any node, so `0 / 0` folds to `1` rather than NaN.
pub fn div(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    let (va, vb) = (value_of(g, a)?, value_of(g, b)?);
    if a == b {
        return Ok(g.constant(1.0));
    }
    if let (Some(x), Some(y)) = (va, vb) {
        return Ok(g.constant(x / y));
    }
    if is_close(vb, 1.0) {
        return Ok(a);
    }
    if is_close(va, 0.0) {
        return Ok(g.constant(0.0));
    }
    g.insert_op(&[a, b], OpCode::Div.into(), label)
}

/// `E[regressand | regressor]` restricted to samples where `filter` is
/// non-zero.
///
/// The node's arguments are `[regressand, filter, regressor...]`. A constant
/// regressand is returned unchanged.
pub fn conditional_expectation(
    g: &mut ComputationGraph,
    regressand: NodeId,
    regressor: &[NodeId],
    filter: NodeId,
    label: &str,
) -> Result<NodeId> {
    if value_of(g, regressand)?.is_some() {
        return Ok(regressand);
    }
    let mut args = Vec::with_capacity(regressor.len() + 2);
    args.push(regressand);
    args.push(filter);
    args.extend_from_slice(regressor);
    g.insert_op(&args, OpCode::ConditionalExpectation.into(), label)
}

/// `1` where `a` and `b` are close enough, `0` elsewhere.
pub fn indicator_eq(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    binary(
        g,
        a,
        b,
        OpCode::IndicatorEq,
        |x, y| if close_enough(x, y) { 1.0 } else { 0.0 },
        label,
    )
}

/// `1` where `a > b` (near-ties are not greater), `0` elsewhere.
pub fn indicator_gt(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    binary(
        g,
        a,
        b,
        OpCode::IndicatorGt,
        |x, y| if x > y && !close_enough(x, y) { 1.0 } else { 0.0 },
        label,
    )
}

/// `1` where `a >= b` (near-ties count), `0` elsewhere.
pub fn indicator_geq(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    binary(
        g,
        a,
        b,
        OpCode::IndicatorGeq,
        |x, y| if x > y || close_enough(x, y) { 1.0 } else { 0.0 },
        label,
    )
}

/// `min(a, b)`.
pub fn min(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    binary(g, a, b, OpCode::Min, f64::min, label)
}

/// `max(a, b)`.
pub fn max(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    binary(g, a, b, OpCode::Max, f64::max, label)
}

/// `|a|`.
pub fn abs(g: &mut ComputationGraph, a: NodeId, label: &str) -> Result<NodeId> {
    unary(g, a, OpCode::Abs, f64::abs, label)
}

/// `exp(a)`.
pub fn exp(g: &mut ComputationGraph, a: NodeId, label: &str) -> Result<NodeId> {
    unary(g, a, OpCode::Exp, f64::exp, label)
}

/// `sqrt(a)`.
pub fn sqrt(g: &mut ComputationGraph, a: NodeId, label: &str) -> Result<NodeId> {
    unary(g, a, OpCode::Sqrt, f64::sqrt, label)
}

/// `ln(a)`.
pub fn log(g: &mut ComputationGraph, a: NodeId, label: &str) -> Result<NodeId> {
    unary(g, a, OpCode::Log, f64::ln, label)
}

/// `a^b`.
pub fn pow(g: &mut ComputationGraph, a: NodeId, b: NodeId, label: &str) -> Result<NodeId> {
    binary(g, a, b, OpCode::Pow, f64::powf, label)
}

/// Standard normal CDF of `a`.
pub fn normal_cdf(g: &mut ComputationGraph, a: NodeId, label: &str) -> Result<NodeId> {
    unary(g, a, OpCode::NormalCdf, norm_cdf, label)
}

/// Standard normal density of `a`.
pub fn normal_pdf(g: &mut ComputationGraph, a: NodeId, label: &str) -> Result<NodeId> {
    unary(g, a, OpCode::NormalPdf, norm_pdf, label)
}
