//! Local adjoint rules.
//!
//! For a node `v = op(a_1, ..., a_n)` the [`GradientTable`] returns the
//! partial derivatives `dv/da_i`, one random variable per argument, given the
//! forward arguments and the forward result. An adjoint driver multiplies
//! them with the node's adjoint and accumulates into the arguments.
//!
//! # Non-smooth operations
//!
//! Indicators, `min` and `max` are differentiated through the logistic step
//! `H` of width `rms(x) * eps / 2` used by the forward evaluators:
//!
//! - `IndicatorGt`, `IndicatorGeq`: `(H'(a - b), -H'(a - b))`, zero when
//!   `eps == 0`
//! - `max(a, b) = b + H(x) x` with `x = a - b` gives `H(x) + H'(x) x` for `a`;
//!   `min` is symmetric. With `eps == 0`, `H` is the hard step with value
//!   `1/2` at ties, so the rule stays continuous across the kink.
//! - `IndicatorEq` has a zero gradient.
//!
//! The width is recomputed from the forward arguments but treated as a
//! constant when differentiating. Its own dependence on `a - b` through
//! `rms(a - b)` is ignored, so for `eps > 0` these rules are the derivative
//! of a step with frozen width, not the exact derivative of the smoothed
//! forward values. The gap shrinks with `eps`.

use pricer_core::types::random_variable::{self as rv, RandomVariable};

use super::error::OpError;
use super::opcode::{OpCode, OP_COUNT};
use super::table::check_sizes;
use crate::config::TapeConfig;

/// Local derivative rule of one operation.
pub type GradFn = Box<
    dyn Fn(&[&RandomVariable], &RandomVariable) -> Result<Vec<RandomVariable>, OpError> + Send + Sync,
>;

/// Deterministic `value` with the sample count of `x`.
fn constant_like(x: &RandomVariable, value: f64) -> RandomVariable {
    RandomVariable::new(x.size(), value)
}

/// `H(x) + H'(x) * x`, the derivative of the smoothed `x -> H(x) x`.
fn kink_derivative(x: &RandomVariable, eps: f64) -> RandomVariable {
    let step = rv::smoothed_step(x, eps);
    let bump = rv::indicator_derivative(x, eps);
    &step + &(&bump * x)
}

/// Local derivative rules for all built-in operations.
///
/// # Example
///
/// ```rust
/// use pricer_core::types::RandomVariable;
/// use pricer_tape::config::TapeConfig;
/// use pricer_tape::ops::{GradientTable, OpCode};
///
/// let config = TapeConfig::builder().sample_size(2).build().unwrap();
/// let grads = GradientTable::new(&config);
///
/// let a = RandomVariable::from_values(vec![2.0, 3.0]);
/// let b = RandomVariable::from_values(vec![5.0, 7.0]);
/// let v = &a * &b;
/// let d = grads.gradient(OpCode::Mult, &[&a, &b], &v).unwrap();
/// assert_eq!(d[0], b);
/// assert_eq!(d[1], a);
/// ```
pub struct GradientTable {
    grads: Vec<GradFn>,
}

impl GradientTable {
    /// Builds the rules for `config`.
    pub fn new(config: &TapeConfig) -> Self {
        let eps = config.eps();
        let mut grads: Vec<GradFn> = Vec::with_capacity(OP_COUNT);

        // None
        grads.push(Box::new(|_, _| Ok(Vec::new())));

        // Add
        grads.push(Box::new(|args, _| {
            Ok(args.iter().map(|a| constant_like(a, 1.0)).collect())
        }));

        // Subtract
        grads.push(Box::new(|args, _| {
            Ok(vec![constant_like(args[0], 1.0), constant_like(args[1], -1.0)])
        }));

        // Negative
        grads.push(Box::new(|args, _| Ok(vec![constant_like(args[0], -1.0)])));

        // Mult
        grads.push(Box::new(|args, _| Ok(vec![args[1].clone(), args[0].clone()])));

        // Div
        grads.push(Box::new(|args, _| {
            let da = &constant_like(args[1], 1.0) / args[1];
            let db = -(args[0] / &(args[1] * args[1]));
            Ok(vec![da, db])
        }));

        // ConditionalExpectation
        grads.push(Box::new(|_, _| {
            Err(OpError::GradientNotSupported(OpCode::ConditionalExpectation))
        }));

        // IndicatorEq
        grads.push(Box::new(|args, _| {
            Ok(vec![constant_like(args[0], 0.0), constant_like(args[1], 0.0)])
        }));

        // IndicatorGt, IndicatorGeq
        for _ in 0..2 {
            grads.push(Box::new(move |args, _| {
                let bump = rv::indicator_derivative(&(args[0] - args[1]), eps);
                let neg = -&bump;
                Ok(vec![bump, neg])
            }));
        }

        // Min
        grads.push(Box::new(move |args, _| {
            Ok(vec![
                kink_derivative(&(args[1] - args[0]), eps),
                kink_derivative(&(args[0] - args[1]), eps),
            ])
        }));

        // Max
        grads.push(Box::new(move |args, _| {
            Ok(vec![
                kink_derivative(&(args[0] - args[1]), eps),
                kink_derivative(&(args[1] - args[0]), eps),
            ])
        }));

        // Abs
        grads.push(Box::new(|args, _| {
            let zero = constant_like(args[0], 0.0);
            Ok(vec![rv::indicator_geq(args[0], &zero, 1.0, -1.0, 0.0)])
        }));

        // Exp
        grads.push(Box::new(|_, v| Ok(vec![v.clone()])));

        // Sqrt
        grads.push(Box::new(|_, v| Ok(vec![&constant_like(v, 0.5) / v])));

        // Log
        grads.push(Box::new(|args, _| Ok(vec![&constant_like(args[0], 1.0) / args[0]])));

        // Pow
        grads.push(Box::new(|args, v| {
            let da = &(args[1] / args[0]) * v;
            let db = &rv::log(args[0]) * v;
            Ok(vec![da, db])
        }));

        // NormalCdf
        grads.push(Box::new(|args, _| Ok(vec![rv::normal_pdf(args[0])])));

        // NormalPdf
        grads.push(Box::new(|args, v| Ok(vec![&(-args[0]) * v])));

        debug_assert_eq!(grads.len(), OP_COUNT);
        Self { grads }
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.grads.len()
    }

    /// Returns `true` if the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    /// Local derivatives of `op` with respect to each argument.
    ///
    /// # Errors
    ///
    /// Returns [`OpError::ArityMismatch`] for a wrong number of arguments,
    /// [`OpError::SizeMismatch`] if the initialised arguments and result
    /// differ in sample count and [`OpError::GradientNotSupported`] for
    /// conditional expectations.
    pub fn gradient(
        &self,
        op: OpCode,
        args: &[&RandomVariable],
        result: &RandomVariable,
    ) -> Result<Vec<RandomVariable>, OpError> {
        op.check_arity(args.len())?;
        check_sizes(op, args.iter().copied().chain(std::iter::once(result)))?;
        (self.grads[op.id()])(args, result)
    }

    /// Local derivatives of the operation with graph op id `op_id`.
    ///
    /// # Errors
    ///
    /// As [`gradient`](Self::gradient), plus [`OpError::UnknownOp`].
    pub fn gradient_id(
        &self,
        op_id: usize,
        args: &[&RandomVariable],
        result: &RandomVariable,
    ) -> Result<Vec<RandomVariable>, OpError> {
        self.gradient(OpCode::try_from(op_id)?, args, result)
    }
}

impl std::fmt::Debug for GradientTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradientTable")
            .field("len", &self.grads.len())
            .finish()
    }
}
