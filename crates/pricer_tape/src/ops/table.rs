//! Forward evaluators and node requirements.
//!
//! The [`OpTable`] maps every [`OpCode`] to a closure evaluating the
//! operation on materialised [`RandomVariable`] arguments. The closures are
//! built once from a [`TapeConfig`] and are `Send + Sync`, so a table can be
//! shared between executor threads.
//!
//! [`node_requirements`] tells an executor which values must stay alive for
//! the gradient rules, and which results may be freed as soon as their last
//! consumer has run.

use pricer_core::math::basis::{BasisDescriptor, BasisSystem};
use pricer_core::math::comparison::close_enough;
use pricer_core::math::linalg::CoordinateTransform;
use pricer_core::types::random_variable::{self as rv, RandomVariable};
use tracing::trace;

use super::error::OpError;
use super::opcode::{OpCode, OP_COUNT};
use crate::config::TapeConfig;

/// Forward evaluator of one operation.
pub type OpFn = Box<dyn Fn(&[&RandomVariable]) -> Result<RandomVariable, OpError> + Send + Sync>;

/// Checks that all initialised values in `args` share one sample count.
pub(super) fn check_sizes<'a>(
    op: OpCode,
    args: impl IntoIterator<Item = &'a RandomVariable>,
) -> Result<(), OpError> {
    let mut sizes = args
        .into_iter()
        .filter(|a| a.is_initialised())
        .map(|a| a.size());
    if let Some(expected) = sizes.next() {
        if let Some(got) = sizes.find(|&s| s != expected) {
            return Err(OpError::SizeMismatch { op, expected, got });
        }
    }
    Ok(())
}

/// Memory requirements of a node for an adjoint sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRequirements {
    /// `arg_required[i]`: argument `i` is read by the gradient rule.
    pub arg_required: Vec<bool>,
    /// The node's own value is read by the gradient rule.
    pub result_required: bool,
    /// The result may be freed once its last consumer has run.
    pub allows_predeletion: bool,
}

/// Requirements of a node with operation `op` and `n_args` arguments.
///
/// # Example
///
/// ```rust
/// use pricer_tape::ops::{node_requirements, OpCode};
///
/// let req = node_requirements(OpCode::Exp, 1);
/// assert_eq!(req.arg_required, vec![false]);
/// assert!(req.result_required);
///
/// assert!(!node_requirements(OpCode::ConditionalExpectation, 3).allows_predeletion);
/// ```
pub fn node_requirements(op: OpCode, n_args: usize) -> NodeRequirements {
    let (args, result) = match op {
        OpCode::None
        | OpCode::Add
        | OpCode::Subtract
        | OpCode::Negative
        | OpCode::IndicatorEq => (false, false),
        OpCode::Mult
        | OpCode::Div
        | OpCode::IndicatorGt
        | OpCode::IndicatorGeq
        | OpCode::Min
        | OpCode::Max
        | OpCode::Abs
        | OpCode::Log
        | OpCode::NormalCdf => (true, false),
        OpCode::ConditionalExpectation | OpCode::Pow | OpCode::NormalPdf => (true, true),
        OpCode::Exp | OpCode::Sqrt => (false, true),
    };
    NodeRequirements {
        arg_required: vec![args; n_args],
        result_required: result,
        allows_predeletion: op != OpCode::ConditionalExpectation,
    }
}

// =============================================================================
// OpTable
// =============================================================================

/// Forward evaluators for all built-in operations.
///
/// # Example
///
/// ```rust
/// use pricer_core::types::RandomVariable;
/// use pricer_tape::config::TapeConfig;
/// use pricer_tape::ops::{OpCode, OpTable};
///
/// let config = TapeConfig::builder().sample_size(3).build().unwrap();
/// let table = OpTable::new(&config);
///
/// let s = RandomVariable::from_values(vec![9.0, 10.0, 11.0]);
/// let k = RandomVariable::new(3, 10.0);
/// let payoff = table.evaluate(OpCode::Max, &[&(&s - &k), &RandomVariable::new(3, 0.0)]).unwrap();
/// assert_eq!(payoff.to_vec(), vec![0.0, 0.0, 1.0]);
/// ```
pub struct OpTable {
    ops: Vec<OpFn>,
    config: TapeConfig,
}

impl OpTable {
    /// Builds the evaluators for `config`.
    pub fn new(config: &TapeConfig) -> Self {
        let eps = config.eps();
        let mut ops: Vec<OpFn> = Vec::with_capacity(OP_COUNT);

        // None
        ops.push(Box::new(|_| Ok(RandomVariable::uninitialised())));

        // Add
        ops.push(Box::new(|args| {
            let size = args.first().map_or(0, |a| a.size());
            Ok(args
                .iter()
                .fold(RandomVariable::new(size, 0.0), |acc, &a| &acc + a))
        }));

        // Subtract
        ops.push(Box::new(|args| Ok(args[0] - args[1])));

        // Negative
        ops.push(Box::new(|args| Ok(-args[0])));

        // Mult
        ops.push(Box::new(|args| Ok(args[0] * args[1])));

        // Div
        ops.push(Box::new(|args| Ok(args[0] / args[1])));

        // ConditionalExpectation
        let ce_config = config.clone();
        ops.push(Box::new(move |args| conditional_expectation(&ce_config, args)));

        // IndicatorEq
        ops.push(Box::new(|args| Ok(rv::indicator_eq(args[0], args[1], 1.0, 0.0))));

        // IndicatorGt
        ops.push(Box::new(move |args| {
            Ok(rv::indicator_gt(args[0], args[1], 1.0, 0.0, eps))
        }));

        // IndicatorGeq
        ops.push(Box::new(move |args| {
            Ok(rv::indicator_geq(args[0], args[1], 1.0, 0.0, eps))
        }));

        // Min, Max
        if eps == 0.0 {
            ops.push(Box::new(|args| Ok(rv::min(args[0], args[1]))));
            ops.push(Box::new(|args| Ok(rv::max(args[0], args[1]))));
        } else {
            ops.push(Box::new(move |args| {
                let step = rv::indicator_gt(args[0], args[1], 1.0, 0.0, eps);
                Ok(&(&step * &(args[1] - args[0])) + args[0])
            }));
            ops.push(Box::new(move |args| {
                let step = rv::indicator_gt(args[0], args[1], 1.0, 0.0, eps);
                Ok(&(&step * &(args[0] - args[1])) + args[1])
            }));
        }

        // Abs, Exp, Sqrt, Log
        ops.push(Box::new(|args| Ok(rv::abs(args[0]))));
        ops.push(Box::new(|args| Ok(rv::exp(args[0]))));
        ops.push(Box::new(|args| Ok(rv::sqrt(args[0]))));
        ops.push(Box::new(|args| Ok(rv::log(args[0]))));

        // Pow
        ops.push(Box::new(|args| Ok(rv::pow(args[0], args[1]))));

        // NormalCdf, NormalPdf
        ops.push(Box::new(|args| Ok(rv::normal_cdf(args[0]))));
        ops.push(Box::new(|args| Ok(rv::normal_pdf(args[0]))));

        debug_assert_eq!(ops.len(), OP_COUNT);
        Self {
            ops,
            config: config.clone(),
        }
    }

    /// Configuration the evaluators were built from.
    pub fn config(&self) -> &TapeConfig {
        &self.config
    }

    /// Number of evaluators.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if the table has no evaluators.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Evaluates `op` on `args`.
    ///
    /// # Errors
    ///
    /// Returns [`OpError::ArityMismatch`] for a wrong number of arguments,
    /// [`OpError::SizeMismatch`] if initialised arguments differ in sample
    /// count and [`OpError::Regression`] if a conditional expectation cannot
    /// be fitted.
    pub fn evaluate(&self, op: OpCode, args: &[&RandomVariable]) -> Result<RandomVariable, OpError> {
        op.check_arity(args.len())?;
        check_sizes(op, args.iter().copied())?;
        (self.ops[op.id()])(args)
    }

    /// Evaluates the operation with graph op id `op_id`.
    ///
    /// # Errors
    ///
    /// As [`evaluate`](Self::evaluate), plus [`OpError::UnknownOp`].
    pub fn evaluate_id(&self, op_id: usize, args: &[&RandomVariable]) -> Result<RandomVariable, OpError> {
        self.evaluate(OpCode::try_from(op_id)?, args)
    }

    /// Requirements of a node; see [`node_requirements`].
    pub fn requirements(&self, op: OpCode, n_args: usize) -> NodeRequirements {
        node_requirements(op, n_args)
    }
}

impl std::fmt::Debug for OpTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpTable")
            .field("len", &self.ops.len())
            .field("config", &self.config)
            .finish()
    }
}

/// `E[args[0] | args[2..]]` restricted to samples where `args[1]` is not
/// close to zero.
///
/// Deterministic and uninitialised regressors carry no information and are
/// dropped; if none remain (or PCA removes all factors) the unconditional
/// expectation is returned.
fn conditional_expectation(
    config: &TapeConfig,
    args: &[&RandomVariable],
) -> Result<RandomVariable, OpError> {
    let regressand = args[0];
    let filter_values = args[1];

    let transformed: Vec<RandomVariable>;
    let mut regressor: Vec<&RandomVariable> = args[2..]
        .iter()
        .copied()
        .filter(|r| r.is_initialised() && !r.is_deterministic())
        .collect();

    if let Some(cutoff) = config.regression_variance_cutoff() {
        let transform = CoordinateTransform::pca(&regressor, cutoff)?;
        transformed = transform.apply(&regressor)?;
        regressor = transformed.iter().collect();
    }

    if regressor.is_empty() {
        trace!("conditional expectation without stochastic regressors");
        return Ok(regressand.expectation());
    }

    let filter = if filter_values.is_deterministic() {
        if close_enough(filter_values.at(0), 0.0) {
            Some(vec![false; regressand.size()])
        } else {
            None
        }
    } else {
        Some(filter_values.iter().map(|f| !close_enough(f, 0.0)).collect())
    };

    let basis = BasisSystem::new(
        BasisDescriptor::new(regressor.len(), config.regression_order(), config.basis_family())
            .with_size_bound(config.sample_size()),
    )?;
    trace!(
        regressors = regressor.len(),
        basis_functions = basis.len(),
        "conditional expectation"
    );
    Ok(basis.conditional_expectation(regressand, &regressor, filter.as_deref())?)
}
