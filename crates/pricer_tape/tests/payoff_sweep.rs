//! Forward and reverse sweeps of recorded payoffs.
//!
//! Records small payoff graphs with the simplifying builder, evaluates them
//! with the operation table and differentiates them with the gradient table.
//!
//! # Test Coverage
//!
//! - Call payoff values and pathwise deltas, hard and smoothed
//! - Finite difference checks of every smooth gradient rule
//! - Forward evaluators against closed-form formulas (proptest)
//! - Zero gradient of equality indicators
//! - Hard failure when a sweep reaches a conditional expectation

mod common;

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use pricer_core::types::RandomVariable;
use pricer_tape::config::TapeConfig;
use pricer_tape::graph::{builder, ComputationGraph, MissingVariable, NodeId};
use pricer_tape::ops::{GradientTable, OpCode, OpError, OpTable};
use proptest::prelude::*;

fn tables(size: usize, eps: f64) -> (OpTable, GradientTable) {
    let config = TapeConfig::builder()
        .sample_size(size)
        .eps(eps)
        .build()
        .unwrap();
    (OpTable::new(&config), GradientTable::new(&config))
}

/// `max(Spot - strike, 0)`; returns the graph, spot and payoff nodes.
fn call_payoff(strike: f64) -> (ComputationGraph, NodeId, NodeId) {
    let mut g = ComputationGraph::new();
    let spot = g.variable("Spot", MissingVariable::Create).unwrap();
    let k = g.constant(strike);
    let zero = g.constant(0.0);
    let diff = builder::subtract(&mut g, spot, k, "").unwrap();
    let payoff = builder::max(&mut g, diff, zero, "Payoff").unwrap();
    g.set_variable("Payoff", payoff);
    (g, spot, payoff)
}

fn spots() -> RandomVariable {
    RandomVariable::from_values(vec![8.0, 9.0, 10.0, 11.0, 12.0])
}

// ============================================================================
// Call payoff
// ============================================================================

#[test]
fn test_call_payoff_hard_kink() {
    let (g, spot, payoff) = call_payoff(10.0);
    let (table, grads) = tables(5, 0.0);
    let inputs = BTreeMap::from([(spot, spots())]);

    let values = common::forward(&g, &table, &inputs, 5).unwrap();
    assert_eq!(values[payoff].to_vec(), vec![0.0, 0.0, 0.0, 1.0, 2.0]);

    let adjoints = common::backward(&g, &grads, &values, payoff, 5).unwrap();
    assert_eq!(adjoints[spot].to_vec(), vec![0.0, 0.0, 0.5, 1.0, 1.0]);
}

#[test]
fn test_call_payoff_smoothed_kink() {
    let (g, spot, payoff) = call_payoff(10.0);
    let (table, grads) = tables(5, 1e-4);
    let inputs = BTreeMap::from([(spot, spots())]);

    let values = common::forward(&g, &table, &inputs, 5).unwrap();
    let adjoints = common::backward(&g, &grads, &values, payoff, 5).unwrap();

    let expected_values = [0.0, 0.0, 0.0, 1.0, 2.0];
    let expected_delta = [0.0, 0.0, 0.5, 1.0, 1.0];
    for i in 0..5 {
        assert_relative_eq!(values[payoff].at(i), expected_values[i], epsilon = 1e-6);
        assert_relative_eq!(adjoints[spot].at(i), expected_delta[i], epsilon = 1e-6);
    }
}

#[test]
fn test_put_payoff_uses_min_rule() {
    // -min(Spot - K, 0) = max(K - Spot, 0)
    let mut g = ComputationGraph::new();
    let spot = g.variable("Spot", MissingVariable::Create).unwrap();
    let k = g.constant(10.0);
    let zero = g.constant(0.0);
    let diff = builder::subtract(&mut g, spot, k, "").unwrap();
    let m = builder::min(&mut g, diff, zero, "").unwrap();
    let put = builder::negative(&mut g, m, "Put").unwrap();

    let (table, grads) = tables(5, 0.0);
    let inputs = BTreeMap::from([(spot, spots())]);
    let values = common::forward(&g, &table, &inputs, 5).unwrap();
    assert_eq!(values[put].to_vec(), vec![2.0, 1.0, 0.0, 0.0, 0.0]);

    let adjoints = common::backward(&g, &grads, &values, put, 5).unwrap();
    assert_eq!(adjoints[spot].to_vec(), vec![-1.0, -1.0, -0.5, 0.0, 0.0]);
}

// ============================================================================
// Indicators and conditional expectations
// ============================================================================

#[test]
fn test_indicator_eq_has_zero_gradient() {
    let mut g = ComputationGraph::new();
    let spot = g.insert_leaf("Spot");
    let k = g.constant(10.0);
    let digital = builder::indicator_eq(&mut g, spot, k, "").unwrap();
    let weighted = builder::mult(&mut g, digital, spot, "").unwrap();

    let (table, grads) = tables(5, 1e-2);
    let inputs = BTreeMap::from([(spot, spots())]);
    let values = common::forward(&g, &table, &inputs, 5).unwrap();
    assert_eq!(values[weighted].to_vec(), vec![0.0, 0.0, 10.0, 0.0, 0.0]);

    // Only the direct path through the product contributes
    let adjoints = common::backward(&g, &grads, &values, weighted, 5).unwrap();
    assert_eq!(adjoints[spot].to_vec(), vec![0.0, 0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn test_sweep_through_conditional_expectation_fails() {
    let mut g = ComputationGraph::new();
    let x = g.insert_leaf("x");
    let one = g.constant(1.0);
    let y = builder::mult(&mut g, x, x, "").unwrap();
    let ce = builder::conditional_expectation(&mut g, y, &[x], one, "").unwrap();

    let (table, grads) = tables(5, 0.0);
    let inputs = BTreeMap::from([(x, spots())]);
    let values = common::forward(&g, &table, &inputs, 5).unwrap();
    for i in 0..5 {
        assert_relative_eq!(values[ce].at(i), values[y].at(i), epsilon = 1e-8);
    }

    let result = common::backward(&g, &grads, &values, ce, 5);
    assert_eq!(
        result.unwrap_err(),
        OpError::GradientNotSupported(OpCode::ConditionalExpectation)
    );
}

// ============================================================================
// Finite difference checks
// ============================================================================

fn assert_matches_finite_difference(op: OpCode, args: &[RandomVariable]) {
    let (table, grads) = tables(args[0].size(), 0.0);
    let refs: Vec<&RandomVariable> = args.iter().collect();
    let value = table.evaluate(op, &refs).unwrap();
    let local = grads.gradient(op, &refs, &value).unwrap();
    assert_eq!(local.len(), args.len(), "{}", op);

    let h = 1e-6;
    for (j, d) in local.iter().enumerate() {
        let bumped = |shift: f64| {
            let mut shifted = args.to_vec();
            shifted[j] = args[j].map(|x| x + shift);
            let refs: Vec<&RandomVariable> = shifted.iter().collect();
            table.evaluate(op, &refs).unwrap()
        };
        let up = bumped(h);
        let down = bumped(-h);
        for i in 0..value.size() {
            let fd = (up.at(i) - down.at(i)) / (2.0 * h);
            assert_relative_eq!(d.at(i), fd, epsilon = 1e-5, max_relative = 1e-5);
        }
    }
}

#[test]
fn test_gradients_match_finite_differences() {
    let a = RandomVariable::from_values(vec![0.4, 1.3, 2.7, 0.9]);
    let b = RandomVariable::from_values(vec![1.1, 0.6, 1.9, 2.2]);
    let signed = RandomVariable::from_values(vec![-1.5, -0.3, 0.8, 2.0]);

    for op in [OpCode::Add, OpCode::Subtract, OpCode::Mult, OpCode::Div, OpCode::Pow] {
        assert_matches_finite_difference(op, &[a.clone(), b.clone()]);
    }
    for op in [OpCode::Min, OpCode::Max, OpCode::IndicatorGt, OpCode::IndicatorGeq] {
        assert_matches_finite_difference(op, &[a.clone(), b.clone()]);
    }
    for op in [OpCode::Exp, OpCode::Sqrt, OpCode::Log] {
        assert_matches_finite_difference(op, &[a.clone()]);
    }
    for op in [OpCode::Negative, OpCode::Abs, OpCode::NormalCdf, OpCode::NormalPdf] {
        assert_matches_finite_difference(op, &[signed.clone()]);
    }
    assert_matches_finite_difference(OpCode::Add, &[a.clone(), b.clone(), signed]);
}

// ============================================================================
// Forward evaluation against closed forms
// ============================================================================

fn positive_samples() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.1f64..10.0, 1..16)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_forward_matches_formulas(xs in positive_samples(), shift in -2.0f64..2.0) {
        let n = xs.len();
        let ys: Vec<f64> = xs.iter().map(|x| (x + shift).abs() + 0.5).collect();
        let (table, _) = tables(n, 0.0);
        let a = RandomVariable::from_values(xs.clone());
        let b = RandomVariable::from_values(ys.clone());

        let eval2 = |op| table.evaluate(op, &[&a, &b]).unwrap();
        let eval1 = |op| table.evaluate(op, &[&a]).unwrap();

        let sum = eval2(OpCode::Add);
        let product = eval2(OpCode::Mult);
        let quotient = eval2(OpCode::Div);
        let power = eval2(OpCode::Pow);
        let exp = eval1(OpCode::Exp);
        let log = eval1(OpCode::Log);
        let sqrt = eval1(OpCode::Sqrt);
        let cdf = eval1(OpCode::NormalCdf);
        let pdf = eval1(OpCode::NormalPdf);

        for i in 0..n {
            let (x, y) = (xs[i], ys[i]);
            prop_assert!((sum.at(i) - (x + y)).abs() <= 1e-12 * (x + y));
            prop_assert!((product.at(i) - x * y).abs() <= 1e-12 * x * y);
            prop_assert!((quotient.at(i) - x / y).abs() <= 1e-12 * (x / y));
            prop_assert!((power.at(i) - x.powf(y)).abs() <= 1e-12 * x.powf(y));
            prop_assert!((exp.at(i) - x.exp()).abs() <= 1e-12 * x.exp());
            prop_assert!((log.at(i) - x.ln()).abs() <= 1e-12);
            prop_assert!((sqrt.at(i) - x.sqrt()).abs() <= 1e-12 * x.sqrt());
            let density = (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt();
            prop_assert!((pdf.at(i) - density).abs() <= 1e-14);
            prop_assert!(cdf.at(i) > 0.5 && cdf.at(i) <= 1.0);
        }
    }

    #[test]
    fn prop_normal_cdf_is_symmetric(x in -6.0f64..6.0) {
        let (table, _) = tables(1, 0.0);
        let a = RandomVariable::new(1, x);
        let minus_a = RandomVariable::new(1, -x);
        let left = table.evaluate(OpCode::NormalCdf, &[&a]).unwrap();
        let right = table.evaluate(OpCode::NormalCdf, &[&minus_a]).unwrap();
        prop_assert!((left.at(0) + right.at(0) - 1.0).abs() < 1e-12);
    }
}
