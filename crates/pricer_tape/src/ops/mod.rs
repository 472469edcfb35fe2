//! # Operation and Gradient Tables
//!
//! Dispatch tables indexed by the dense [`OpCode`]:
//!
//! - [`OpTable`]: forward evaluators on [`RandomVariable`](pricer_core::types::RandomVariable)
//!   arguments, plus the per-op [`NodeRequirements`]
//! - [`GradientTable`]: local derivative rules for reverse sweeps
//!
//! Both are built once from a [`TapeConfig`](crate::config::TapeConfig) and
//! are immutable afterwards.

mod error;
mod gradients;
mod opcode;
mod table;

pub use error::OpError;
pub use gradients::{GradFn, GradientTable};
pub use opcode::{Arity, OpCode, OP_COUNT};
pub use table::{node_requirements, NodeRequirements, OpFn, OpTable};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TapeConfig;
    use approx::assert_relative_eq;
    use pricer_core::math::smoothing::{smooth_indicator, smooth_indicator_derivative, step_width};
    use pricer_core::types::RandomVariable;

    fn config(size: usize, eps: f64) -> TapeConfig {
        TapeConfig::builder().sample_size(size).eps(eps).build().unwrap()
    }

    fn rv(values: &[f64]) -> RandomVariable {
        RandomVariable::from_values(values.to_vec())
    }

    // =========================================================================
    // Node requirements
    // =========================================================================

    mod requirements_tests {
        use super::*;

        #[test]
        fn test_requirements_table() {
            let expected = [
                (OpCode::None, false, false),
                (OpCode::Add, false, false),
                (OpCode::Subtract, false, false),
                (OpCode::Negative, false, false),
                (OpCode::Mult, true, false),
                (OpCode::Div, true, false),
                (OpCode::ConditionalExpectation, true, true),
                (OpCode::IndicatorEq, false, false),
                (OpCode::IndicatorGt, true, false),
                (OpCode::IndicatorGeq, true, false),
                (OpCode::Min, true, false),
                (OpCode::Max, true, false),
                (OpCode::Abs, true, false),
                (OpCode::Exp, false, true),
                (OpCode::Sqrt, false, true),
                (OpCode::Log, true, false),
                (OpCode::Pow, true, true),
                (OpCode::NormalCdf, true, false),
                (OpCode::NormalPdf, true, true),
            ];
            for (op, args, result) in expected {
                let req = node_requirements(op, 3);
                assert_eq!(req.arg_required, vec![args; 3], "{}", op);
                assert_eq!(req.result_required, result, "{}", op);
            }
        }

        #[test]
        fn test_only_conditional_expectation_blocks_predeletion() {
            for op in OpCode::ALL {
                assert_eq!(
                    node_requirements(op, 2).allows_predeletion,
                    op != OpCode::ConditionalExpectation
                );
            }
        }
    }

    // =========================================================================
    // Forward evaluation
    // =========================================================================

    mod forward_tests {
        use super::*;

        #[test]
        fn test_table_sizes() {
            let cfg = config(4, 0.0);
            assert_eq!(OpTable::new(&cfg).len(), OP_COUNT);
            assert_eq!(GradientTable::new(&cfg).len(), OP_COUNT);
        }

        #[test]
        fn test_add_is_nary() {
            let table = OpTable::new(&config(2, 0.0));
            let a = rv(&[1.0, 2.0]);
            let b = RandomVariable::new(2, 10.0);
            let c = rv(&[0.5, 0.25]);
            let sum = table.evaluate(OpCode::Add, &[&a, &b, &c]).unwrap();
            assert_eq!(sum.to_vec(), vec![11.5, 12.25]);
        }

        #[test]
        fn test_none_is_uninitialised() {
            let table = OpTable::new(&config(2, 0.0));
            assert!(!table.evaluate(OpCode::None, &[]).unwrap().is_initialised());
        }

        #[test]
        fn test_indicators_hard() {
            let table = OpTable::new(&config(3, 0.0));
            let a = rv(&[1.0, 2.0, 3.0]);
            let b = RandomVariable::new(3, 2.0);
            let eval = |op| table.evaluate(op, &[&a, &b]).unwrap().to_vec();
            assert_eq!(eval(OpCode::IndicatorEq), vec![0.0, 1.0, 0.0]);
            assert_eq!(eval(OpCode::IndicatorGt), vec![0.0, 0.0, 1.0]);
            assert_eq!(eval(OpCode::IndicatorGeq), vec![0.0, 1.0, 1.0]);
        }

        #[test]
        fn test_smoothed_max_approaches_exact() {
            let table = OpTable::new(&config(5, 1e-4));
            let x = rv(&[-2.0, -1.0, 0.0, 1.0, 2.0]);
            let zero = RandomVariable::new(5, 0.0);
            let smooth = table.evaluate(OpCode::Max, &[&x, &zero]).unwrap();
            let expected = [0.0, 0.0, 0.0, 1.0, 2.0];
            for (i, e) in expected.iter().enumerate() {
                assert_relative_eq!(smooth.at(i), *e, epsilon = 1e-6);
            }
            let smooth_min = table.evaluate(OpCode::Min, &[&x, &zero]).unwrap();
            assert_relative_eq!(smooth_min.at(0), -2.0, epsilon = 1e-6);
            assert_relative_eq!(smooth_min.at(4), 0.0, epsilon = 1e-6);
        }

        #[test]
        fn test_arity_is_checked() {
            let table = OpTable::new(&config(1, 0.0));
            let a = RandomVariable::new(1, 1.0);
            assert!(matches!(
                table.evaluate(OpCode::Pow, &[&a]),
                Err(OpError::ArityMismatch { op: OpCode::Pow, got: 1, .. })
            ));
            assert_eq!(
                table.evaluate_id(99, &[&a]),
                Err(OpError::UnknownOp(99))
            );
        }

        #[test]
        fn test_ieee_edge_cases_propagate() {
            let table = OpTable::new(&config(2, 0.0));
            let a = rv(&[1.0, -1.0]);
            let zero = RandomVariable::new(2, 0.0);
            let q = table.evaluate(OpCode::Div, &[&a, &zero]).unwrap();
            assert_eq!(q.at(0), f64::INFINITY);
            assert_eq!(q.at(1), f64::NEG_INFINITY);
            assert!(table.evaluate(OpCode::Log, &[&a]).unwrap().at(1).is_nan());
        }

        #[test]
        fn test_mismatched_sizes_are_rejected() {
            let table = OpTable::new(&config(3, 0.0));
            let a = rv(&[1.0, 2.0, 3.0]);
            let b = rv(&[1.0, 2.0]);
            assert_eq!(
                table.evaluate(OpCode::Mult, &[&a, &b]),
                Err(OpError::SizeMismatch {
                    op: OpCode::Mult,
                    expected: 3,
                    got: 2
                })
            );
            let unset = RandomVariable::uninitialised();
            assert!(!table
                .evaluate(OpCode::Add, &[&a, &unset])
                .unwrap()
                .is_initialised());
        }
    }

    // =========================================================================
    // Conditional expectation
    // =========================================================================

    mod conditional_expectation_tests {
        use super::*;

        fn linear_data(n: usize) -> (RandomVariable, RandomVariable) {
            let xs: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
            let ys: Vec<f64> = xs.iter().map(|x| 2.0 + 3.0 * x).collect();
            (RandomVariable::from_values(xs), RandomVariable::from_values(ys))
        }

        #[test]
        fn test_recovers_linear_dependence() {
            let (x, y) = linear_data(50);
            let table = OpTable::new(&config(50, 0.0));
            let one = RandomVariable::new(50, 1.0);
            let ce = table
                .evaluate(OpCode::ConditionalExpectation, &[&y, &one, &x])
                .unwrap();
            for i in 0..50 {
                assert_relative_eq!(ce.at(i), y.at(i), epsilon = 1e-10);
            }
        }

        #[test]
        fn test_deterministic_regressors_give_expectation() {
            let (_, y) = linear_data(10);
            let table = OpTable::new(&config(10, 0.0));
            let one = RandomVariable::new(10, 1.0);
            let c = RandomVariable::new(10, 7.0);
            let unset = RandomVariable::uninitialised();
            let ce = table
                .evaluate(OpCode::ConditionalExpectation, &[&y, &one, &c, &unset])
                .unwrap();
            assert!(ce.is_deterministic());
            assert_relative_eq!(ce.at(0), y.mean(), epsilon = 1e-14);
        }

        #[test]
        fn test_filter_restricts_fit() {
            let x = rv(&[0.0, 1.0, 2.0, 3.0, 4.0]);
            let y = rv(&[1.0, 2.0, 3.0, 4.0, 50.0]);
            let filter = rv(&[1.0, 1.0, 1.0, 1.0, 0.0]);
            let cfg = TapeConfig::builder()
                .sample_size(5)
                .regression_order(1)
                .build()
                .unwrap();
            let table = OpTable::new(&cfg);
            let ce = table
                .evaluate(OpCode::ConditionalExpectation, &[&y, &filter, &x])
                .unwrap();
            // Fitted line through the unfiltered samples, extrapolated to the last
            assert_relative_eq!(ce.at(0), 1.0, epsilon = 1e-10);
            assert_relative_eq!(ce.at(4), 5.0, epsilon = 1e-10);
        }

        #[test]
        fn test_pca_drops_redundant_regressor() {
            let (x, y) = linear_data(20);
            let x2 = x.map(|v| -3.0 * v);
            let cfg = TapeConfig::builder()
                .sample_size(20)
                .regression_order(1)
                .regression_variance_cutoff(1e-6)
                .build()
                .unwrap();
            let table = OpTable::new(&cfg);
            let one = RandomVariable::new(20, 1.0);
            let ce = table
                .evaluate(OpCode::ConditionalExpectation, &[&y, &one, &x, &x2])
                .unwrap();
            for i in 0..20 {
                assert_relative_eq!(ce.at(i), y.at(i), epsilon = 1e-9);
            }
        }
    }

    // =========================================================================
    // Gradients
    // =========================================================================

    mod gradient_tests {
        use super::*;

        #[test]
        fn test_conditional_expectation_gradient_fails() {
            let grads = GradientTable::new(&config(2, 0.0));
            let a = rv(&[1.0, 2.0]);
            assert_eq!(
                grads.gradient(OpCode::ConditionalExpectation, &[&a, &a, &a], &a),
                Err(OpError::GradientNotSupported(OpCode::ConditionalExpectation))
            );
        }

        #[test]
        fn test_indicator_eq_gradient_is_zero() {
            let grads = GradientTable::new(&config(2, 1e-2));
            let a = rv(&[1.0, 2.0]);
            let b = rv(&[1.0, 3.0]);
            let v = RandomVariable::new(2, 0.0);
            let d = grads.gradient(OpCode::IndicatorEq, &[&a, &b], &v).unwrap();
            assert!(d.iter().all(|g| g.is_close_to(0.0)));
        }

        #[test]
        fn test_hard_indicator_gradient_is_zero() {
            let grads = GradientTable::new(&config(2, 0.0));
            let a = rv(&[1.0, 2.0]);
            let b = rv(&[2.0, 1.0]);
            let v = RandomVariable::new(2, 0.0);
            let d = grads.gradient(OpCode::IndicatorGt, &[&a, &b], &v).unwrap();
            assert!(d[0].is_close_to(0.0));
            assert!(d[1].is_close_to(0.0));
        }

        #[test]
        fn test_smoothed_indicator_gradient_bump() {
            let eps = 0.5;
            let grads = GradientTable::new(&config(4, eps));
            let a = rv(&[-1.0, 0.0, 1.0, 2.0]);
            let b = RandomVariable::new(4, 0.0);
            let v = RandomVariable::new(4, 0.0);
            // rms(a - b) = sqrt(1.5)
            let width = step_width(1.5_f64, eps);

            for op in [OpCode::IndicatorGt, OpCode::IndicatorGeq] {
                let d = grads.gradient(op, &[&a, &b], &v).unwrap();
                for i in 0..4 {
                    let expected = smooth_indicator_derivative(a.at(i), width);
                    assert_relative_eq!(d[0].at(i), expected, epsilon = 1e-14);
                    assert_eq!(d[1].at(i), -d[0].at(i));
                }
                // Peak 1 / (4 w) at the tie, symmetric around it
                assert_relative_eq!(d[0].at(1), (2.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
                assert_relative_eq!(d[0].at(0), d[0].at(2), epsilon = 1e-14);
                assert!(d[0].at(3) < d[0].at(2));
            }
        }

        #[test]
        fn test_smoothed_indicator_gradient_freezes_width() {
            let eps = 0.5;
            let table = OpTable::new(&config(4, eps));
            let grads = GradientTable::new(&config(4, eps));
            let a = rv(&[-1.0, 0.0, 1.0, 2.0]);
            let b = RandomVariable::new(4, 0.0);
            let v = table.evaluate(OpCode::IndicatorGt, &[&a, &b]).unwrap();
            let d = grads.gradient(OpCode::IndicatorGt, &[&a, &b], &v).unwrap();

            let width = step_width(1.5_f64, eps);
            let h = 1e-6;
            let frozen = (smooth_indicator(-1.0 + h, width) - smooth_indicator(-1.0 - h, width)) / (2.0 * h);
            assert_relative_eq!(d[0].at(0), frozen, epsilon = 1e-8);

            // Bumping one path also moves the width, which the rule ignores
            let bumped = |shift: f64| {
                let shifted = rv(&[-1.0 + shift, 0.0, 1.0, 2.0]);
                table.evaluate(OpCode::IndicatorGt, &[&shifted, &b]).unwrap().at(0)
            };
            let full = (bumped(h) - bumped(-h)) / (2.0 * h);
            assert!((full - d[0].at(0)).abs() > 1e-3);
        }

        #[test]
        fn test_smoothed_max_gradient() {
            let eps = 0.5;
            let grads = GradientTable::new(&config(4, eps));
            let a = rv(&[-1.0, 0.0, 1.0, 2.0]);
            let zero = RandomVariable::new(4, 0.0);
            let v = RandomVariable::new(4, 0.0);
            let width = step_width(1.5_f64, eps);
            let d = grads.gradient(OpCode::Max, &[&a, &zero], &v).unwrap();
            for i in 0..4 {
                let x = a.at(i);
                let expected = smooth_indicator(x, width) + smooth_indicator_derivative(x, width) * x;
                assert_relative_eq!(d[0].at(i), expected, epsilon = 1e-14);
                assert_relative_eq!(d[0].at(i) + d[1].at(i), 1.0, epsilon = 1e-14);
            }
            assert_relative_eq!(d[0].at(1), 0.5, epsilon = 1e-15);
        }

        #[test]
        fn test_gradient_rejects_mismatched_result() {
            let grads = GradientTable::new(&config(2, 0.0));
            let a = rv(&[1.0, 2.0]);
            let v = rv(&[1.0, 2.0, 3.0]);
            assert!(matches!(
                grads.gradient(OpCode::Exp, &[&a], &v),
                Err(OpError::SizeMismatch { op: OpCode::Exp, expected: 2, got: 3 })
            ));
        }

        #[test]
        fn test_abs_gradient_sign() {
            let grads = GradientTable::new(&config(3, 0.0));
            let a = rv(&[-2.0, 0.0, 3.0]);
            let v = pricer_core::types::random_variable::abs(&a);
            let d = grads.gradient(OpCode::Abs, &[&a], &v).unwrap();
            assert_eq!(d[0].to_vec(), vec![-1.0, 1.0, 1.0]);
        }

        #[test]
        fn test_max_gradient_hard_kink() {
            let grads = GradientTable::new(&config(3, 0.0));
            let a = rv(&[-1.0, 0.0, 1.0]);
            let zero = RandomVariable::new(3, 0.0);
            let v = pricer_core::types::random_variable::max(&a, &zero);
            let d = grads.gradient(OpCode::Max, &[&a, &zero], &v).unwrap();
            assert_eq!(d[0].to_vec(), vec![0.0, 0.5, 1.0]);
            assert_eq!(d[1].to_vec(), vec![1.0, 0.5, 0.0]);
        }

        #[test]
        fn test_none_gradient_is_empty() {
            let grads = GradientTable::new(&config(1, 0.0));
            let v = RandomVariable::uninitialised();
            assert!(grads.gradient(OpCode::None, &[], &v).unwrap().is_empty());
        }
    }
}
