//! Criterion benchmarks for pricer_core regression kernels.
//!
//! Measures basis evaluation, least squares fitting and PCA across sample
//! counts to characterise scaling behaviour.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_core::math::basis::{BasisDescriptor, BasisFamily, BasisSystem};
use pricer_core::math::linalg::CoordinateTransform;
use pricer_core::types::RandomVariable;

/// Generate `dim` equidistributed regressors with `n` samples each.
fn generate_regressor(n: usize, dim: usize) -> Vec<RandomVariable> {
    let alphas = [0.618_033_988_7, 0.414_213_562_3, 0.732_050_807_5, 0.236_067_977_5];
    (0..dim)
        .map(|d| {
            let alpha = alphas[d % alphas.len()];
            RandomVariable::from_values(
                (0..n)
                    .map(|i| ((i as f64 + 1.0) * alpha).fract() * 2.0 - 1.0)
                    .collect(),
            )
        })
        .collect()
}

/// Benchmark basis function evaluation.
fn bench_basis_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("basis_evaluation");

    for size in [1000, 10000] {
        let regressor = generate_regressor(size, 3);
        let refs: Vec<&RandomVariable> = regressor.iter().collect();
        let basis = BasisSystem::new(BasisDescriptor::new(3, 3, BasisFamily::Laguerre)).unwrap();

        group.bench_with_input(BenchmarkId::new("laguerre_dim3_order3", size), &refs, |b, refs| {
            b.iter(|| basis.evaluate(black_box(refs)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark regression coefficient fitting.
fn bench_regression_coefficients(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression_coefficients");

    for size in [1000, 10000] {
        let regressor = generate_regressor(size, 2);
        let refs: Vec<&RandomVariable> = regressor.iter().collect();
        let regressand = (&regressor[0] * &regressor[1]).map(|x| x.exp());
        let basis = BasisSystem::new(BasisDescriptor::new(2, 4, BasisFamily::Monomial)).unwrap();

        group.bench_with_input(BenchmarkId::new("monomial_dim2_order4", size), &refs, |b, refs| {
            b.iter(|| {
                basis
                    .regression_coefficients(black_box(&regressand), refs, None)
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark PCA construction.
fn bench_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("pca");

    for size in [1000, 10000] {
        let regressor = generate_regressor(size, 4);
        let refs: Vec<&RandomVariable> = regressor.iter().collect();

        group.bench_with_input(BenchmarkId::new("dim4", size), &refs, |b, refs| {
            b.iter(|| CoordinateTransform::pca(black_box(refs), 1e-6).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_basis_evaluation,
    bench_regression_coefficients,
    bench_pca
);
criterion_main!(benches);
