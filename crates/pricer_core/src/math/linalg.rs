//! Dense linear algebra for regression.
//!
//! - [`least_squares`]: QR least squares with an SVD fallback for
//!   rank-deficient design matrices
//! - [`CoordinateTransform`]: PCA factor reduction of a set of regressors

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{MathError, RandomVariable};

/// Solves `min ||A x - b||_2`.
///
/// A Householder QR factorisation is used when `A` has at least as many rows
/// as columns and `R` has no negligible diagonal entry. Otherwise the
/// minimum-norm solution is obtained from an SVD, truncating singular values
/// below `max(m, n) * eps * sigma_max`.
///
/// # Errors
///
/// Returns `MathError::DimensionMismatch` if `b` does not have one entry per
/// row of `A`, and `MathError::SingularSystem` if the SVD solve fails.
///
/// # Examples
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use pricer_core::math::linalg::least_squares;
///
/// // Fit y = 1 + 2x exactly
/// let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
/// let b = DVector::from_vec(vec![1.0, 3.0, 5.0]);
/// let x = least_squares(&a, &b).unwrap();
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!((x[1] - 2.0).abs() < 1e-12);
/// ```
pub fn least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, MathError> {
    let (m, n) = a.shape();
    if b.len() != m {
        return Err(MathError::DimensionMismatch {
            expected: m,
            got: b.len(),
        });
    }
    if n == 0 {
        return Ok(DVector::zeros(0));
    }

    if m >= n {
        let qr = a.clone().qr();
        let r = qr.r();
        let max_diag = r.diagonal().iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
        let rank_tolerance = max_diag * m.max(n) as f64 * f64::EPSILON;
        let full_rank = max_diag > 0.0 && r.diagonal().iter().all(|d| d.abs() > rank_tolerance);
        if full_rank {
            let qtb = qr.q().transpose() * b;
            if let Some(x) = r.solve_upper_triangular(&qtb) {
                return Ok(x);
            }
        }
    }

    debug!(rows = m, cols = n, "design matrix rank deficient, using SVD least squares");
    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.iter().fold(0.0_f64, |acc, s| acc.max(*s));
    let tolerance = sigma_max * m.max(n) as f64 * f64::EPSILON;
    svd.solve(b, tolerance)
        .map_err(|msg| MathError::SingularSystem(msg.to_string()))
}

/// Linear map from regressor space to a reduced factor space.
///
/// Stored row-major as a `rows x cols` matrix, `rows <= cols`; each row is a
/// principal direction of the regressor covariance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl CoordinateTransform {
    /// Builds a PCA transform keeping the leading principal components that
    /// explain at least `1 - variance_cutoff` of the total variance.
    ///
    /// Regressors with zero total variance yield a transform with zero rows.
    ///
    /// # Errors
    ///
    /// Returns `MathError::Uninitialised` for an uninitialised regressor and
    /// `MathError::DimensionMismatch` if regressor sizes differ.
    pub fn pca(regressor: &[&RandomVariable], variance_cutoff: f64) -> Result<Self, MathError> {
        let n = regressor.len();
        if n == 0 {
            return Ok(Self {
                rows: 0,
                cols: 0,
                data: Vec::new(),
            });
        }
        let samples = check_regressor(regressor)?;

        let means: Vec<f64> = regressor.iter().map(|r| r.mean()).collect();
        let mut covariance = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;
                for k in 0..samples {
                    sum += (regressor[i].at(k) - means[i]) * (regressor[j].at(k) - means[j]);
                }
                let cov = if samples > 0 { sum / samples as f64 } else { 0.0 };
                covariance[(i, j)] = cov;
                covariance[(j, i)] = cov;
            }
        }

        let eigen = SymmetricEigen::new(covariance);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let total_variance: f64 = eigen.eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let target = total_variance * (1.0 - variance_cutoff);
        let mut explained = 0.0;
        let mut keep = 0;
        while keep < n && explained < target {
            explained += eigen.eigenvalues[order[keep]].max(0.0);
            keep += 1;
        }

        let mut data = Vec::with_capacity(keep * n);
        for &component in order.iter().take(keep) {
            data.extend(eigen.eigenvectors.column(component).iter().copied());
        }
        debug!(
            regressors = n,
            factors = keep,
            total_variance,
            "built PCA coordinate transform"
        );
        Ok(Self {
            rows: keep,
            cols: n,
            data,
        })
    }

    /// Number of factors produced.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of regressors consumed.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `true` if the transform maps to an empty factor space.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Coefficient of regressor `j` in factor `i`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    /// Maps `regressor` into factor space.
    ///
    /// # Errors
    ///
    /// Returns `MathError::DimensionMismatch` if the number of regressors
    /// does not match `cols()`.
    pub fn apply(&self, regressor: &[&RandomVariable]) -> Result<Vec<RandomVariable>, MathError> {
        if regressor.len() != self.cols {
            return Err(MathError::DimensionMismatch {
                expected: self.cols,
                got: regressor.len(),
            });
        }
        let samples = check_regressor(regressor)?;
        let factors = (0..self.rows)
            .map(|i| {
                regressor
                    .iter()
                    .enumerate()
                    .fold(RandomVariable::new(samples, 0.0), |acc, (j, r)| {
                        &acc + &r.map(|x| self.get(i, j) * x)
                    })
            })
            .collect();
        Ok(factors)
    }
}

/// Checks that all regressors are initialised and of equal size; returns the size.
fn check_regressor(regressor: &[&RandomVariable]) -> Result<usize, MathError> {
    let samples = regressor.first().map(|r| r.size()).unwrap_or(0);
    for (i, r) in regressor.iter().enumerate() {
        if !r.is_initialised() {
            return Err(MathError::Uninitialised(format!("regressor #{}", i)));
        }
        if r.size() != samples {
            return Err(MathError::DimensionMismatch {
                expected: samples,
                got: r.size(),
            });
        }
    }
    Ok(samples)
}
