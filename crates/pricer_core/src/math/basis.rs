//! Multi-dimensional polynomial basis systems for Monte Carlo regression.
//!
//! A [`BasisSystem`] is the set of products `p_{k1}(x_1) * ... * p_{kd}(x_d)`
//! of univariate polynomials from one [`BasisFamily`] whose total degree
//! `k1 + ... + kd` does not exceed the order. Variables can be split into
//! groups; the system is then the union of the per-group systems, so no
//! cross terms between groups are generated.
//!
//! A system is fully described by its [`BasisDescriptor`], which is what gets
//! serialised. Deserialising rebuilds the terms from the descriptor.
//!
//! # Examples
//!
//! ```rust
//! use pricer_core::math::basis::{BasisDescriptor, BasisFamily, BasisSystem};
//! use pricer_core::types::RandomVariable;
//!
//! // 1, y, x, y^2, xy, x^2
//! let basis = BasisSystem::new(BasisDescriptor::new(2, 2, BasisFamily::Monomial)).unwrap();
//! assert_eq!(basis.len(), 6);
//!
//! let x = RandomVariable::from_values(vec![1.0, 2.0]);
//! let y = RandomVariable::from_values(vec![3.0, 4.0]);
//! let coefficients = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0];
//! let xy = basis.combine(&[&x, &y], &coefficients).unwrap();
//! assert_eq!(xy.to_vec(), vec![3.0, 8.0]);
//! ```

use std::collections::BTreeSet;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::linalg::least_squares;
use crate::types::{MathError, RandomVariable};

/// Univariate polynomial family used to build a basis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasisFamily {
    /// `1, x, x^2, ...`
    #[default]
    Monomial,
    /// Laguerre polynomials `L_n`.
    Laguerre,
    /// Physicists' Hermite polynomials `H_n`.
    Hermite,
    /// Legendre polynomials `P_n`.
    Legendre,
    /// Chebyshev polynomials of the first kind `T_n`.
    Chebyshev,
    /// Chebyshev polynomials of the second kind `U_n`.
    Chebyshev2nd,
}

impl BasisFamily {
    /// Evaluates the polynomial of the given degree at `x` by its three-term
    /// recurrence.
    ///
    /// # Examples
    /// ```
    /// use pricer_core::math::basis::BasisFamily;
    ///
    /// assert_eq!(BasisFamily::Hermite.evaluate(2, 1.0), 2.0); // 4x^2 - 2
    /// assert_eq!(BasisFamily::Chebyshev.evaluate(3, 0.5), -1.0); // 4x^3 - 3x
    /// ```
    pub fn evaluate(&self, degree: usize, x: f64) -> f64 {
        if let BasisFamily::Monomial = self {
            return x.powi(degree as i32);
        }
        let mut prev = 1.0;
        if degree == 0 {
            return prev;
        }
        let mut curr = match self {
            BasisFamily::Laguerre => 1.0 - x,
            BasisFamily::Hermite | BasisFamily::Chebyshev2nd => 2.0 * x,
            _ => x,
        };
        for n in 1..degree {
            let nf = n as f64;
            let next = match self {
                BasisFamily::Laguerre => ((2.0 * nf + 1.0 - x) * curr - nf * prev) / (nf + 1.0),
                BasisFamily::Hermite => 2.0 * x * curr - 2.0 * nf * prev,
                BasisFamily::Legendre => ((2.0 * nf + 1.0) * x * curr - nf * prev) / (nf + 1.0),
                _ => 2.0 * x * curr - prev,
            };
            prev = curr;
            curr = next;
        }
        curr
    }
}

/// Number of multi-indices in `dimension` variables with total degree at
/// most `order`, i.e. `C(dimension + order, order)`.
pub fn basis_size(dimension: usize, order: usize) -> usize {
    (1..=order).fold(1usize, |acc, k| {
        acc.saturating_mul(dimension + k) / k
    })
}

/// Serialisable description of a [`BasisSystem`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisDescriptor {
    /// Number of regressor variables.
    pub dimension: usize,
    /// Maximum total degree (before applying `size_bound`).
    pub order: usize,
    /// Polynomial family.
    pub family: BasisFamily,
    /// If set, the order is reduced (down to 1) until the number of terms
    /// does not exceed this bound.
    pub size_bound: Option<usize>,
    /// Variable groups; empty means a single group with all variables.
    pub var_groups: Vec<Vec<usize>>,
}

impl BasisDescriptor {
    /// Descriptor for a single global group and no size bound.
    pub fn new(dimension: usize, order: usize, family: BasisFamily) -> Self {
        Self {
            dimension,
            order,
            family,
            size_bound: None,
            var_groups: Vec::new(),
        }
    }

    /// Sets the size bound.
    pub fn with_size_bound(mut self, size_bound: usize) -> Self {
        self.size_bound = Some(size_bound);
        self
    }

    /// Sets the variable groups.
    pub fn with_var_groups(mut self, var_groups: Vec<Vec<usize>>) -> Self {
        self.var_groups = var_groups;
        self
    }
}

/// A polynomial basis system built from a [`BasisDescriptor`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BasisDescriptor", into = "BasisDescriptor")]
pub struct BasisSystem {
    descriptor: BasisDescriptor,
    effective_order: usize,
    /// Exponent of each variable, one entry per basis function.
    terms: Vec<Vec<usize>>,
}

impl BasisSystem {
    /// Builds the basis functions described by `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns `MathError::InvalidBasis` if the order is zero or a variable
    /// group refers to a variable outside `0..dimension`.
    pub fn new(descriptor: BasisDescriptor) -> Result<Self, MathError> {
        if descriptor.order == 0 {
            return Err(MathError::InvalidBasis("order must be positive".to_string()));
        }
        for group in &descriptor.var_groups {
            if let Some(&v) = group.iter().find(|&&v| v >= descriptor.dimension) {
                return Err(MathError::InvalidBasis(format!(
                    "variable {} in group outside dimension {}",
                    v, descriptor.dimension
                )));
            }
        }

        let groups: Vec<Vec<usize>> = if descriptor.var_groups.is_empty() {
            vec![(0..descriptor.dimension).collect()]
        } else {
            descriptor.var_groups.clone()
        };

        let mut effective_order = descriptor.order;
        if let (Some(bound), true) = (descriptor.size_bound, descriptor.var_groups.is_empty()) {
            while effective_order > 1 && basis_size(descriptor.dimension, effective_order) > bound {
                effective_order -= 1;
            }
        }
        let mut terms = build_terms(descriptor.dimension, effective_order, &groups);
        if let Some(bound) = descriptor.size_bound {
            while terms.len() > bound && effective_order > 1 {
                effective_order -= 1;
                terms = build_terms(descriptor.dimension, effective_order, &groups);
            }
        }

        Ok(Self {
            descriptor,
            effective_order,
            terms,
        })
    }

    /// The descriptor this system was built from.
    pub fn descriptor(&self) -> &BasisDescriptor {
        &self.descriptor
    }

    /// Order after applying the size bound.
    pub fn effective_order(&self) -> usize {
        self.effective_order
    }

    /// Number of basis functions.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the system has no functions.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Exponent vectors of the basis functions.
    pub fn terms(&self) -> &[Vec<usize>] {
        &self.terms
    }

    /// Evaluates every basis function on the regressor.
    ///
    /// # Errors
    ///
    /// Returns `MathError::DimensionMismatch` if the number of regressors or
    /// their sizes disagree with the system.
    pub fn evaluate(&self, regressor: &[&RandomVariable]) -> Result<Vec<RandomVariable>, MathError> {
        if regressor.len() != self.descriptor.dimension {
            return Err(MathError::DimensionMismatch {
                expected: self.descriptor.dimension,
                got: regressor.len(),
            });
        }
        let size = regressor.first().map(|r| r.size()).unwrap_or(1);
        if let Some(r) = regressor.iter().find(|r| r.size() != size) {
            return Err(MathError::DimensionMismatch {
                expected: size,
                got: r.size(),
            });
        }

        // powers[v][k] = p_k(x_v)
        let powers: Vec<Vec<RandomVariable>> = regressor
            .iter()
            .map(|r| {
                (0..=self.effective_order)
                    .map(|k| {
                        let family = self.descriptor.family;
                        r.map(move |x| family.evaluate(k, x))
                    })
                    .collect()
            })
            .collect();

        let values = self
            .terms
            .iter()
            .map(|term| {
                term.iter()
                    .enumerate()
                    .filter(|&(_, &k)| k > 0)
                    .fold(RandomVariable::new(size, 1.0), |acc, (v, &k)| &acc * &powers[v][k])
            })
            .collect();
        Ok(values)
    }

    /// Evaluates `sum_i coefficients[i] * f_i(regressor)`.
    ///
    /// # Errors
    ///
    /// Returns `MathError::DimensionMismatch` if `coefficients` does not have
    /// one entry per basis function, or as [`BasisSystem::evaluate`].
    pub fn combine(
        &self,
        regressor: &[&RandomVariable],
        coefficients: &[f64],
    ) -> Result<RandomVariable, MathError> {
        if coefficients.len() != self.terms.len() {
            return Err(MathError::DimensionMismatch {
                expected: self.terms.len(),
                got: coefficients.len(),
            });
        }
        let values = self.evaluate(regressor)?;
        let size = regressor.first().map(|r| r.size()).unwrap_or(1);
        Ok(values
            .iter()
            .zip(coefficients)
            .fold(RandomVariable::new(size, 0.0), |acc, (f, &c)| {
                &acc + &f.map(|x| c * x)
            }))
    }

    /// Least squares coefficients of `regressand` on this basis.
    ///
    /// Samples where `filter` is `false` contribute a zero row.
    ///
    /// # Errors
    ///
    /// Returns `MathError::Uninitialised` for an uninitialised regressand,
    /// `MathError::DimensionMismatch` if sizes disagree, or the least squares
    /// error.
    pub fn regression_coefficients(
        &self,
        regressand: &RandomVariable,
        regressor: &[&RandomVariable],
        filter: Option<&[bool]>,
    ) -> Result<Vec<f64>, MathError> {
        if !regressand.is_initialised() {
            return Err(MathError::Uninitialised("regressand".to_string()));
        }
        let samples = regressand.size();
        if let Some(r) = regressor.iter().find(|r| r.size() != samples) {
            return Err(MathError::DimensionMismatch {
                expected: samples,
                got: r.size(),
            });
        }
        if let Some(f) = filter {
            if f.len() != samples {
                return Err(MathError::DimensionMismatch {
                    expected: samples,
                    got: f.len(),
                });
            }
        }
        let keep = |i: usize| filter.map_or(true, |f| f[i]);

        let values = self.evaluate(regressor)?;
        let mut a = DMatrix::<f64>::zeros(samples, values.len());
        for (j, column) in values.iter().enumerate() {
            for i in (0..samples).filter(|&i| keep(i)) {
                a[(i, j)] = column.at(i);
            }
        }
        let b = DVector::from_iterator(
            samples,
            (0..samples).map(|i| if keep(i) { regressand.at(i) } else { 0.0 }),
        );
        Ok(least_squares(&a, &b)?.iter().copied().collect())
    }

    /// Regression estimate of `E[regressand | regressor]`.
    ///
    /// A deterministic regressand is its own conditional expectation.
    ///
    /// # Errors
    ///
    /// See [`BasisSystem::regression_coefficients`].
    pub fn conditional_expectation(
        &self,
        regressand: &RandomVariable,
        regressor: &[&RandomVariable],
        filter: Option<&[bool]>,
    ) -> Result<RandomVariable, MathError> {
        if regressand.is_deterministic() {
            return Ok(regressand.clone());
        }
        let coefficients = self.regression_coefficients(regressand, regressor, filter)?;
        self.combine(regressor, &coefficients)
    }
}

impl TryFrom<BasisDescriptor> for BasisSystem {
    type Error = MathError;

    fn try_from(descriptor: BasisDescriptor) -> Result<Self, Self::Error> {
        Self::new(descriptor)
    }
}

impl From<BasisSystem> for BasisDescriptor {
    fn from(basis: BasisSystem) -> Self {
        basis.descriptor
    }
}

/// Union over groups of the exponent vectors with total degree `<= order`,
/// in graded lexicographic order.
fn build_terms(dimension: usize, order: usize, groups: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut terms = BTreeSet::new();
    for group in groups {
        let mut exponents = vec![0; dimension];
        collect_terms(group, order, &mut exponents, &mut terms);
    }
    terms.into_iter().map(|(_, term)| term).collect()
}

fn collect_terms(
    vars: &[usize],
    remaining: usize,
    exponents: &mut Vec<usize>,
    out: &mut BTreeSet<(usize, Vec<usize>)>,
) {
    match vars.split_first() {
        None => {
            let degree = exponents.iter().sum();
            out.insert((degree, exponents.clone()));
        }
        Some((&v, rest)) => {
            for k in 0..=remaining {
                exponents[v] = k;
                collect_terms(rest, remaining - k, exponents, out);
            }
            exponents[v] = 0;
        }
    }
}
