//! Vectorised Monte Carlo path variables.
//!
//! A [`RandomVariable`] holds one value per simulated path. Values that are
//! identical across paths (constants, deterministic model quantities) are
//! stored once and broadcast, which keeps constant-heavy payoff tapes cheap.
//!
//! # States
//!
//! - *uninitialised*: no value yet (e.g. a leaf the executor has not bound)
//! - *deterministic*: a single value broadcast to `size` paths
//! - *stochastic*: one value per path
//!
//! Elementwise operations keep the deterministic representation whenever all
//! operands are deterministic and propagate the uninitialised state.
//! Numerical edge cases are not guarded: `1/0`, `ln(-1)` etc. follow IEEE 754.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::math::comparison::close_enough;
use crate::math::distributions::{norm_cdf, norm_pdf};
use crate::math::smoothing::{smooth_indicator, smooth_indicator_derivative, step_width};

#[derive(Clone, Debug, Default, PartialEq)]
enum Samples {
    #[default]
    Uninitialised,
    Deterministic(f64),
    Stochastic(Vec<f64>),
}

/// A vector of Monte Carlo samples.
///
/// # Examples
///
/// ```rust
/// use pricer_core::types::RandomVariable;
///
/// let s = RandomVariable::from_values(vec![90.0, 100.0, 110.0]);
/// let k = RandomVariable::new(3, 100.0);
///
/// let diff = &s - &k;
/// assert!(!diff.is_deterministic());
/// assert_eq!(diff.to_vec(), vec![-10.0, 0.0, 10.0]);
///
/// let two = &k / &RandomVariable::new(3, 50.0);
/// assert!(two.is_deterministic());
/// assert_eq!(two.at(2), 2.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RandomVariable {
    size: usize,
    samples: Samples,
}

impl RandomVariable {
    /// Creates a deterministic variable broadcasting `value` to `size` paths.
    #[inline]
    pub fn new(size: usize, value: f64) -> Self {
        Self {
            size,
            samples: Samples::Deterministic(value),
        }
    }

    /// Creates a stochastic variable with one value per path.
    #[inline]
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            size: values.len(),
            samples: Samples::Stochastic(values),
        }
    }

    /// Creates an uninitialised variable.
    #[inline]
    pub fn uninitialised() -> Self {
        Self::default()
    }

    /// Number of paths.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns `false` for variables that do not carry a value yet.
    #[inline]
    pub fn is_initialised(&self) -> bool {
        !matches!(self.samples, Samples::Uninitialised)
    }

    /// Returns `true` if all paths share a single stored value.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self.samples, Samples::Deterministic(_))
    }

    /// Value on path `i`. Uninitialised variables read as NaN.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range for a stochastic variable.
    #[inline]
    pub fn at(&self, i: usize) -> f64 {
        match &self.samples {
            Samples::Uninitialised => f64::NAN,
            Samples::Deterministic(v) => *v,
            Samples::Stochastic(values) => values[i],
        }
    }

    /// Iterates over all path values (broadcasting deterministic values).
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.size).map(move |i| self.at(i))
    }

    /// Expanded copy of the path values.
    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Applies `f` to every path value.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        match &self.samples {
            Samples::Uninitialised => Self::uninitialised(),
            Samples::Deterministic(v) => Self::new(self.size, f(*v)),
            Samples::Stochastic(values) => Self::from_values(values.iter().map(|&x| f(x)).collect()),
        }
    }

    /// Combines two variables pathwise.
    ///
    /// # Panics
    ///
    /// Panics if both operands are initialised and their sizes differ.
    pub fn zip_with<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        if !self.is_initialised() || !other.is_initialised() {
            return Self::uninitialised();
        }
        assert_eq!(
            self.size, other.size,
            "RandomVariable: size mismatch ({} vs {})",
            self.size, other.size
        );
        match (&self.samples, &other.samples) {
            (Samples::Deterministic(a), Samples::Deterministic(b)) => Self::new(self.size, f(*a, *b)),
            (Samples::Deterministic(a), Samples::Stochastic(ys)) => {
                Self::from_values(ys.iter().map(|&y| f(*a, y)).collect())
            }
            (Samples::Stochastic(xs), Samples::Deterministic(b)) => {
                Self::from_values(xs.iter().map(|&x| f(x, *b)).collect())
            }
            (Samples::Stochastic(xs), Samples::Stochastic(ys)) => {
                Self::from_values(xs.iter().zip(ys).map(|(&x, &y)| f(x, y)).collect())
            }
            _ => Self::uninitialised(),
        }
    }

    /// Arithmetic mean over all paths (NaN for an empty variable).
    pub fn mean(&self) -> f64 {
        match &self.samples {
            Samples::Deterministic(v) => *v,
            Samples::Stochastic(values) if !values.is_empty() => {
                values.iter().sum::<f64>() / values.len() as f64
            }
            _ => f64::NAN,
        }
    }

    /// Mean of the squared path values.
    pub fn mean_square(&self) -> f64 {
        match &self.samples {
            Samples::Deterministic(v) => v * v,
            Samples::Stochastic(values) if !values.is_empty() => {
                values.iter().map(|x| x * x).sum::<f64>() / values.len() as f64
            }
            _ => f64::NAN,
        }
    }

    /// Unconditional expectation broadcast to all paths.
    pub fn expectation(&self) -> Self {
        match &self.samples {
            Samples::Stochastic(_) => Self::new(self.size, self.mean()),
            _ => self.clone(),
        }
    }

    /// Returns `true` if every path value is close enough to `value`.
    pub fn is_close_to(&self, value: f64) -> bool {
        match &self.samples {
            Samples::Uninitialised => false,
            Samples::Deterministic(v) => close_enough(*v, value),
            Samples::Stochastic(values) => values.iter().all(|&x| close_enough(x, value)),
        }
    }

    /// Returns `true` if both variables agree pathwise up to "close enough".
    pub fn close_enough_all(&self, other: &Self) -> bool {
        if self.size != other.size || self.is_initialised() != other.is_initialised() {
            return false;
        }
        (0..self.size).all(|i| close_enough(self.at(i), other.at(i)))
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&RandomVariable> for &RandomVariable {
            type Output = RandomVariable;

            #[inline]
            fn $method(self, rhs: &RandomVariable) -> RandomVariable {
                self.zip_with(rhs, |a, b| a $op b)
            }
        }

        impl $trait for RandomVariable {
            type Output = RandomVariable;

            #[inline]
            fn $method(self, rhs: RandomVariable) -> RandomVariable {
                (&self).$method(&rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, +);
impl_binary_op!(Sub, sub, -);
impl_binary_op!(Mul, mul, *);
impl_binary_op!(Div, div, /);

impl Neg for &RandomVariable {
    type Output = RandomVariable;

    #[inline]
    fn neg(self) -> RandomVariable {
        self.map(|x| -x)
    }
}

impl Neg for RandomVariable {
    type Output = RandomVariable;

    #[inline]
    fn neg(self) -> RandomVariable {
        -&self
    }
}

/// Pathwise exponential.
pub fn exp(x: &RandomVariable) -> RandomVariable {
    x.map(f64::exp)
}

/// Pathwise natural logarithm.
pub fn log(x: &RandomVariable) -> RandomVariable {
    x.map(f64::ln)
}

/// Pathwise square root.
pub fn sqrt(x: &RandomVariable) -> RandomVariable {
    x.map(f64::sqrt)
}

/// Pathwise absolute value.
pub fn abs(x: &RandomVariable) -> RandomVariable {
    x.map(f64::abs)
}

/// Pathwise power `x^y`.
pub fn pow(x: &RandomVariable, y: &RandomVariable) -> RandomVariable {
    x.zip_with(y, f64::powf)
}

/// Pathwise standard normal CDF.
pub fn normal_cdf(x: &RandomVariable) -> RandomVariable {
    x.map(norm_cdf)
}

/// Pathwise standard normal density.
pub fn normal_pdf(x: &RandomVariable) -> RandomVariable {
    x.map(norm_pdf)
}

/// Pathwise minimum.
pub fn min(x: &RandomVariable, y: &RandomVariable) -> RandomVariable {
    x.zip_with(y, f64::min)
}

/// Pathwise maximum.
pub fn max(x: &RandomVariable, y: &RandomVariable) -> RandomVariable {
    x.zip_with(y, f64::max)
}

/// `true_val` where `x` and `y` are close enough, `false_val` elsewhere.
pub fn indicator_eq(
    x: &RandomVariable,
    y: &RandomVariable,
    true_val: f64,
    false_val: f64,
) -> RandomVariable {
    x.zip_with(y, |a, b| if close_enough(a, b) { true_val } else { false_val })
}

/// Indicator of `x > y`.
///
/// With `eps == 0` this is a hard comparison where near-ties count as *not*
/// greater. With `eps > 0` the step is replaced by a logistic function of
/// width `rms(x - y) * eps / 2`.
pub fn indicator_gt(
    x: &RandomVariable,
    y: &RandomVariable,
    true_val: f64,
    false_val: f64,
    eps: f64,
) -> RandomVariable {
    if let Some(smoothed) = smoothed_indicator(x, y, true_val, false_val, eps) {
        return smoothed;
    }
    x.zip_with(y, |a, b| {
        if a > b && !close_enough(a, b) {
            true_val
        } else {
            false_val
        }
    })
}

/// Indicator of `x >= y`. Near-ties count as greater or equal.
///
/// See [`indicator_gt`] for the meaning of `eps`.
pub fn indicator_geq(
    x: &RandomVariable,
    y: &RandomVariable,
    true_val: f64,
    false_val: f64,
    eps: f64,
) -> RandomVariable {
    if let Some(smoothed) = smoothed_indicator(x, y, true_val, false_val, eps) {
        return smoothed;
    }
    x.zip_with(y, |a, b| {
        if a > b || close_enough(a, b) {
            true_val
        } else {
            false_val
        }
    })
}

/// Step function `H(x)` used by min/max derivatives.
///
/// Logistic with the same width as [`indicator_gt`] when `eps > 0`; otherwise
/// the hard step with value `0.5` at (close enough) ties.
pub fn smoothed_step(x: &RandomVariable, eps: f64) -> RandomVariable {
    match logistic_width(x, eps) {
        Some(width) => x.map(|d| smooth_indicator(d, width)),
        None => x.map(|d| {
            if close_enough(d, 0.0) {
                0.5
            } else if d > 0.0 {
                1.0
            } else {
                0.0
            }
        }),
    }
}

/// Density `H'(x)` of the logistic step; identically zero when smoothing is
/// disabled or `x` is deterministic.
pub fn indicator_derivative(x: &RandomVariable, eps: f64) -> RandomVariable {
    if !x.is_initialised() {
        return RandomVariable::uninitialised();
    }
    match logistic_width(x, eps) {
        Some(width) => x.map(|d| smooth_indicator_derivative(d, width)),
        None => RandomVariable::new(x.size(), 0.0),
    }
}

fn logistic_width(x: &RandomVariable, eps: f64) -> Option<f64> {
    if close_enough(eps, 0.0) || !x.is_initialised() || x.is_deterministic() {
        return None;
    }
    let width = step_width(x.mean_square(), eps);
    if close_enough(width, 0.0) || !width.is_finite() {
        None
    } else {
        Some(width)
    }
}

fn smoothed_indicator(
    x: &RandomVariable,
    y: &RandomVariable,
    true_val: f64,
    false_val: f64,
    eps: f64,
) -> Option<RandomVariable> {
    let diff = x - y;
    let width = logistic_width(&diff, eps)?;
    Some(diff.map(|d| false_val + (true_val - false_val) * smooth_indicator(d, width)))
}
