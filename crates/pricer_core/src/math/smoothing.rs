//! Smooth approximations for discontinuous functions.
//!
//! Indicator functions have no useful pathwise derivative. Following the
//! approach for AD of American Monte Carlo (Fries, 2017), the step is replaced
//! by a logistic function whose width scales with the root mean square of
//! its argument across paths, so the smoothing is invariant to the units of
//! the compared quantities.
//!
//! All scalar functions use generic type parameter `T: num_traits::Float` for f32/f64 support.

use num_traits::Float;

/// Width of the logistic step for a sample with mean square `mean_square`.
///
/// ```text
/// width = sqrt(mean_square) * eps / 2
/// ```
///
/// # Examples
/// ```
/// use pricer_core::math::smoothing::step_width;
///
/// assert_eq!(step_width(4.0_f64, 0.1), 0.1);
/// ```
#[inline]
pub fn step_width<T: Float>(mean_square: T, eps: T) -> T {
    let two = T::one() + T::one();
    mean_square.sqrt() * eps / two
}

/// Differentiable Heaviside function using sigmoid.
///
/// # Mathematical Definition
/// ```text
/// smooth_indicator(x, w) = 1 / (1 + exp(-x/w))
/// ```
///
/// # Convergence
/// As w -> 0:
/// - x < 0 -> 0
/// - x = 0 -> 0.5
/// - x > 0 -> 1
///
/// # Panics
/// Panics if width <= 0
#[inline]
pub fn smooth_indicator<T: Float>(x: T, width: T) -> T {
    assert!(width > T::zero(), "width must be positive");

    let one = T::one();
    one / (one + (-x / width).exp())
}

/// Derivative of [`smooth_indicator`] with respect to `x`.
///
/// # Mathematical Definition
/// ```text
/// d/dx smooth_indicator(x, w) = exp(-|x|/w) / (w * (1 + exp(-|x|/w))^2)
/// ```
///
/// Written in terms of `|x|` so the exponential never overflows.
///
/// # Panics
/// Panics if width <= 0
#[inline]
pub fn smooth_indicator_derivative<T: Float>(x: T, width: T) -> T {
    assert!(width > T::zero(), "width must be positive");

    let one = T::one();
    let e = (-x.abs() / width).exp();
    e / (width * (one + e) * (one + e))
}
