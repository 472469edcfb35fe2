//! Floating-point comparison with a relative tolerance.
//!
//! Graph simplification, constant folding and indicator ties all use the same
//! "close enough" relation so that the tape and its evaluators agree on what
//! counts as equal.

/// Default tolerance multiplier (in units of machine epsilon).
pub const DEFAULT_TOLERANCE_ULPS: u32 = 42;

/// Returns `true` if `x` and `y` agree within `42 * f64::EPSILON` relative
/// tolerance.
///
/// When either argument is exactly zero the comparison falls back to an
/// absolute tolerance of `(42 * f64::EPSILON)^2`. NaN is never close to
/// anything, infinities are only close to themselves.
///
/// # Examples
/// ```
/// use pricer_core::math::comparison::close_enough;
///
/// assert!(close_enough(0.1 + 0.2, 0.3));
/// assert!(!close_enough(1.0, 1.0 + 1e-10));
/// assert!(close_enough(0.0, 1e-40));
/// assert!(!close_enough(f64::NAN, f64::NAN));
/// ```
#[inline]
pub fn close_enough(x: f64, y: f64) -> bool {
    close_enough_n(x, y, DEFAULT_TOLERANCE_ULPS)
}

/// [`close_enough`] with an explicit tolerance multiplier `n`.
#[inline]
pub fn close_enough_n(x: f64, y: f64, n: u32) -> bool {
    if x == y {
        return true;
    }
    let diff = (x - y).abs();
    let tolerance = f64::from(n) * f64::EPSILON;
    if x * y == 0.0 {
        return diff < tolerance * tolerance;
    }
    diff <= tolerance * x.abs() || diff <= tolerance * y.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_equality() {
        assert!(close_enough(1.5, 1.5));
        assert!(close_enough(0.0, -0.0));
        assert!(close_enough(f64::INFINITY, f64::INFINITY));
    }

    #[test]
    fn test_relative_tolerance() {
        assert!(close_enough(1e10, 1e10 * (1.0 + 1e-15)));
        assert!(!close_enough(1e10, 1e10 * (1.0 + 1e-12)));
    }

    #[test]
    fn test_zero_uses_absolute_tolerance() {
        assert!(close_enough(0.0, 1e-30));
        assert!(!close_enough(0.0, 1e-20));
    }

    #[test]
    fn test_nan_never_close() {
        assert!(!close_enough(f64::NAN, 1.0));
        assert!(!close_enough(f64::NAN, f64::NAN));
    }

    #[test]
    fn test_custom_tolerance() {
        assert!(close_enough_n(1.0, 1.0 + 1e-12, 10_000));
        assert!(!close_enough_n(1.0, 1.0 + 1e-12, 42));
    }
}
