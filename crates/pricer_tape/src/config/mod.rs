//! Tape configuration.
//!
//! A [`TapeConfig`] fixes the parameters that the operation and gradient
//! tables close over: the number of Monte Carlo samples, the regression
//! setup of conditional expectation nodes and the indicator smoothing width.

mod error;

pub use error::ConfigError;

use pricer_core::math::basis::BasisFamily;
use serde::{Deserialize, Serialize};

/// Default polynomial order of conditional expectation regressions.
pub const DEFAULT_REGRESSION_ORDER: usize = 2;

/// Parameters of the operation and gradient tables.
///
/// Use [`TapeConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use pricer_core::math::basis::BasisFamily;
/// use pricer_tape::config::TapeConfig;
///
/// let config = TapeConfig::builder()
///     .sample_size(10_000)
///     .regression_order(3)
///     .basis_family(BasisFamily::Laguerre)
///     .eps(1e-4)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.sample_size(), 10_000);
/// assert_eq!(config.regression_variance_cutoff(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TapeConfig {
    /// Number of Monte Carlo samples per random variable.
    sample_size: usize,
    /// Maximum total degree of the regression basis.
    regression_order: usize,
    /// Polynomial family of the regression basis.
    basis_family: BasisFamily,
    /// Indicator smoothing parameter (0 = hard indicators).
    eps: f64,
    /// PCA variance cutoff applied to regressors (`None` = no PCA).
    regression_variance_cutoff: Option<f64>,
}

impl TapeConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> TapeConfigBuilder {
        TapeConfigBuilder::default()
    }

    /// Returns the number of samples.
    #[inline]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Returns the regression order.
    #[inline]
    pub fn regression_order(&self) -> usize {
        self.regression_order
    }

    /// Returns the regression basis family.
    #[inline]
    pub fn basis_family(&self) -> BasisFamily {
        self.basis_family
    }

    /// Returns the indicator smoothing parameter.
    #[inline]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Returns the PCA variance cutoff.
    #[inline]
    pub fn regression_variance_cutoff(&self) -> Option<f64> {
        self.regression_variance_cutoff
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `sample_size` is 0
    /// - `regression_order` is 0
    /// - `eps` is negative or not finite
    /// - the variance cutoff is outside `[0, 1)`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_size == 0 {
            return Err(ConfigError::InvalidSampleSize(self.sample_size));
        }
        if self.regression_order == 0 {
            return Err(ConfigError::InvalidRegressionOrder(self.regression_order));
        }
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "eps",
                value: format!("{} must be finite and non-negative", self.eps),
            });
        }
        if let Some(cutoff) = self.regression_variance_cutoff {
            if !(0.0..1.0).contains(&cutoff) {
                return Err(ConfigError::InvalidParameter {
                    name: "regression_variance_cutoff",
                    value: format!("{} must be in [0, 1)", cutoff),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`TapeConfig`].
///
/// `sample_size` is required; the other parameters default to order 2,
/// monomials, hard indicators and no PCA.
#[derive(Clone, Debug, Default)]
pub struct TapeConfigBuilder {
    sample_size: Option<usize>,
    regression_order: Option<usize>,
    basis_family: BasisFamily,
    eps: f64,
    regression_variance_cutoff: Option<f64>,
}

impl TapeConfigBuilder {
    /// Sets the number of samples.
    #[inline]
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    /// Sets the regression order.
    #[inline]
    pub fn regression_order(mut self, order: usize) -> Self {
        self.regression_order = Some(order);
        self
    }

    /// Sets the regression basis family.
    #[inline]
    pub fn basis_family(mut self, family: BasisFamily) -> Self {
        self.basis_family = family;
        self
    }

    /// Sets the indicator smoothing parameter.
    #[inline]
    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Enables PCA on regressors with the given variance cutoff.
    #[inline]
    pub fn regression_variance_cutoff(mut self, cutoff: f64) -> Self {
        self.regression_variance_cutoff = Some(cutoff);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `sample_size` is not set or any parameter is
    /// invalid (see [`TapeConfig::validate`]).
    pub fn build(self) -> Result<TapeConfig, ConfigError> {
        let sample_size = self.sample_size.ok_or(ConfigError::InvalidParameter {
            name: "sample_size",
            value: "must be specified".to_string(),
        })?;

        let config = TapeConfig {
            sample_size,
            regression_order: self.regression_order.unwrap_or(DEFAULT_REGRESSION_ORDER),
            basis_family: self.basis_family,
            eps: self.eps,
            regression_variance_cutoff: self.regression_variance_cutoff,
        };

        config.validate()?;
        Ok(config)
    }
}
