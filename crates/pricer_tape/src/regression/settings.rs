//! Regression model settings.

use serde::{Deserialize, Serialize};

use super::layout::AssetClass;
use crate::config::ConfigError;

/// Which pre-observation ("lagged") model states enter the regressor in
/// addition to the full state at the observation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegressorModel {
    /// State at the observation time only.
    #[default]
    Simple,
    /// Lagged IR, FX and EQ states.
    Lagged,
    /// Lagged IR states.
    LaggedIr,
    /// Lagged FX states.
    LaggedFx,
    /// Lagged EQ states.
    LaggedEq,
}

impl RegressorModel {
    /// Returns `true` if lagged states of `asset_class` are included.
    pub fn includes(self, asset_class: AssetClass) -> bool {
        matches!(
            (self, asset_class),
            (RegressorModel::Lagged, _)
                | (RegressorModel::LaggedIr, AssetClass::Ir)
                | (RegressorModel::LaggedFx, AssetClass::Fx)
                | (RegressorModel::LaggedEq, AssetClass::Eq)
        )
    }
}

/// Grouping of regressor variables into basis function blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VarGroupMode {
    /// One joint basis over all variables, including cross terms.
    #[default]
    Global,
    /// One basis per variable, no cross terms.
    Trivial,
}

impl VarGroupMode {
    /// Variable groups for a regressor of dimension `dimension`; empty means
    /// a single global group.
    pub fn groups(self, dimension: usize) -> Vec<Vec<usize>> {
        match self {
            VarGroupMode::Global => Vec::new(),
            VarGroupMode::Trivial => (0..dimension).map(|i| vec![i]).collect(),
        }
    }
}

/// Settings of a [`RegressionModel`](super::RegressionModel).
///
/// Use [`RegressionSettingsBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use pricer_tape::regression::{AssetClass, RegressionSettings, RegressorModel, VarGroupMode};
///
/// let settings = RegressionSettings::builder()
///     .regressor_model(RegressorModel::LaggedFx)
///     .max_sim_times(AssetClass::Fx, 4)
///     .variance_cutoff(1e-5)
///     .var_group_mode(VarGroupMode::Trivial)
///     .build()
///     .expect("valid settings");
///
/// assert_eq!(settings.max_sim_times(AssetClass::Fx), 4);
/// assert_eq!(settings.max_sim_times(AssetClass::Ir), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionSettings {
    regressor_model: RegressorModel,
    max_sim_times_ir: usize,
    max_sim_times_fx: usize,
    max_sim_times_eq: usize,
    variance_cutoff: Option<f64>,
    var_group_mode: VarGroupMode,
}

impl RegressionSettings {
    /// Creates a new settings builder.
    #[inline]
    pub fn builder() -> RegressionSettingsBuilder {
        RegressionSettingsBuilder::default()
    }

    /// Returns the regressor model.
    #[inline]
    pub fn regressor_model(&self) -> RegressorModel {
        self.regressor_model
    }

    /// Cap on distinct lagged simulation times per state index of
    /// `asset_class` (0 = no cap).
    #[inline]
    pub fn max_sim_times(&self, asset_class: AssetClass) -> usize {
        match asset_class {
            AssetClass::Ir => self.max_sim_times_ir,
            AssetClass::Fx => self.max_sim_times_fx,
            AssetClass::Eq => self.max_sim_times_eq,
        }
    }

    /// Returns the PCA variance cutoff.
    #[inline]
    pub fn variance_cutoff(&self) -> Option<f64> {
        self.variance_cutoff
    }

    /// Returns the variable grouping mode.
    #[inline]
    pub fn var_group_mode(&self) -> VarGroupMode {
        self.var_group_mode
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` if the variance cutoff is
    /// outside `[0, 1)`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(cutoff) = self.variance_cutoff {
            if !(0.0..1.0).contains(&cutoff) {
                return Err(ConfigError::InvalidParameter {
                    name: "variance_cutoff",
                    value: format!("{} must be in [0, 1)", cutoff),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`RegressionSettings`].
///
/// Defaults: [`RegressorModel::Simple`], no caps, no PCA,
/// [`VarGroupMode::Global`].
#[derive(Clone, Debug, Default)]
pub struct RegressionSettingsBuilder {
    settings: RegressionSettings,
}

impl RegressionSettingsBuilder {
    /// Sets the regressor model.
    #[inline]
    pub fn regressor_model(mut self, regressor_model: RegressorModel) -> Self {
        self.settings.regressor_model = regressor_model;
        self
    }

    /// Caps the lagged simulation times of `asset_class` (0 = no cap).
    #[inline]
    pub fn max_sim_times(mut self, asset_class: AssetClass, max: usize) -> Self {
        match asset_class {
            AssetClass::Ir => self.settings.max_sim_times_ir = max,
            AssetClass::Fx => self.settings.max_sim_times_fx = max,
            AssetClass::Eq => self.settings.max_sim_times_eq = max,
        }
        self
    }

    /// Enables PCA on the regressor with the given variance cutoff.
    #[inline]
    pub fn variance_cutoff(mut self, cutoff: f64) -> Self {
        self.settings.variance_cutoff = Some(cutoff);
        self
    }

    /// Sets the variable grouping mode.
    #[inline]
    pub fn var_group_mode(mut self, mode: VarGroupMode) -> Self {
        self.settings.var_group_mode = mode;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// See [`RegressionSettings::validate`].
    pub fn build(self) -> Result<RegressionSettings, ConfigError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
