//! Trainable conditional expectation estimator.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use pricer_core::math::basis::{BasisDescriptor, BasisFamily, BasisSystem};
use pricer_core::math::comparison::close_enough;
use pricer_core::math::linalg::CoordinateTransform;
use pricer_core::types::RandomVariable;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::RegressionError;
use super::layout::{AssetClass, StateLayout};
use super::settings::{RegressionSettings, VarGroupMode};

/// Simulation schedule of one cashflow.
///
/// `model_indices[j]` lists the state indices the cashflow depends on at
/// `simulation_times[j]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CashflowInfo {
    /// Simulation times the cashflow amount is observed at.
    pub simulation_times: Vec<f64>,
    /// State indices per simulation time.
    pub model_indices: Vec<Vec<usize>>,
}

/// One regressor column: the model state `model_index` at `time`.
///
/// Keys are ordered by time, then by state index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegressorKey {
    /// Simulation time
    pub time: f64,
    /// Index into the model state vector
    pub model_index: usize,
}

impl RegressorKey {
    /// Creates a key.
    pub fn new(time: f64, model_index: usize) -> Self {
        Self { time, model_index }
    }
}

impl PartialEq for RegressorKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RegressorKey {}

impl PartialOrd for RegressorKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegressorKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.model_index.cmp(&other.model_index))
    }
}

/// Regression estimate of a conditional expectation at an observation time.
///
/// The regressor is the full model state at the observation time plus,
/// depending on the [`RegressorModel`](super::RegressorModel), lagged states
/// at earlier simulation times of the relevant cashflows. A model is trained
/// once on a path batch and can then be applied to any number of other
/// batches, also after a JSON round trip.
///
/// # Example
///
/// ```rust
/// use pricer_core::math::basis::BasisFamily;
/// use pricer_core::types::RandomVariable;
/// use pricer_tape::regression::{RegressionModel, RegressionSettings, SimpleStateLayout};
///
/// let layout = SimpleStateLayout::new(vec![1], vec![], vec![]);
/// let settings = RegressionSettings::builder().build().unwrap();
/// let mut model = RegressionModel::new(1.0, &[], |_| true, &layout, &settings);
///
/// let x = RandomVariable::from_values(vec![0.0, 1.0, 2.0, 3.0]);
/// let y = x.map(|v| 1.0 + 2.0 * v);
/// model.train(1, BasisFamily::Monomial, &y, &[vec![x.clone()]], &[1.0], None).unwrap();
///
/// let estimate = model.apply(&[0.0], &[vec![x]], &[1.0]).unwrap();
/// assert!((estimate.at(3) - 7.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    observation_time: f64,
    variance_cutoff: Option<f64>,
    var_group_mode: VarGroupMode,
    is_trained: bool,
    regressor: BTreeSet<RegressorKey>,
    transform: Option<CoordinateTransform>,
    coefficients: Vec<f64>,
    basis: Option<BasisSystem>,
}

impl RegressionModel {
    /// Selects the regressor for `observation_time`.
    ///
    /// Only cashflows `i` with `cashflow_relevant(i)` contribute lagged
    /// states.
    pub fn new<L, F>(
        observation_time: f64,
        cashflows: &[CashflowInfo],
        cashflow_relevant: F,
        layout: &L,
        settings: &RegressionSettings,
    ) -> Self
    where
        L: StateLayout + ?Sized,
        F: Fn(usize) -> bool,
    {
        let mut regressor: BTreeSet<RegressorKey> = (0..layout.dimension())
            .map(|m| RegressorKey::new(observation_time, m))
            .collect();

        for class in AssetClass::ALL {
            if !settings.regressor_model().includes(class) {
                continue;
            }
            let indices = lagged_indices(layout, class);
            if indices.is_empty() {
                continue;
            }
            let times = relevant_times(observation_time, cashflows, &cashflow_relevant, &indices);
            for (m, t) in times {
                for time in subsample(t, settings.max_sim_times(class)) {
                    regressor.insert(RegressorKey::new(time, m));
                }
            }
        }

        debug!(
            observation_time,
            regressors = regressor.len(),
            regressor_model = ?settings.regressor_model(),
            "selected regressor"
        );

        Self {
            observation_time,
            variance_cutoff: settings.variance_cutoff(),
            var_group_mode: settings.var_group_mode(),
            is_trained: false,
            regressor,
            transform: None,
            coefficients: Vec::new(),
            basis: None,
        }
    }

    /// Observation time.
    pub fn observation_time(&self) -> f64 {
        self.observation_time
    }

    /// Returns `true` once [`train`](Self::train) has succeeded.
    pub fn is_trained(&self) -> bool {
        self.is_trained
    }

    /// Regressor columns in order.
    pub fn regressor_keys(&self) -> impl Iterator<Item = &RegressorKey> + '_ {
        self.regressor.iter()
    }

    /// Number of regressor columns before any transform.
    pub fn regressor_len(&self) -> usize {
        self.regressor.len()
    }

    /// PCA transform fitted during training.
    pub fn transform(&self) -> Option<&CoordinateTransform> {
        self.transform.as_ref()
    }

    /// Basis system fitted during training.
    pub fn basis(&self) -> Option<&BasisSystem> {
        self.basis.as_ref()
    }

    /// Fitted coefficients; empty for a zero regressand.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Fits the model.
    ///
    /// `paths[k][m]` is state `m` at `path_times[k]`; `path_times` must be
    /// ascending. Samples where `filter` is `false` are excluded from the
    /// fit.
    ///
    /// # Errors
    ///
    /// - `AlreadyTrained` on a second call
    /// - `MissingPathTime` / `MissingState` if a regressor column is absent
    /// - `InconsistentRegressand` if no regressor remains but the regressand
    ///   is not identically zero
    /// - `Math` if PCA or the least squares fit fail
    pub fn train(
        &mut self,
        order: usize,
        family: BasisFamily,
        regressand: &RandomVariable,
        paths: &[Vec<RandomVariable>],
        path_times: &[f64],
        filter: Option<&[bool]>,
    ) -> Result<(), RegressionError> {
        if self.is_trained {
            return Err(RegressionError::AlreadyTrained);
        }
        check_paths(paths, path_times)?;

        let zero_regressand = regressand.is_deterministic() && close_enough(regressand.at(0), 0.0);
        let mut regressor: Vec<&RandomVariable> = Vec::new();
        if !zero_regressand {
            for key in &self.regressor {
                let k = find_time(path_times, key.time).ok_or(RegressionError::MissingPathTime(key.time))?;
                regressor.push(state(paths, path_times, k, key.model_index)?);
            }
        }

        let transformed: Vec<RandomVariable>;
        let mut transform = None;
        if let Some(cutoff) = self.variance_cutoff {
            let pca = CoordinateTransform::pca(&regressor, cutoff)?;
            transformed = pca.apply(&regressor)?;
            regressor = transformed.iter().collect();
            transform = Some(pca);
        }

        if regressor.is_empty() {
            if !regressand.is_close_to(0.0) {
                return Err(RegressionError::InconsistentRegressand);
            }
        } else {
            let basis = BasisSystem::new(
                BasisDescriptor::new(regressor.len(), order, family)
                    .with_var_groups(self.var_group_mode.groups(regressor.len())),
            )?;
            self.coefficients = basis.regression_coefficients(regressand, &regressor, filter)?;
            self.basis = Some(basis);
        }

        self.transform = transform;
        self.is_trained = true;
        debug!(
            observation_time = self.observation_time,
            dimension = regressor.len(),
            coefficients = self.coefficients.len(),
            "trained regression model"
        );
        Ok(())
    }

    /// Estimates the conditional expectation on a new path batch.
    ///
    /// Regressor times that are not simulated are linearly interpolated
    /// between the bracketing path times; `initial_state` anchors the
    /// interpolation at `t = 0` and the last path time is extrapolated flat.
    ///
    /// # Errors
    ///
    /// - `NotTrained` before [`train`](Self::train)
    /// - `EmptyPaths` if `paths` has no state
    /// - `MissingState` if a state index is not available
    /// - `Math` if the transform or basis evaluation fail
    pub fn apply(
        &self,
        initial_state: &[f64],
        paths: &[Vec<RandomVariable>],
        path_times: &[f64],
    ) -> Result<RandomVariable, RegressionError> {
        if !self.is_trained {
            return Err(RegressionError::NotTrained);
        }
        let samples = paths
            .first()
            .and_then(|p| p.first())
            .map(|r| r.size())
            .ok_or(RegressionError::EmptyPaths)?;
        check_paths(paths, path_times)?;

        let basis = match &self.basis {
            Some(basis) if !self.coefficients.is_empty() => basis,
            _ => return Ok(RandomVariable::new(samples, 0.0)),
        };

        let columns = self
            .regressor
            .iter()
            .map(|key| column(key, initial_state, paths, path_times, samples))
            .collect::<Result<Vec<_>, _>>()?;
        let mut regressor: Vec<&RandomVariable> = columns.iter().map(|c| &**c).collect();

        let transformed: Vec<RandomVariable>;
        if let Some(transform) = &self.transform {
            transformed = transform.apply(&regressor)?;
            regressor = transformed.iter().collect();
        }

        trace!(
            observation_time = self.observation_time,
            samples,
            "applying regression model"
        );
        Ok(basis.combine(&regressor, &self.coefficients)?)
    }

    /// Serialises the model to JSON.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, RegressionError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a model from JSON; the basis functions are rebuilt from the
    /// stored descriptor.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if decoding fails or the stored basis
    /// descriptor is invalid.
    pub fn from_json(json: &str) -> Result<Self, RegressionError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// State indices of `class` that enter the regressor with lags: the first
/// state variable of every IR and EQ component, all FX state variables.
fn lagged_indices<L: StateLayout + ?Sized>(layout: &L, class: AssetClass) -> BTreeSet<usize> {
    let mut indices = BTreeSet::new();
    for c in 0..layout.components(class) {
        let variables = match class {
            AssetClass::Fx => layout.state_variables(class, c),
            AssetClass::Ir | AssetClass::Eq => layout.state_variables(class, c).min(1),
        };
        indices.extend((0..variables).map(|v| layout.state_index(class, c, v)));
    }
    indices
}

/// Simulation times (capped at the observation time, zero excluded) per
/// state index in `indices`, over all relevant cashflows.
fn relevant_times<F: Fn(usize) -> bool>(
    observation_time: f64,
    cashflows: &[CashflowInfo],
    cashflow_relevant: &F,
    indices: &BTreeSet<usize>,
) -> BTreeMap<usize, Vec<f64>> {
    let mut times: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for (i, cashflow) in cashflows.iter().enumerate() {
        if !cashflow_relevant(i) {
            continue;
        }
        for (&sim_time, model_indices) in cashflow
            .simulation_times
            .iter()
            .zip(&cashflow.model_indices)
        {
            let t = observation_time.min(sim_time);
            if close_enough(t, 0.0) {
                continue;
            }
            for m in model_indices.iter().filter(|m| indices.contains(m)) {
                times.entry(*m).or_default().push(t);
            }
        }
    }
    times
}

/// Sorted distinct `times`, evenly thinned to at most `max` entries (0 = no
/// cap) keeping the most recent time.
fn subsample(mut times: Vec<f64>, max: usize) -> Vec<f64> {
    times.sort_by(f64::total_cmp);
    times.dedup_by(|a, b| close_enough(*a, *b));
    let n = times.len();
    if max == 0 || n <= max {
        return times;
    }
    let mut picked: Vec<f64> = (0..max).map(|k| times[n - 1 - k * n / max]).collect();
    picked.reverse();
    picked
}

fn check_paths(paths: &[Vec<RandomVariable>], path_times: &[f64]) -> Result<(), RegressionError> {
    if paths.len() != path_times.len() {
        return Err(RegressionError::PathTimesMismatch {
            paths: paths.len(),
            times: path_times.len(),
        });
    }
    Ok(())
}

fn find_time(path_times: &[f64], t: f64) -> Option<usize> {
    path_times.iter().position(|&p| close_enough(p, t))
}

fn state<'a>(
    paths: &'a [Vec<RandomVariable>],
    path_times: &[f64],
    k: usize,
    index: usize,
) -> Result<&'a RandomVariable, RegressionError> {
    paths[k].get(index).ok_or(RegressionError::MissingState {
        time: path_times[k],
        index,
    })
}

/// Regressor column for `key`, interpolated in time if necessary.
fn column<'a>(
    key: &RegressorKey,
    initial_state: &[f64],
    paths: &'a [Vec<RandomVariable>],
    path_times: &[f64],
    samples: usize,
) -> Result<Cow<'a, RandomVariable>, RegressionError> {
    let t = key.time;
    if let Some(k) = find_time(path_times, t) {
        return Ok(Cow::Borrowed(state(paths, path_times, k, key.model_index)?));
    }

    let k2 = path_times.partition_point(|&p| p < t);
    if k2 == path_times.len() {
        return Ok(Cow::Borrowed(state(paths, path_times, k2 - 1, key.model_index)?));
    }

    let t2 = path_times[k2];
    let s2 = state(paths, path_times, k2, key.model_index)?;
    let (t1, s1) = if k2 == 0 {
        let x0 = initial_state
            .get(key.model_index)
            .copied()
            .ok_or(RegressionError::MissingState {
                time: 0.0,
                index: key.model_index,
            })?;
        (0.0, Cow::Owned(RandomVariable::new(samples, x0)))
    } else {
        (
            path_times[k2 - 1],
            Cow::Borrowed(state(paths, path_times, k2 - 1, key.model_index)?),
        )
    };

    let alpha1 = (t2 - t) / (t2 - t1);
    let alpha2 = (t - t1) / (t2 - t1);
    Ok(Cow::Owned(&s1.map(|x| alpha1 * x) + &s2.map(|x| alpha2 * x)))
}
