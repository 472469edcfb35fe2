//! Cross-asset model state layout.
//!
//! The regression model only needs to know how the simulated model state is
//! indexed: how many components each asset class has, how many state
//! variables each component carries and where they live in the state vector.

use serde::{Deserialize, Serialize};

/// Asset classes of a cross-asset model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// Interest rates
    Ir,
    /// Foreign exchange
    Fx,
    /// Equity
    Eq,
}

impl AssetClass {
    /// All asset classes in state vector order.
    pub const ALL: [AssetClass; 3] = [AssetClass::Ir, AssetClass::Fx, AssetClass::Eq];
}

/// State vector layout of a cross-asset model.
pub trait StateLayout {
    /// Total number of state variables.
    fn dimension(&self) -> usize;

    /// Number of components of `asset_class`.
    fn components(&self, asset_class: AssetClass) -> usize;

    /// Number of state variables of component `component` of `asset_class`.
    fn state_variables(&self, asset_class: AssetClass, component: usize) -> usize;

    /// Index of state variable `variable` of `component` in the state vector.
    fn state_index(&self, asset_class: AssetClass, component: usize, variable: usize) -> usize;
}

/// Contiguous layout: IR components first, then FX, then EQ, each component
/// occupying a block of its state variables.
///
/// # Example
///
/// ```rust
/// use pricer_tape::regression::{AssetClass, SimpleStateLayout, StateLayout};
///
/// // Two currencies with 2-factor rates, one FX rate, one equity
/// let layout = SimpleStateLayout::new(vec![2, 2], vec![1], vec![1]);
/// assert_eq!(layout.dimension(), 6);
/// assert_eq!(layout.state_index(AssetClass::Ir, 1, 0), 2);
/// assert_eq!(layout.state_index(AssetClass::Fx, 0, 0), 4);
/// assert_eq!(layout.state_index(AssetClass::Eq, 0, 0), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimpleStateLayout {
    ir: Vec<usize>,
    fx: Vec<usize>,
    eq: Vec<usize>,
}

impl SimpleStateLayout {
    /// Creates a layout from the state variable count of every component.
    pub fn new(ir: Vec<usize>, fx: Vec<usize>, eq: Vec<usize>) -> Self {
        Self { ir, fx, eq }
    }

    fn class(&self, asset_class: AssetClass) -> &[usize] {
        match asset_class {
            AssetClass::Ir => &self.ir,
            AssetClass::Fx => &self.fx,
            AssetClass::Eq => &self.eq,
        }
    }

    fn offset(&self, asset_class: AssetClass) -> usize {
        AssetClass::ALL
            .iter()
            .take_while(|&&c| c != asset_class)
            .map(|&c| self.class(c).iter().sum::<usize>())
            .sum()
    }
}

impl StateLayout for SimpleStateLayout {
    fn dimension(&self) -> usize {
        AssetClass::ALL
            .iter()
            .map(|&c| self.class(c).iter().sum::<usize>())
            .sum()
    }

    fn components(&self, asset_class: AssetClass) -> usize {
        self.class(asset_class).len()
    }

    fn state_variables(&self, asset_class: AssetClass, component: usize) -> usize {
        self.class(asset_class).get(component).copied().unwrap_or(0)
    }

    fn state_index(&self, asset_class: AssetClass, component: usize, variable: usize) -> usize {
        let before: usize = self.class(asset_class).iter().take(component).sum();
        self.offset(asset_class) + before + variable
    }
}
