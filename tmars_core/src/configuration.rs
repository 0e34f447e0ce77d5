use std::sync::{LazyLock, RwLock};

/// Global defaults used when building reactions, variables, and problems
pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

/// Default absolute temperature (K) for thermodynamic analysis
pub const DEFAULT_TEMPERATURE: f64 = 298.15;

#[derive(Clone, Debug)]
pub struct Configuration {
    /// Default lower flux bound for new reactions
    pub lower_bound: f64,
    /// Default upper flux bound for new reactions
    pub upper_bound: f64,
    /// Feasibility tolerance handed to the solvers
    pub tolerance: f64,
    /// Solver used by `optimize` when none is given explicitly
    pub solver: Solver,
    /// Temperature (K) used when none is given explicitly
    pub temperature: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            solver: Solver::Clarabel,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Solver {
    /// Use the Clarabel interior point solver
    Clarabel,
    /// Use the microlp simplex solver, requires the minilp feature to be enabled
    Microlp,
}

/// Read a snapshot of the current configuration
///
/// A poisoned lock still holds valid defaults, so its contents are used as is.
pub(crate) fn current() -> Configuration {
    match CONFIGURATION.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
