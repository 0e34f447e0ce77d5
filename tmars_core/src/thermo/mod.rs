//! Thermodynamics-based Metabolic Analysis (TMA)
//!
//! Augments a flux balance model with one log-activity variable per metabolite and, for every
//! phased non-transport reaction, a standard Gibbs energy variable bounded by its estimate, a
//! Gibbs energy variable, and an equality constraint tying them to the activities.

pub mod activity;
pub mod assembler;
pub mod constraint;
pub mod estimator;
pub mod phasing;

use thiserror::Error;

use crate::metabolic_model::model::ModelError;
use crate::optimize::problem::ProblemError;
use crate::thermo::estimator::EstimationError;

/// Gas constant in kJ/(mol K)
pub const GAS_CONSTANT: f64 = 8.314472e-3;

/// Compute RT (kJ/mol) for an absolute temperature in Kelvin
///
/// # Examples
/// ```rust
/// use tmars_core::thermo::gas_constant_times_temperature;
/// let rt = gas_constant_times_temperature(298.15).unwrap();
/// assert!((rt - 2.4790).abs() < 1e-4);
/// assert!(gas_constant_times_temperature(0.).is_err());
/// ```
pub fn gas_constant_times_temperature(temperature: f64) -> Result<f64, TmaError> {
    if !(temperature.is_finite() && temperature > 0.) {
        return Err(TmaError::InvalidTemperature(temperature));
    }
    Ok(temperature * GAS_CONSTANT)
}

/// Errors raised while formulating a thermodynamic problem
#[derive(Error, Debug, Clone)]
pub enum TmaError {
    /// Temperature was not a positive, finite number of Kelvin
    #[error("Temperature must be a positive number of Kelvin, got {0}")]
    InvalidTemperature(f64),
    /// RT was not positive and finite
    #[error("RT must be positive and finite, got {0}")]
    InvalidGasConstantProduct(f64),
    /// A variable with the same id already exists in the problem
    #[error("Variable {0} already exists in the problem")]
    DuplicateVariable(String),
    /// A phased reaction has no counterpart in the model
    #[error("Reaction {0} is not in the model")]
    ReactionNotFound(String),
    /// A reaction references a metabolite without an activity variable
    #[error("Metabolite {metabolite} of reaction {reaction} has no activity variable")]
    MissingActivityVariable { reaction: String, metabolite: String },
    /// A metabolite id without an activity variable was given directly
    #[error("Metabolite {0} has no activity variable")]
    UnknownMetabolite(String),
    /// The estimator could not provide a Gibbs energy for the reaction
    #[error("Unable to estimate the standard Gibbs energy of reaction {reaction}")]
    EstimationFailure {
        reaction: String,
        #[source]
        source: EstimationError,
    },
    /// A measured concentration range can't be turned into activity bounds
    #[error("Invalid concentration range [{lower}, {upper}] for metabolite {metabolite}")]
    InvalidConcentration {
        metabolite: String,
        lower: f64,
        upper: f64,
    },
    /// Error from the underlying optimization problem
    #[error("Optimization problem error")]
    Problem(#[from] ProblemError),
    /// Error from the metabolic model
    #[error("Metabolic model error")]
    Model(#[from] ModelError),
}
