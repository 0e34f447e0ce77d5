//! Contract for standard Gibbs energy estimators, and an estimator summing tabulated
//! formation energies
use thiserror::Error;

use crate::thermo::phasing::{CompoundCache, PhasedReaction};

/// Standard Gibbs energy of a reaction (kJ/mol), with the half width of its uncertainty
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GibbsEstimate {
    pub mean: f64,
    pub uncertainty: f64,
}

impl GibbsEstimate {
    pub fn new(mean: f64, uncertainty: f64) -> Self {
        GibbsEstimate { mean, uncertainty }
    }

    /// `mean - uncertainty`
    pub fn lower_bound(&self) -> f64 {
        self.mean - self.uncertainty
    }

    /// `mean + uncertainty`
    pub fn upper_bound(&self) -> f64 {
        self.mean + self.uncertainty
    }

    /// Reject non-finite values and negative uncertainties
    pub fn validated(self) -> Result<Self, EstimationError> {
        if self.mean.is_finite() && self.uncertainty.is_finite() && self.uncertainty >= 0. {
            Ok(self)
        } else {
            Err(EstimationError::InvalidEstimate {
                mean: self.mean,
                uncertainty: self.uncertainty,
            })
        }
    }
}

/// Provides standard transformed Gibbs energies of phased reactions
///
/// Implementations are built for a given temperature, which they report so the
/// assembler can detect a mismatch.
pub trait GibbsEnergyEstimator {
    /// Temperature (K) the estimates are valid for
    fn temperature(&self) -> f64;

    /// Estimate ΔrG'° of a phased reaction
    fn dg0_prime(&self, reaction: &PhasedReaction) -> Result<GibbsEstimate, EstimationError>;
}

/// Estimates ΔrG'° as the stoichiometry weighted sum of compound formation energies
///
/// Uncertainties of the compounds are treated as independent, so the reaction
/// uncertainty is `sqrt(sum((coefficient * uncertainty)^2))`.
#[derive(Debug, Clone)]
pub struct FormationEnergyEstimator<'c> {
    cache: &'c CompoundCache,
    temperature: f64,
}

impl<'c> FormationEnergyEstimator<'c> {
    /// Create an estimator reading formation energies tabulated at `temperature` from `cache`
    pub fn new(cache: &'c CompoundCache, temperature: f64) -> Self {
        FormationEnergyEstimator { cache, temperature }
    }
}

impl GibbsEnergyEstimator for FormationEnergyEstimator<'_> {
    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn dg0_prime(&self, reaction: &PhasedReaction) -> Result<GibbsEstimate, EstimationError> {
        let mut mean = 0f64;
        let mut variance = 0f64;
        for (compound_id, coefficient) in &reaction.compounds {
            let compound = self
                .cache
                .get(compound_id)
                .ok_or_else(|| EstimationError::UnknownCompound(compound_id.clone()))?;
            let formation_energy = compound
                .formation_energy
                .ok_or_else(|| EstimationError::MissingFormationEnergy(compound_id.clone()))?;
            mean += coefficient * formation_energy;
            variance += (coefficient * compound.formation_energy_uncertainty).powi(2);
        }
        GibbsEstimate::new(mean, variance.sqrt()).validated()
    }
}

/// Errors raised by Gibbs energy estimators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("Compound {0} is not known to the estimator")]
    UnknownCompound(String),
    #[error("Compound {0} has no formation energy")]
    MissingFormationEnergy(String),
    #[error("Estimate {mean} ± {uncertainty} is not a valid Gibbs energy")]
    InvalidEstimate { mean: f64, uncertainty: f64 },
}
