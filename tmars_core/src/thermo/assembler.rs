//! Assembly of a complete thermodynamic problem from a flux balance model
use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::configuration;
use crate::metabolic_model::model::{Model, ModelSolution};
use crate::optimize::constraint::Constraint;
use crate::optimize::solvers::Solver;
use crate::optimize::variable::Variable;
use crate::thermo::activity::{activity_variable_id, formulate_activities, ActivityMap};
use crate::thermo::constraint::{create_thermo_constraint, ReactionThermo};
use crate::thermo::estimator::GibbsEnergyEstimator;
use crate::thermo::phasing::{PhasedReaction, ReactionPhaser};
use crate::thermo::{gas_constant_times_temperature, TmaError};

/// A model augmented with thermodynamic variables and constraints
#[derive(Debug, Clone)]
pub struct TmaProblem {
    /// The augmented copy of the input model
    model: Model,
    /// Activity variable of every metabolite
    pub activities: ActivityMap,
    /// Thermodynamic variables of every constrained reaction, keyed by reaction id
    pub reactions: IndexMap<String, ReactionThermo>,
    /// Non-transport reactions which could not be phased and are left unconstrained
    pub unresolved: Vec<String>,
    /// Temperature (K) the problem was built for
    pub temperature: f64,
    /// Gas constant times temperature, kJ/mol
    pub rt: f64,
}

/// Measured concentration range of a metabolite, molar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcentrationRange {
    /// Lowest measured concentration, molar
    pub lower: f64,
    /// Highest measured concentration, molar
    pub upper: f64,
}

impl ConcentrationRange {
    pub fn new(lower: f64, upper: f64) -> Self {
        ConcentrationRange { lower, upper }
    }
}

impl TmaProblem {
    /// The augmented model
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Activity variable of a metabolite
    pub fn activity(&self, metabolite_id: &str) -> Option<&Variable> {
        let variable = *self.activities.get(metabolite_id)?;
        self.model.problem()?.variable(variable)
    }

    /// Standard Gibbs energy variable of a reaction
    pub fn delta_g0(&self, reaction_id: &str) -> Option<&Variable> {
        let thermo = self.reactions.get(reaction_id)?;
        self.model.problem()?.variable(thermo.delta_g0)
    }

    /// Gibbs energy variable of a reaction
    pub fn delta_g(&self, reaction_id: &str) -> Option<&Variable> {
        let thermo = self.reactions.get(reaction_id)?;
        self.model.problem()?.variable(thermo.delta_g)
    }

    /// Thermodynamic constraint of a reaction
    pub fn thermo_constraint(&self, reaction_id: &str) -> Option<&Constraint> {
        let thermo = self.reactions.get(reaction_id)?;
        self.model.problem()?.get_constraint(&thermo.constraint)
    }

    /// Change the bounds of the activity variable of a metabolite
    pub fn set_activity_bounds(
        &mut self,
        metabolite_id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), TmaError> {
        let unknown = || TmaError::UnknownMetabolite(metabolite_id.to_string());
        let variable = *self.activities.get(metabolite_id).ok_or_else(unknown)?;
        let var_id = activity_variable_id(metabolite_id);
        // The handle must still point at this metabolite's activity
        let is_activity = self
            .model
            .problem()
            .and_then(|problem| problem.variable(variable))
            .is_some_and(|v| v.id == var_id);
        if !is_activity {
            return Err(unknown());
        }
        self.model
            .problem_mut()?
            .update_variable_bounds(&var_id, lower_bound, upper_bound)?;
        Ok(())
    }

    /// Bound activities by measured concentrations
    ///
    /// Each range `[c_min, c_max]` (molar, relative to a 1 M reference) becomes the activity
    /// bounds `[ln(c_min), ln(c_max)]`. All measurements are checked before any bound is
    /// changed.
    pub fn apply_metabolomics(
        &mut self,
        measurements: &IndexMap<String, ConcentrationRange>,
    ) -> Result<(), TmaError> {
        for (met_id, range) in measurements {
            let valid = range.lower.is_finite()
                && range.upper.is_finite()
                && range.lower > 0.
                && range.lower <= range.upper;
            if !valid {
                return Err(TmaError::InvalidConcentration {
                    metabolite: met_id.clone(),
                    lower: range.lower,
                    upper: range.upper,
                });
            }
            if !self.activities.contains_key(met_id) {
                return Err(TmaError::UnknownMetabolite(met_id.clone()));
            }
        }
        for (met_id, range) in measurements {
            self.set_activity_bounds(met_id, range.lower.ln(), range.upper.ln())?;
        }
        debug!("Applied {} concentration measurements", measurements.len());
        Ok(())
    }

    /// Optimize the augmented model with the configured default solver
    pub fn optimize(&mut self) -> Result<ModelSolution, TmaError> {
        Ok(self.model.optimize()?)
    }

    /// Optimize the augmented model with the given solver
    pub fn optimize_with(&mut self, solver: &dyn Solver) -> Result<ModelSolution, TmaError> {
        Ok(self.model.optimize_with(solver)?)
    }

    /// Take the augmented model, dropping the bookkeeping
    pub fn into_model(self) -> Model {
        self.model
    }
}

/// Create the thermodynamic constraint of every phased reaction
///
/// Stops at the first error, which leaves the constraints of the earlier reactions in place;
/// [`build_tma_problem`] discards the whole model in that case.
pub fn formulate_reactions<'p, I, E>(
    model: &mut Model,
    phased_reactions: I,
    activities: &ActivityMap,
    estimator: &E,
    rt: f64,
) -> Result<IndexMap<String, ReactionThermo>, TmaError>
where
    I: IntoIterator<Item = &'p PhasedReaction>,
    E: GibbsEnergyEstimator + ?Sized,
{
    let mut reactions = IndexMap::new();
    for phased in phased_reactions {
        let thermo = create_thermo_constraint(phased, model, activities, estimator, rt)?;
        reactions.insert(phased.id.clone(), thermo);
    }
    Ok(reactions)
}

/// Build the TMA problem of `model` at `temperature` (K)
///
/// The input model is cloned and never modified. Transport reactions are not phased;
/// reactions the phaser can't resolve are listed in [`TmaProblem::unresolved`]. Any other
/// failure aborts the whole assembly.
pub fn build_tma_problem<P, E>(
    model: &Model,
    temperature: f64,
    phaser: &P,
    estimator: &E,
) -> Result<TmaProblem, TmaError>
where
    P: ReactionPhaser,
    E: GibbsEnergyEstimator + ?Sized,
{
    let rt = gas_constant_times_temperature(temperature)?;
    if (estimator.temperature() - temperature).abs() > 1e-9 {
        warn!(
            "Estimator was built for {} K but the problem is built for {} K",
            estimator.temperature(),
            temperature
        );
    }
    let mut thermo = model.clone();

    let phasing = phaser.phase_reactions(
        thermo.reactions.values().filter(|rxn| !rxn.is_transport()),
        &thermo.metabolites,
    );
    if !phasing.unresolved.is_empty() {
        info!(
            "{} reactions could not be phased and are left unconstrained: {:?}",
            phasing.unresolved.len(),
            phasing.unresolved
        );
    }

    let activities = formulate_activities(&mut thermo)?;
    let reactions = formulate_reactions(
        &mut thermo,
        phasing.phased.values(),
        &activities,
        estimator,
        rt,
    )?;
    info!(
        "Built TMA problem at {} K: {} activities, {} constrained reactions",
        temperature,
        activities.len(),
        reactions.len()
    );
    Ok(TmaProblem {
        model: thermo,
        activities,
        reactions,
        unresolved: phasing.unresolved,
        temperature,
        rt,
    })
}

/// [`build_tma_problem`] at the configured default temperature
pub fn build_tma_problem_default<P, E>(
    model: &Model,
    phaser: &P,
    estimator: &E,
) -> Result<TmaProblem, TmaError>
where
    P: ReactionPhaser,
    E: GibbsEnergyEstimator + ?Sized,
{
    build_tma_problem(model, configuration::current().temperature, phaser, estimator)
}

/// Build the TMA problem of `model` and optimize it
pub fn tma<P, E>(
    model: &Model,
    temperature: f64,
    phaser: &P,
    estimator: &E,
) -> Result<ModelSolution, TmaError>
where
    P: ReactionPhaser,
    E: GibbsEnergyEstimator + ?Sized,
{
    build_tma_problem(model, temperature, phaser, estimator)?.optimize()
}
