//! This module provides the Model struct for representing an entire metabolic model
use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::{default_solver, Solver};
use crate::optimize::variable::VariableRef;
use crate::optimize::OptimizationStatus;

/// Represents a Genome Scale Metabolic Model
///
/// Cloning a model is a deep copy, including its optimization problem.
#[derive(Clone, Debug)]
pub struct Model {
    /// Map of reaction ids to Reactions
    pub reactions: IndexMap<String, Reaction>,
    /// Map of metabolite ids to Metabolites
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Underlying optimization problem, built on first use
    problem: Option<Problem>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            problem: None,
            id: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a metabolite to the model
    ///
    /// Any previously built optimization problem is discarded.
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
        self.problem = None;
    }

    /// Add a reaction to the model
    ///
    /// Any previously built optimization problem is discarded.
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use tmars_core::metabolic_model::model::Model;
    /// use tmars_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction").build().unwrap();
    /// model.add_reaction(new_reaction);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
        self.problem = None;
    }

    /// Set the objective coefficient of a reaction
    pub fn set_objective(&mut self, reaction_id: &str, coefficient: f64) -> Result<(), ModelError> {
        if !self.reactions.contains_key(reaction_id) {
            return Err(ModelError::ReactionNotFound(reaction_id.to_string()));
        }
        self.objective.insert(reaction_id.to_string(), coefficient);
        self.problem = None;
        Ok(())
    }

    /// Optimization problem of the model, if it has been built
    pub fn problem(&self) -> Option<&Problem> {
        self.problem.as_ref()
    }

    /// Optimization problem of the model, building the flux balance problem if needed
    pub fn problem_mut(&mut self) -> Result<&mut Problem, ModelError> {
        let problem = match self.problem.take() {
            Some(problem) => problem,
            None => self.build_problem()?,
        };
        Ok(self.problem.insert(problem))
    }

    /// Build the flux balance problem: one forward and one reverse flux variable per
    /// reaction, and a steady state (mass balance) equality per metabolite
    fn build_problem(&self) -> Result<Problem, ModelError> {
        let mut problem = Problem::new_maximization();
        let mut flux_variables: IndexMap<&str, (VariableRef, VariableRef)> = IndexMap::new();
        for rxn in self.reactions.values() {
            let (f_lb, f_ub) = rxn.get_forward_bounds();
            let (r_lb, r_ub) = rxn.get_reverse_bounds();
            let forward = problem.add_new_variable(&rxn.get_forward_id(), f_lb, f_ub)?;
            let reverse = problem.add_new_variable(&rxn.get_reverse_id(), r_lb, r_ub)?;
            flux_variables.insert(rxn.id.as_str(), (forward, reverse));
        }

        let mut balances: IndexMap<&str, (Vec<VariableRef>, Vec<f64>)> = self
            .metabolites
            .keys()
            .map(|id| (id.as_str(), (Vec::new(), Vec::new())))
            .collect();
        for rxn in self.reactions.values() {
            let (forward, reverse) = flux_variables[rxn.id.as_str()];
            for (met_id, coef) in &rxn.metabolites {
                let (vars, coefs) =
                    balances
                        .get_mut(met_id.as_str())
                        .ok_or_else(|| ModelError::UnknownMetabolite {
                            reaction: rxn.id.clone(),
                            metabolite: met_id.clone(),
                        })?;
                vars.extend([forward, reverse]);
                coefs.extend([*coef, -coef]);
            }
        }
        for (met_id, (vars, coefs)) in balances {
            problem.add_new_equality_constraint(&mass_balance_id(met_id), &vars, &coefs, 0.)?;
        }

        for (rxn_id, coef) in &self.objective {
            let (forward, reverse) = *flux_variables
                .get(rxn_id.as_str())
                .ok_or_else(|| ModelError::ReactionNotFound(rxn_id.clone()))?;
            problem.add_new_linear_objective_term(forward, *coef)?;
            problem.add_new_linear_objective_term(reverse, -coef)?;
        }
        debug!(
            "Built flux balance problem with {} variables and {} constraints",
            problem.num_variables(),
            problem.num_constraints()
        );
        Ok(problem)
    }

    /// Optimize the model with the configured default solver
    pub fn optimize(&mut self) -> Result<ModelSolution, ModelError> {
        let solver = default_solver();
        self.optimize_with(solver.as_ref())
    }

    /// Optimize the model with the given solver
    pub fn optimize_with(&mut self, solver: &dyn Solver) -> Result<ModelSolution, ModelError> {
        debug!("Optimizing model with {}", solver.name());
        let solution = self.problem_mut()?.optimize_with(solver)?;
        let fluxes = solution.variable_values.as_ref().map(|values| {
            self.reactions
                .values()
                .map(|rxn| {
                    let forward = values.get(&rxn.get_forward_id()).copied().unwrap_or(0.);
                    let reverse = values.get(&rxn.get_reverse_id()).copied().unwrap_or(0.);
                    (rxn.id.clone(), forward - reverse)
                })
                .collect()
        });
        Ok(ModelSolution {
            status: solution.status,
            objective_value: solution.objective_value,
            fluxes,
            variable_values: solution.variable_values,
        })
    }
}

/// Id of the mass balance constraint of a metabolite
pub fn mass_balance_id(metabolite_id: &str) -> String {
    format!("mass_balance_{}", metabolite_id)
}

/// Result of optimizing a [`Model`]
#[derive(Clone, Debug)]
pub struct ModelSolution {
    /// Status reported by the solver
    pub status: OptimizationStatus,
    /// Optimal objective value, None unless the solver succeeded
    pub objective_value: Option<f64>,
    /// Net flux (forward - reverse) per reaction id, None unless the solver succeeded
    pub fluxes: Option<IndexMap<String, f64>>,
    /// Value of every problem variable, None unless the solver succeeded
    pub variable_values: Option<IndexMap<String, f64>>,
}

#[derive(Clone, Debug, Error)]
pub enum ModelError {
    #[error("Reaction {0} is not in the model")]
    ReactionNotFound(String),
    #[error("Reaction {reaction} references metabolite {metabolite} which is not in the model")]
    UnknownMetabolite { reaction: String, metabolite: String },
    #[error("Unable to build the optimization problem")]
    Problem(#[from] ProblemError),
}
