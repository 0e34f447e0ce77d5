//! Provides struct for representing an optimization problem's objective

use crate::optimize::variable::VariableRef;

/// Represents the Objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
        }
    }

    /// Create a new empty maximization objective
    pub fn new_maximize() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new empty minimization objective
    pub fn new_minimize() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Sense of the objective
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Terms of the objective
    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Add a new term to the objective
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.terms.push(term);
    }

    /// Add a new Linear term to the objective
    pub fn add_linear_term(&mut self, variable: VariableRef, coefficient: f64) {
        self.terms.push(ObjectiveTerm::new(variable, coefficient));
    }

    /// Remove all terms from the objective, keeping its sense
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
    }

    /// Dense vector of objective coefficients, repeated variables are summed
    pub fn coefficients(&self, num_variables: usize) -> Vec<f64> {
        let mut coefficients = vec![0f64; num_variables];
        for term in &self.terms {
            if let Some(c) = coefficients.get_mut(term.variable.index()) {
                *c += term.coefficient;
            }
        }
        coefficients
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

/// A linear term in the objective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveTerm {
    /// Variable in objective term
    pub variable: VariableRef,
    /// Coefficient for linear term
    pub coefficient: f64,
}

impl ObjectiveTerm {
    /// Create a new linear objective term
    pub fn new(variable: VariableRef, coefficient: f64) -> Self {
        ObjectiveTerm {
            variable,
            coefficient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_sum_repeated_terms() {
        let mut objective = Objective::new_maximize();
        objective.add_linear_term(VariableRef(1), 1.0);
        objective.add_linear_term(VariableRef(1), 0.5);
        objective.add_linear_term(VariableRef(0), -2.0);
        assert_eq!(objective.coefficients(3), vec![-2.0, 1.5, 0.0]);
        objective.remove_all_terms();
        assert!(objective.terms().is_empty());
        assert_eq!(objective.sense(), ObjectiveSense::Maximize);
    }
}
