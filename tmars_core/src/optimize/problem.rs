//! Provides struct representing an optimization problem
use indexmap::IndexMap;
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::solvers::{default_solver, Solver, SolverError};
use crate::optimize::variable::{Variable, VariableBuilder, VariableRef};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// A linear optimization problem
///
/// Variables are stored by value, so cloning a problem yields an independent copy
/// and [`VariableRef`] handles issued by the original remain valid for the clone.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem, in insertion (index) order
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Status of the most recent optimization
    status: OptimizationStatus,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            status: OptimizationStatus::Unoptimized,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Objective
    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }

    /// The problem objective
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Add a new term to the objective
    pub fn add_objective_term(&mut self, objective_term: ObjectiveTerm) -> Result<(), ProblemError> {
        if self.variable(objective_term.variable).is_none() {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        self.objective.add_term(objective_term);
        Ok(())
    }

    /// Add a new linear term to the objective
    pub fn add_new_linear_objective_term(
        &mut self,
        variable: VariableRef,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new(variable, coefficient))
    }

    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term_by_id(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        let variable = self
            .variable_ref(variable_id)
            .ok_or(ProblemError::NonExistentVariablesInObjective)?;
        self.add_new_linear_objective_term(variable, coefficient)
    }

    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
    }
    // endregion Objective

    // region Adding Variables
    /// Add a variable to the optimization problem, returning its handle
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<VariableRef, ProblemError> {
        self.validate_variable(&variable)?;
        let index = self.variables.len();
        variable.index = index;
        self.variables.insert(variable.id.clone(), variable);
        self.status = OptimizationStatus::Unoptimized;
        Ok(VariableRef(index))
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<VariableRef, ProblemError> {
        let new_var = VariableBuilder::default()
            .id(id)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .build()
            .map_err(|err| ProblemError::InvalidVariable(err.to_string()))?;
        self.add_variable(new_var)
    }
    // endregion Adding Variables

    // region Accessing Variables
    /// Get a variable by its handle
    pub fn variable(&self, variable: VariableRef) -> Option<&Variable> {
        self.variables.get_index(variable.0).map(|(_, v)| v)
    }

    /// Get a variable by its id
    pub fn get_variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// Get the handle of a variable by its id
    pub fn variable_ref(&self, id: &str) -> Option<VariableRef> {
        self.variables.get_index_of(id).map(VariableRef)
    }

    /// Whether a variable with this id exists
    pub fn contains_variable(&self, id: &str) -> bool {
        self.variables.contains_key(id)
    }

    /// Iterate over the variables, in index order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Number of variables in the problem
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }
    // endregion Accessing Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.get_id().to_string(), constraint);
        self.status = OptimizationStatus::Unoptimized;
        Ok(())
    }

    /// Create a new equality constraint and add it to the model
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        variables: &[VariableRef],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        Self::check_term_lengths(variables, coefficients)?;
        self.add_constraint(Constraint::new_equality(id, variables, coefficients, equals))
    }

    /// Create a new equality constraint using variable ids rather than handles, and add it to the model
    pub fn add_new_equality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        let variables = self.lookup_constraint_variables(variables)?;
        self.add_new_equality_constraint(id, &variables, coefficients, equals)
    }

    /// Create a new inequality constraint and add it to the model
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[VariableRef],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        Self::check_term_lengths(variables, coefficients)?;
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }

    /// Create a new inequality constraint using variable ids rather than handles, and add it to the model
    pub fn add_new_inequality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let variables = self.lookup_constraint_variables(variables)?;
        self.add_new_inequality_constraint(id, &variables, coefficients, lower_bound, upper_bound)
    }
    // endregion Adding Constraints

    // region Accessing Constraints
    /// Get a constraint by its id
    pub fn get_constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    /// Whether a constraint with this id exists
    pub fn contains_constraint(&self, id: &str) -> bool {
        self.constraints.contains_key(id)
    }

    /// Iterate over the constraints, in insertion order
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    /// Number of constraints in the problem
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Human-readable form of a constraint, such as `1*x + -2*y = 0`
    pub fn describe_constraint(&self, id: &str) -> Option<String> {
        let constraint = self.constraints.get(id)?;
        let terms = constraint
            .get_terms()
            .iter()
            .map(|t| {
                let var_id = self
                    .variable(t.variable)
                    .map(|v| v.id.as_str())
                    .unwrap_or("?");
                format!("{}*{}", t.coefficient, var_id)
            })
            .collect::<Vec<_>>()
            .join(" + ");
        Some(match constraint {
            Constraint::Equality { equals, .. } => format!("{} = {}", terms, equals),
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => format!("{} <= {} <= {}", lower_bound, terms, upper_bound),
        })
    }
    // endregion Accessing Constraints

    // region update variable bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound || lower_bound.is_nan() || upper_bound.is_nan() {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
            }
            None => return Err(ProblemError::NonExistentVariable(id.to_string())),
        };
        self.status = OptimizationStatus::Unoptimized;
        Ok(())
    }
    // endregion update variable bounds

    // region Solving
    /// Status of the most recent optimization
    pub fn status(&self) -> OptimizationStatus {
        self.status
    }

    /// Solve the problem with the configured default solver
    pub fn optimize(&mut self) -> Result<ProblemSolution, ProblemError> {
        let solver = default_solver();
        self.optimize_with(solver.as_ref())
    }

    /// Solve the problem with the given solver
    pub fn optimize_with(&mut self, solver: &dyn Solver) -> Result<ProblemSolution, ProblemError> {
        let solution = solver.solve(self)?;
        self.status = solution.status;
        Ok(solution)
    }
    // endregion Solving

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        let (lb, ub) = (variable.lower_bound, variable.upper_bound);
        if lb > ub || lb.is_nan() || ub.is_nan() {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(constraint.get_id()) {
            return Err(ProblemError::ConstraintAlreadyExists(
                constraint.get_id().to_string(),
            ));
        }
        let (lb, ub) = constraint.bounds();
        if lb > ub || lb.is_nan() || ub.is_nan() {
            return Err(ProblemError::InvalidConstraintBounds(
                constraint.get_id().to_string(),
            ));
        }
        if constraint
            .get_terms()
            .iter()
            .any(|t| self.variable(t.variable).is_none())
        {
            return Err(ProblemError::NonExistentVariablesInConstraint);
        }
        Ok(())
    }

    fn check_term_lengths(variables: &[VariableRef], coefficients: &[f64]) -> Result<(), ProblemError> {
        if variables.len() != coefficients.len() {
            return Err(ProblemError::MismatchedTerms {
                variables: variables.len(),
                coefficients: coefficients.len(),
            });
        }
        Ok(())
    }

    fn lookup_constraint_variables(&self, ids: &[&str]) -> Result<Vec<VariableRef>, ProblemError> {
        ids.iter()
            .map(|v_id| {
                self.variable_ref(v_id)
                    .ok_or(ProblemError::NonExistentVariablesInConstraint)
            })
            .collect()
    }
    // endregion Validation Functions
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add a variable with the same id as an existing variable: {0}")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to add variable {0} with lower_bound>upper_bound")]
    InvalidVariableBounds(String),
    /// Error when a variable could not be built
    #[error("Unable to build variable: {0}")]
    InvalidVariable(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add a constraint with the same id as an existing constraint: {0}")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add constraint {0} with lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Tried to add a constraint with variables not in the model")]
    NonExistentVariablesInConstraint,
    /// Error when the number of variables and coefficients of a constraint differ
    #[error("Constraint has {variables} variables but {coefficients} coefficients")]
    MismatchedTerms { variables: usize, coefficients: usize },
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variables not in the model")]
    NonExistentVariablesInObjective,
    /// Error when trying to perform an update on a variable that doesn't exist
    #[error("Tried to access a variable that doesn't exist: {0}")]
    NonExistentVariable(String),
    /// Error raised by the solver
    #[error("Solver failed")]
    Solver(#[from] SolverError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_problem() {
        let max_problem = Problem::new_maximization();
        assert_eq!(max_problem.objective.sense(), ObjectiveSense::Maximize);

        let min_problem = Problem::new_minimization();
        assert_eq!(min_problem.objective.sense(), ObjectiveSense::Minimize);
        assert_eq!(min_problem.status(), OptimizationStatus::Unoptimized);
    }

    #[test]
    fn update_objective_sense() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem.update_objective_sense(ObjectiveSense::Minimize);
        assert_eq!(problem.objective.sense(), ObjectiveSense::Minimize);
        problem.update_objective_sense(ObjectiveSense::Maximize);
        assert_eq!(problem.objective.sense(), ObjectiveSense::Maximize);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        let x = problem.add_new_variable("x", 64., 100.).unwrap();
        assert_eq!(x.index(), 0);
        let var = problem.get_variable("x").expect("Variable not added to model");
        assert_eq!(var.index(), 0);
        assert_eq!(var.lower_bound, 64.);
        assert_eq!(var.upper_bound, 100.);

        let y = problem.add_new_variable("y", -5., 5.).unwrap();
        assert_eq!(y.index(), 1);
        assert_eq!(problem.variable(y).unwrap().id, "y");
        assert_eq!(problem.variable_ref("y"), Some(y));
        assert_eq!(problem.num_variables(), 2);
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        let res = problem.add_new_variable("x", 100., 64.);
        assert!(matches!(res, Err(ProblemError::InvalidVariableBounds(_))));

        problem.add_new_variable("x", 0., 1.).unwrap();
        let res = problem.add_new_variable("x", 0., 1.);
        assert!(matches!(res, Err(ProblemError::VariableIdAlreadyExists(id)) if id == "x"));
        assert_eq!(problem.num_variables(), 1);
    }

    #[test]
    fn add_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem.add_new_variable("x", 64., 100.).unwrap();
        problem.add_new_variable("y", 64., 100.).unwrap();

        problem
            .add_new_equality_constraint_by_id("test_constraint", &["x", "y"], &[2., 3.], 200.)
            .unwrap();
        match problem.get_constraint("test_constraint").unwrap() {
            Constraint::Equality { equals, .. } => assert_eq!(*equals, 200.),
            Constraint::Inequality { .. } => panic!("Incorrect constraint type added"),
        }
        assert_eq!(
            problem.describe_constraint("test_constraint").unwrap(),
            "2*x + 3*y = 200"
        );

        // Same id again is rejected
        let res = problem.add_new_inequality_constraint_by_id(
            "test_constraint",
            &["x", "y"],
            &[2., 3.],
            100.,
            200.,
        );
        assert!(matches!(res, Err(ProblemError::ConstraintAlreadyExists(_))));

        problem
            .add_new_inequality_constraint_by_id("range", &["x", "y"], &[2., 3.], 100., 200.)
            .unwrap();
        assert_eq!(
            problem.get_constraint("range").unwrap().bounds(),
            (100., 200.)
        );
        assert_eq!(problem.num_constraints(), 2);
    }

    #[test]
    fn add_bad_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        let x = problem.add_new_variable("x", 64., 100.).unwrap();
        problem.add_new_variable("y", 64., 100.).unwrap();

        let res = problem.add_new_inequality_constraint_by_id(
            "bad_constraint",
            &["x", "y"],
            &[2., 3.],
            200.,
            100.,
        );
        assert!(matches!(res, Err(ProblemError::InvalidConstraintBounds(_))));

        let res = problem.add_new_equality_constraint_by_id("missing", &["x", "z"], &[1., 1.], 0.);
        assert!(matches!(res, Err(ProblemError::NonExistentVariablesInConstraint)));

        let res = problem.add_new_equality_constraint("short", &[x], &[1., 2.], 0.);
        assert!(matches!(res, Err(ProblemError::MismatchedTerms { .. })));

        let foreign = Constraint::new_equality("foreign", &[VariableRef(7)], &[1.], 0.);
        assert!(matches!(
            problem.add_constraint(foreign),
            Err(ProblemError::NonExistentVariablesInConstraint)
        ));
        assert_eq!(problem.num_constraints(), 0);
    }

    #[test]
    fn update_bounds() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 0., 0.).unwrap();
        problem.update_variable_bounds("x", -1., 1.).unwrap();
        let x = problem.get_variable("x").unwrap();
        assert_eq!((x.lower_bound, x.upper_bound), (-1., 1.));
        assert!(matches!(
            problem.update_variable_bounds("x", 1., -1.),
            Err(ProblemError::InvalidVariableBounds(_))
        ));
        assert!(matches!(
            problem.update_variable_bounds("nope", 0., 1.),
            Err(ProblemError::NonExistentVariable(_))
        ));
    }

    #[test]
    fn clone_is_independent() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 0., 1.).unwrap();
        let mut copy = problem.clone();
        copy.update_variable_bounds("x", -5., 5.).unwrap();
        copy.add_new_variable("y", 0., 1.).unwrap();
        assert_eq!(problem.get_variable("x").unwrap().lower_bound, 0.);
        assert_eq!(problem.num_variables(), 1);
        assert_eq!(copy.num_variables(), 2);
    }

    #[test]
    fn objective_terms() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", 0., 1.).unwrap();
        problem.add_new_linear_objective_term_by_id("x", 2.).unwrap();
        assert_eq!(problem.objective().terms().len(), 1);
        assert!(matches!(
            problem.add_new_linear_objective_term_by_id("y", 1.),
            Err(ProblemError::NonExistentVariablesInObjective)
        ));
        problem.remove_all_objective_terms();
        assert!(problem.objective().terms().is_empty());
    }
}
