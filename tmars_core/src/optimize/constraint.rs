//! Provides struct for representing a constraint in an optimization problem
use crate::optimize::variable::VariableRef;

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Used to identify the constraint
        id: String,
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, `lower_bound` <= `terms` <= `upper_bound`
    Inequality {
        /// Used to identify the constraint
        id: String,
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The lowest value the sum of the terms can take
        lower_bound: f64,
        /// The highest value the sum of the terms can take
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint
    ///
    /// # Parameters
    /// - `id`: Identifier of the constraint
    /// - `variables`: A slice of variable handles
    /// - `coefficients`: A slice of coefficients for the variables
    /// - `equals`: The right hand side of the equality
    ///
    /// # Examples
    /// ```rust
    /// use tmars_core::optimize::problem::Problem;
    /// use tmars_core::optimize::constraint::Constraint;
    /// let mut problem = Problem::new_maximization();
    /// let x = problem.add_new_variable("x", 0., 20.).unwrap();
    /// let y = problem.add_new_variable("y", 3., 7.).unwrap();
    /// // Create a constraint representing 3*x + 2*y = 6
    /// let constraint = Constraint::new_equality("c", &[x, y], &[3.0, 2.0], 6.);
    /// problem.add_constraint(constraint).unwrap();
    /// ```
    pub fn new_equality(
        id: &str,
        variables: &[VariableRef],
        coefficients: &[f64],
        equals: f64,
    ) -> Self {
        Constraint::Equality {
            id: id.to_string(),
            terms: Constraint::zip_into_terms(variables, coefficients),
            equals,
        }
    }

    /// Create a new inequality constraint
    ///
    /// # Parameters
    /// - `id`: Identifier of the constraint
    /// - `variables`: A slice of variable handles
    /// - `coefficients`: A slice of coefficients for the variables
    /// - `lower_bound`: The lowest value the constraint can take
    /// - `upper_bound`: The highest value the constraint can take
    pub fn new_inequality(
        id: &str,
        variables: &[VariableRef],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            id: id.to_string(),
            terms: Constraint::zip_into_terms(variables, coefficients),
            lower_bound,
            upper_bound,
        }
    }

    /// Get the id of the constraint
    pub fn get_id(&self) -> &str {
        match self {
            Constraint::Equality { id, .. } | Constraint::Inequality { id, .. } => id,
        }
    }

    /// Get the terms of the constraint
    pub fn get_terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Lower and upper bound of the constraint, for an equality both are `equals`
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Constraint::Equality { equals, .. } => (*equals, *equals),
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => (*lower_bound, *upper_bound),
        }
    }

    /// Value of the sum of the terms for the given variable values (indexed by variable position)
    ///
    /// Returns None if a term refers to a position outside of `values`
    pub fn evaluate(&self, values: &[f64]) -> Option<f64> {
        self.get_terms().iter().try_fold(0f64, |acc, term| {
            values
                .get(term.variable.index())
                .map(|v| acc + term.coefficient * v)
        })
    }

    /// Check whether the variable values satisfy the constraint within `tolerance`
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let (lb, ub) = self.bounds();
        match self.evaluate(values) {
            Some(activity) => activity >= lb - tolerance && activity <= ub + tolerance,
            None => false,
        }
    }

    /// Take a slice of variable handles, and a slice of coefficients and zip
    /// them together into a vec of ConstraintTerms
    fn zip_into_terms(variables: &[VariableRef], coefficients: &[f64]) -> Vec<ConstraintTerm> {
        variables
            .iter()
            .zip(coefficients)
            .map(|(var, coef)| ConstraintTerm {
                variable: *var,
                coefficient: *coef,
            })
            .collect()
    }
}

/// Represents a single term in a constraint, specifically
/// represents the multiplication of the `variable` by the `coefficient`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintTerm {
    /// Handle of the variable
    pub variable: VariableRef,
    /// The coefficient for the variable
    pub coefficient: f64,
}
