//! Implements a solver interface for the microlp simplex solver
use indexmap::IndexMap;
use microlp::{ComparisonOp, OptimizationDirection};

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Exact simplex solver, well suited to problems with many fixed variables
#[derive(Clone, Copy, Debug, Default)]
pub struct MicrolpSolver;

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let n = problem.num_variables();
        if n == 0 {
            return Err(SolverError::EmptyProblem);
        }
        let direction = match problem.objective().sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut lp = microlp::Problem::new(direction);
        let objective = problem.objective().coefficients(n);
        let vars: Vec<microlp::Variable> = problem
            .variables()
            .map(|v| lp.add_var(objective[v.index()], (v.lower_bound, v.upper_bound)))
            .collect();

        for constraint in problem.constraints() {
            let terms: Vec<(microlp::Variable, f64)> = constraint
                .get_terms()
                .iter()
                .map(|t| (vars[t.variable.index()], t.coefficient))
                .collect();
            match constraint {
                Constraint::Equality { equals, .. } => {
                    lp.add_constraint(terms.as_slice(), ComparisonOp::Eq, *equals)
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound.is_finite() {
                        lp.add_constraint(terms.as_slice(), ComparisonOp::Ge, *lower_bound);
                    }
                    if upper_bound.is_finite() {
                        lp.add_constraint(terms.as_slice(), ComparisonOp::Le, *upper_bound);
                    }
                }
            }
        }

        #[allow(unreachable_patterns)]
        match lp.solve() {
            Ok(solution) => {
                let variable_values: IndexMap<String, f64> = problem
                    .variables()
                    .map(|v| (v.id.clone(), solution[vars[v.index()]]))
                    .collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(solution.objective()),
                    variable_values: Some(variable_values),
                    dual_values: None,
                })
            }
            Err(microlp::Error::Infeasible) => {
                Ok(ProblemSolution::without_values(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(ProblemSolution::without_values(OptimizationStatus::Unbounded))
            }
            Err(err) => Err(SolverError::Backend(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn solve_small_lp() {
        let mut problem = Problem::new_maximization();
        let x = problem.add_new_variable("x", 0., 3.).unwrap();
        let y = problem.add_new_variable("y", 0., 10.).unwrap();
        problem
            .add_new_inequality_constraint("c", &[x, y], &[1., 2.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem.add_new_linear_objective_term(x, 1.).unwrap();
        problem.add_new_linear_objective_term(y, 1.).unwrap();

        let solution = MicrolpSolver.solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert_abs_diff_eq!(solution.objective_value.unwrap(), 3.5, epsilon = 1e-9);
    }
}
