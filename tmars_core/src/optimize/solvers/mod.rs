//! Solver interfaces for optimizing a [`Problem`]
use log::warn;
use thiserror::Error;

use crate::configuration::{self, Solver as SolverChoice};
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

pub mod clarabel;

use self::clarabel::ClarabelSolver;

cfg_if::cfg_if! {
    if #[cfg(feature = "minilp")] {
        pub mod minilp;

        fn microlp_solver(_tolerance: f64) -> Box<dyn Solver> {
            Box::new(minilp::MicrolpSolver)
        }
    } else {
        fn microlp_solver(tolerance: f64) -> Box<dyn Solver> {
            warn!("microlp solver requested but the minilp feature is disabled, falling back to Clarabel");
            Box::new(ClarabelSolver::new(tolerance))
        }
    }
}

/// A backend able to solve a linear [`Problem`]
pub trait Solver {
    /// Name of the backend, used in log messages
    fn name(&self) -> &'static str;

    /// Solve the problem, returning the solution with variable values keyed by variable id
    ///
    /// Infeasible or unbounded problems are reported through the status of the
    /// returned solution, `Err` is reserved for failures of the backend itself.
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

/// Create the solver selected in the global configuration
pub fn default_solver() -> Box<dyn Solver> {
    let config = configuration::current();
    match config.solver {
        SolverChoice::Clarabel => Box::new(ClarabelSolver::new(config.tolerance)),
        SolverChoice::Microlp => microlp_solver(config.tolerance),
    }
}

/// Errors raised by solver backends
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    /// The problem has no variables
    #[error("Tried to solve a problem without variables")]
    EmptyProblem,
    /// The constraint matrix could not be assembled
    #[error("Unable to assemble constraint matrix: {0}")]
    MatrixAssembly(String),
    /// The backend rejected its settings or failed internally
    #[error("Solver backend failed: {0}")]
    Backend(String),
}
