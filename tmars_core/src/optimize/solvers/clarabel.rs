//! Implements a solver interface for Clarabel
//!
//! Clarabel solves `min 1/2 x'Px + q'x` subject to `Ax + s = b`, `s` in a cone. Equalities
//! (and fixed variables) are placed in the zero cone, every finite bound of a constraint or
//! variable becomes one row of the nonnegative cone.
use ::clarabel::algebra::CscMatrix as ClarabelCsc;
use ::clarabel::solver::*;
use indexmap::IndexMap;
use log::debug;
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csc::CscMatrix;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Interior point solver backed by Clarabel
#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    /// Feasibility tolerance
    pub tolerance: f64,
    /// Print the Clarabel iteration log
    pub verbose: bool,
}

impl ClarabelSolver {
    pub fn new(tolerance: f64) -> Self {
        ClarabelSolver {
            tolerance,
            verbose: false,
        }
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        ClarabelSolver::new(crate::configuration::current().tolerance)
    }
}

/// Rows of one cone block in triplet form
#[derive(Default)]
struct RowBlock {
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
    rhs: Vec<f64>,
    /// Constraint owning each row, if any (used to report duals)
    owners: Vec<Option<String>>,
}

impl RowBlock {
    fn push_row<I>(&mut self, terms: I, rhs: f64, owner: Option<&str>)
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let row = self.rhs.len();
        for (col, value) in terms {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
        self.rhs.push(rhs);
        self.owners.push(owner.map(str::to_string));
    }

    fn len(&self) -> usize {
        self.rhs.len()
    }
}

impl ClarabelSolver {
    /// Split the problem into zero cone and nonnegative cone rows
    fn assemble_rows(problem: &Problem) -> (RowBlock, RowBlock) {
        let mut equalities = RowBlock::default();
        let mut inequalities = RowBlock::default();
        for constraint in problem.constraints() {
            let terms = || {
                constraint
                    .get_terms()
                    .iter()
                    .map(|t| (t.variable.index(), t.coefficient))
            };
            let id = Some(constraint.get_id());
            match constraint {
                Constraint::Equality { equals, .. } => equalities.push_row(terms(), *equals, id),
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound == upper_bound {
                        equalities.push_row(terms(), *lower_bound, id);
                        continue;
                    }
                    if upper_bound.is_finite() {
                        inequalities.push_row(terms(), *upper_bound, id);
                    }
                    if lower_bound.is_finite() {
                        inequalities.push_row(terms().map(|(c, v)| (c, -v)), -lower_bound, id);
                    }
                }
            }
        }
        for var in problem.variables() {
            let col = var.index();
            if var.is_fixed() {
                equalities.push_row([(col, 1.0)], var.lower_bound, None);
                continue;
            }
            if var.upper_bound.is_finite() {
                inequalities.push_row([(col, 1.0)], var.upper_bound, None);
            }
            if var.lower_bound.is_finite() {
                inequalities.push_row([(col, -1.0)], -var.lower_bound, None);
            }
        }
        (equalities, inequalities)
    }

    /// Stack both blocks into a single Clarabel constraint matrix
    fn stack(
        equalities: &RowBlock,
        inequalities: &RowBlock,
        num_variables: usize,
    ) -> Result<ClarabelCsc<f64>, SolverError> {
        let offset = equalities.len();
        let rows = equalities
            .rows
            .iter()
            .copied()
            .chain(inequalities.rows.iter().map(|r| r + offset))
            .collect();
        let cols = equalities
            .cols
            .iter()
            .chain(inequalities.cols.iter())
            .copied()
            .collect();
        let values = equalities
            .values
            .iter()
            .chain(inequalities.values.iter())
            .copied()
            .collect();
        let num_rows = offset + inequalities.len();
        let coo = CooMatrix::try_from_triplets(num_rows, num_variables, rows, cols, values)
            .map_err(|err| SolverError::MatrixAssembly(err.to_string()))?;
        let csc = CscMatrix::from(&coo);
        Ok(ClarabelCsc::new(
            num_rows,
            num_variables,
            csc.col_offsets().to_vec(),
            csc.row_indices().to_vec(),
            csc.values().to_vec(),
        ))
    }

    fn convert_status(status: SolverStatus) -> OptimizationStatus {
        #[allow(unreachable_patterns)]
        match status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            SolverStatus::Unsolved => OptimizationStatus::Unoptimized,
            _ => OptimizationStatus::SolverHalted,
        }
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let n = problem.num_variables();
        if n == 0 {
            return Err(SolverError::EmptyProblem);
        }
        let sign = match problem.objective().sense() {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };
        let q: Vec<f64> = problem
            .objective()
            .coefficients(n)
            .into_iter()
            .map(|c| sign * c)
            .collect();
        let p = ClarabelCsc::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());

        let (equalities, inequalities) = Self::assemble_rows(problem);
        let a = Self::stack(&equalities, &inequalities, n)?;
        let b: Vec<f64> = equalities
            .rhs
            .iter()
            .chain(inequalities.rhs.iter())
            .copied()
            .collect();
        let mut cones = Vec::new();
        if equalities.len() > 0 {
            cones.push(ZeroConeT(equalities.len()));
        }
        if inequalities.len() > 0 {
            cones.push(NonnegativeConeT(inequalities.len()));
        }
        debug!(
            "clarabel: {} variables, {} equality rows, {} inequality rows",
            n,
            equalities.len(),
            inequalities.len()
        );

        let settings = DefaultSettingsBuilder::default()
            .verbose(self.verbose)
            .tol_feas(self.tolerance)
            .build()
            .map_err(|err| SolverError::Backend(err.to_string()))?;
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = Self::convert_status(solver.solution.status);
        if !matches!(
            status,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        ) {
            return Ok(ProblemSolution::without_values(status));
        }
        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .map(|v| (v.id.clone(), solver.solution.x[v.index()]))
            .collect();
        let dual_values: IndexMap<String, f64> = equalities
            .owners
            .iter()
            .zip(solver.solution.z.iter())
            .filter_map(|(owner, z)| owner.as_ref().map(|id| (id.clone(), sign * z)))
            .collect();
        Ok(ProblemSolution {
            status,
            objective_value: Some(sign * solver.solution.obj_val),
            variable_values: Some(variable_values),
            dual_values: Some(dual_values),
        })
    }
}
