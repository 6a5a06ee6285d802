//! Solver backends.
//!
//! [`LpSolver`] is the seam between the batch machinery and whatever solves
//! the LP. Backends report raw, backend-specific status strings; the
//! [`SolverAdapter`](crate::SolverAdapter) normalises them.

use lp_core::SubProblem;
use microlp::{ComparisonOp, OptimizationDirection, Problem, Variable};

use crate::error::SolverError;
use crate::options::{SolverBackend, SolverOptions};
use crate::result::SolverDiagnostics;

/// Raw status strings reported by [`SimplexSolver`].
pub mod raw_status {
    /// Optimal solution found.
    pub const OPTIMAL: &str = "optimal";
    /// No feasible point.
    pub const PRIMAL_INFEASIBLE: &str = "primal infeasible";
    /// Objective unbounded (dual infeasible).
    pub const DUAL_INFEASIBLE: &str = "dual infeasible";
}

/// Tolerance for rows that have no coefficients left after slicing.
const EMPTY_ROW_TOLERANCE: f64 = 1e-9;

/// Un-normalised solver output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSolution {
    /// Backend-specific status string.
    pub status: String,
    /// Primal solution, if any.
    pub x: Option<Vec<f64>>,
    /// Primal objective, if any.
    pub primal_objective: Option<f64>,
    /// Backend-reported diagnostics.
    pub diagnostics: SolverDiagnostics,
}

impl RawSolution {
    /// Output with a status and nothing else.
    pub fn status_only(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }

    /// Optimal output.
    pub fn optimal(x: Vec<f64>, objective: f64) -> Self {
        Self {
            status: raw_status::OPTIMAL.to_string(),
            x: Some(x),
            primal_objective: Some(objective),
            diagnostics: SolverDiagnostics::default(),
        }
    }
}

/// Solver collaborator.
///
/// Implementations must be callable from several worker threads at once and
/// must not write to stdout.
pub trait LpSolver: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Solves `min costᵀx s.t. lhs·x ≤ rhs` with `x` free.
    fn solve(&self, problem: &SubProblem, options: &SolverOptions)
        -> Result<RawSolution, SolverError>;
}

/// Simplex backend built on `microlp`.
///
/// Every column becomes a free variable and every row a `≤` constraint, so
/// the box rows of the template are honoured as ordinary constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver;

impl SimplexSolver {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl LpSolver for SimplexSolver {
    fn name(&self) -> &str {
        SolverBackend::Simplex.as_str()
    }

    fn solve(
        &self,
        problem: &SubProblem,
        _options: &SolverOptions,
    ) -> Result<RawSolution, SolverError> {
        let mut lp = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<Variable> = problem
            .cost()
            .iter()
            .map(|&c| lp.add_var(c, (f64::NEG_INFINITY, f64::INFINITY)))
            .collect();

        for (row, &b) in problem.lhs().outer_iterator().zip(problem.rhs()) {
            if row.nnz() == 0 {
                // 0 ≤ b
                if b < -EMPTY_ROW_TOLERANCE {
                    return Ok(RawSolution::status_only(raw_status::PRIMAL_INFEASIBLE));
                }
                continue;
            }
            lp.add_constraint(
                row.iter().map(|(c, &v)| (vars[c], v)),
                ComparisonOp::Le,
                b,
            );
        }

        match lp.solve() {
            Ok(solution) => {
                let x = vars.iter().map(|&v| *solution.var_value(v)).collect();
                Ok(RawSolution::optimal(x, solution.objective()))
            }
            Err(microlp::Error::Infeasible) => {
                Ok(RawSolution::status_only(raw_status::PRIMAL_INFEASIBLE))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(RawSolution::status_only(raw_status::DUAL_INFEASIBLE))
            }
            Err(other) => Err(SolverError::Backend(other.to_string())),
        }
    }
}

/// Instantiates the backend selected in `options`.
pub fn backend_for(backend: SolverBackend) -> Box<dyn LpSolver> {
    match backend {
        SolverBackend::Simplex => Box::new(SimplexSolver::new()),
    }
}
