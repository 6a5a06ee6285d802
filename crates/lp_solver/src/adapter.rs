//! Solver adapter.
//!
//! Times the solver call, normalises its status and never raises: any
//! backend error becomes an `Unknown` result carrying a failure note.

use std::sync::Arc;
use std::time::Instant;

use lp_core::{ScenarioId, SubProblem};
use tracing::{trace, warn};

use crate::backend::{backend_for, LpSolver};
use crate::options::SolverOptions;
use crate::result::{Failure, FailureKind, SolveResult, SolverDiagnostics};
use crate::status::SolveStatus;

/// Uniform front for any [`LpSolver`].
#[derive(Clone)]
pub struct SolverAdapter {
    solver: Arc<dyn LpSolver>,
    options: SolverOptions,
}

impl std::fmt::Debug for SolverAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverAdapter")
            .field("solver", &self.solver.name())
            .field("options", &self.options)
            .finish()
    }
}

impl SolverAdapter {
    /// Wraps an explicit solver.
    pub fn new(solver: Arc<dyn LpSolver>, options: SolverOptions) -> Self {
        Self { solver, options }
    }

    /// Wraps the backend selected in `options`.
    pub fn from_options(options: SolverOptions) -> Self {
        let solver: Arc<dyn LpSolver> = Arc::from(backend_for(options.backend));
        Self::new(solver, options)
    }

    /// Options passed to every call.
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Name of the wrapped solver.
    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Solves one sub-problem and normalises the outcome.
    pub fn solve(&self, scenario_id: ScenarioId, problem: &SubProblem) -> SolveResult {
        let start = Instant::now();
        let raw = self.solver.solve(problem, &self.options);
        let elapsed = start.elapsed();

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                warn!(scenario = %scenario_id, error = %e, "solver call failed");
                let mut result =
                    SolveResult::failed(scenario_id, Failure::new(FailureKind::SolverFailure, e.to_string()));
                result.elapsed = elapsed;
                return result;
            }
        };

        let mut status = SolveStatus::normalize(&raw.status);
        let mut failure = None;
        let mut diagnostics: SolverDiagnostics = raw.diagnostics;
        let mut objective = raw.primal_objective;

        let solution = match (status, raw.x) {
            (SolveStatus::Optimal, Some(x)) if x.len() == problem.n_cols() => {
                diagnostics.fill_primal_from_residuals(&problem.residuals(&x));
                objective.get_or_insert_with(|| problem.objective(&x));
                Some(x)
            }
            (SolveStatus::Optimal, x) => {
                let got = x.map(|x| x.len());
                warn!(
                    scenario = %scenario_id,
                    expected = problem.n_cols(),
                    got = ?got,
                    "optimal status without a usable solution vector"
                );
                status = SolveStatus::Unknown;
                objective = None;
                failure = Some(Failure::new(
                    FailureKind::SolverFailure,
                    format!(
                        "optimal status with solution length {:?}, expected {}",
                        got,
                        problem.n_cols()
                    ),
                ));
                None
            }
            (_, _) => None,
        };

        if status == SolveStatus::Unknown && failure.is_none() {
            warn!(scenario = %scenario_id, raw_status = %raw.status, "unrecognised solver status");
            failure = Some(Failure::new(
                FailureKind::SolverFailure,
                format!("unrecognised solver status '{}'", raw.status),
            ));
        }

        if self.options.verbose {
            trace!(
                scenario = %scenario_id,
                solver = self.solver.name(),
                status = %status,
                elapsed_ms = elapsed.as_secs_f64() * 1e3,
                "solve finished"
            );
        }

        SolveResult {
            scenario_id,
            status,
            solution,
            objective,
            elapsed,
            diagnostics,
            metrics: None,
            failure,
        }
    }
}
