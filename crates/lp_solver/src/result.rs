//! Per-scenario result record.

use std::fmt;
use std::time::Duration;

use lp_core::{CoreError, MasterProblem, ScenarioId};

use crate::status::SolveStatus;

/// Optional solver diagnostics, mirroring the interior-point report columns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverDiagnostics {
    /// Dual objective value.
    pub dual_objective: Option<f64>,
    /// Duality gap.
    pub gap: Option<f64>,
    /// Relative duality gap.
    pub relative_gap: Option<f64>,
    /// Largest violated constraint, `max(0, max(Ax - b))`.
    pub primal_infeasibility: Option<f64>,
    /// Dual infeasibility.
    pub dual_infeasibility: Option<f64>,
    /// Smallest slack `min(b - Ax)`.
    pub primal_slack: Option<f64>,
    /// Smallest dual slack.
    pub dual_slack: Option<f64>,
    /// Euclidean norm of the positive primal residuals.
    pub res_primal: Option<f64>,
    /// Dual residual norm.
    pub res_dual: Option<f64>,
}

impl SolverDiagnostics {
    /// Fills the primal-side fields from residuals `Ax - b` where empty.
    pub fn fill_primal_from_residuals(&mut self, residuals: &[f64]) {
        if residuals.is_empty() {
            return;
        }
        let worst = residuals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let violation_norm = residuals
            .iter()
            .filter(|&&r| r > 0.0)
            .map(|r| r * r)
            .sum::<f64>()
            .sqrt();

        self.primal_infeasibility.get_or_insert(worst.max(0.0));
        self.res_primal.get_or_insert(violation_norm);
        self.primal_slack.get_or_insert(-worst);
    }
}

/// Portfolio scalars derived from an optimal solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioMetrics {
    /// Expected loss `L[cols]·x`.
    pub expected_loss: f64,
    /// Expected return `R[cols]·x`.
    pub portfolio_return: f64,
}

impl PortfolioMetrics {
    /// Computes the metrics of weights `x` over master columns `columns`.
    pub fn compute(master: &MasterProblem, columns: &[usize], x: &[f64]) -> Self {
        let dot = |coeffs: &[f64]| -> f64 {
            columns
                .iter()
                .zip(x)
                .map(|(&c, &w)| coeffs[c] * w)
                .sum()
        };
        Self {
            expected_loss: dot(master.expected_loss()),
            portfolio_return: dot(master.asset_returns()),
        }
    }
}

/// Why a scenario did not produce a solver answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailureKind {
    /// Repeated asset index.
    InvalidScenario,
    /// Empty active-variable list.
    DegenerateScenario,
    /// Index outside the master matrix.
    ShapeMismatch,
    /// Solver raised or returned unusable output.
    SolverFailure,
    /// Solve exceeded the per-scenario timeout.
    Timeout,
    /// Worker panicked or vanished.
    WorkerCrash,
}

impl FailureKind {
    /// Short name written to result files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidScenario => "invalid_scenario",
            Self::DegenerateScenario => "degenerate_scenario",
            Self::ShapeMismatch => "shape_mismatch",
            Self::SolverFailure => "solver_failure",
            Self::Timeout => "timeout",
            Self::WorkerCrash => "worker_crash",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic note attached to a failed scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl Failure {
    /// Creates a failure note.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classifies a scenario-level core error.
    pub fn from_core_error(err: &CoreError) -> Self {
        let kind = match err {
            CoreError::DegenerateScenario => FailureKind::DegenerateScenario,
            CoreError::InvalidScenario { .. } => FailureKind::InvalidScenario,
            CoreError::ShapeMismatch(_) | CoreError::Configuration(_) => FailureKind::ShapeMismatch,
        };
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of one scenario.
///
/// Exactly one record exists per submitted scenario, whether or not the
/// solver ran. `solution` is present only for optimal results and then has
/// one entry per active variable, in the scenario's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// Originating scenario.
    pub scenario_id: ScenarioId,
    /// Normalised status.
    pub status: SolveStatus,
    /// Weights of the active variables.
    pub solution: Option<Vec<f64>>,
    /// Primal objective value.
    pub objective: Option<f64>,
    /// Wall-clock time of the solver call alone.
    pub elapsed: Duration,
    /// Solver diagnostics.
    pub diagnostics: SolverDiagnostics,
    /// Portfolio scalars on optimal results.
    pub metrics: Option<PortfolioMetrics>,
    /// Failure note on contained per-scenario errors.
    pub failure: Option<Failure>,
}

impl SolveResult {
    /// Result for a scenario that never reached a usable solver answer.
    pub fn failed(scenario_id: ScenarioId, failure: Failure) -> Self {
        Self {
            scenario_id,
            status: SolveStatus::Unknown,
            solution: None,
            objective: None,
            elapsed: Duration::ZERO,
            diagnostics: SolverDiagnostics::default(),
            metrics: None,
            failure: Some(failure),
        }
    }

    /// Attaches portfolio metrics.
    pub fn with_metrics(mut self, metrics: PortfolioMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether the solve was optimal.
    #[inline]
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// Elapsed solver time in seconds.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lp_core::{ConstraintTemplate, MasterInputs};

    #[test]
    fn test_fill_primal_from_residuals() {
        let mut diag = SolverDiagnostics::default();
        diag.fill_primal_from_residuals(&[-0.5, 0.3, -0.1, 0.4]);
        assert_relative_eq!(diag.primal_infeasibility.unwrap(), 0.4);
        assert_relative_eq!(diag.res_primal.unwrap(), 0.5);
        assert_relative_eq!(diag.primal_slack.unwrap(), -0.4);
    }

    #[test]
    fn test_fill_keeps_backend_values() {
        let mut diag = SolverDiagnostics {
            primal_infeasibility: Some(1e-12),
            ..Default::default()
        };
        diag.fill_primal_from_residuals(&[-1.0, -2.0]);
        assert_eq!(diag.primal_infeasibility, Some(1e-12));
        assert_relative_eq!(diag.res_primal.unwrap(), 0.0);
        assert_relative_eq!(diag.primal_slack.unwrap(), 1.0);
    }

    #[test]
    fn test_portfolio_metrics() {
        let inputs = MasterInputs::new(
            vec![10.0, 20.0, 30.0],
            vec![0.1, 0.2, 0.3],
            vec![1.0; 3],
            0.0,
        );
        let master = lp_core::MasterProblem::build(&inputs, ConstraintTemplate::MinReturn).unwrap();
        let metrics = PortfolioMetrics::compute(&master, &[2, 0], &[0.25, 0.75]);
        assert_relative_eq!(metrics.expected_loss, 15.0);
        assert_relative_eq!(metrics.portfolio_return, 0.15);
    }

    #[test]
    fn test_failure_from_core_error() {
        let f = Failure::from_core_error(&CoreError::DegenerateScenario);
        assert_eq!(f.kind, FailureKind::DegenerateScenario);
        let f = Failure::from_core_error(&CoreError::InvalidScenario { index: 3 });
        assert_eq!(f.kind, FailureKind::InvalidScenario);
        assert!(f.to_string().starts_with("invalid_scenario: "));
    }

    #[test]
    fn test_failed_result_is_unknown() {
        let r = SolveResult::failed(
            ScenarioId::new(5),
            Failure::new(FailureKind::SolverFailure, "injected"),
        );
        assert_eq!(r.status, SolveStatus::Unknown);
        assert!(r.solution.is_none());
        assert!(!r.is_optimal());
        assert_eq!(r.elapsed_secs(), 0.0);
    }
}
