//! Batch statistics.

use std::time::Duration;

use lp_solver::{FailureKind, SolveResult, SolveStatus};

/// Counters accumulated over one batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Results recorded.
    pub scenarios: usize,
    /// Optimal results.
    pub optimal: usize,
    /// Infeasible results.
    pub infeasible: usize,
    /// Unbounded results.
    pub unbounded: usize,
    /// Unknown results, including contained failures.
    pub unknown: usize,
    /// Results carrying a failure note.
    pub failures: usize,
    /// Scenarios abandoned after the timeout.
    pub timeouts: usize,
    /// Scenarios lost to a worker panic.
    pub crashes: usize,
    /// Batches dispatched.
    pub batches: usize,
    /// Summed solver time.
    pub solver_time: Duration,
    /// Wall-clock time of the whole run.
    pub wall_time: Duration,
}

impl BatchSummary {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one result into the counters.
    pub fn record(&mut self, result: &SolveResult) {
        self.scenarios += 1;
        match result.status {
            SolveStatus::Optimal => self.optimal += 1,
            SolveStatus::Infeasible => self.infeasible += 1,
            SolveStatus::Unbounded => self.unbounded += 1,
            SolveStatus::Unknown => self.unknown += 1,
        }
        if let Some(failure) = &result.failure {
            self.failures += 1;
            match failure.kind {
                FailureKind::Timeout => self.timeouts += 1,
                FailureKind::WorkerCrash => self.crashes += 1,
                _ => {}
            }
        }
        self.solver_time += result.elapsed;
    }

    /// Count for one status.
    pub fn count(&self, status: SolveStatus) -> usize {
        match status {
            SolveStatus::Optimal => self.optimal,
            SolveStatus::Infeasible => self.infeasible,
            SolveStatus::Unbounded => self.unbounded,
            SolveStatus::Unknown => self.unknown,
        }
    }

    /// Share of optimal results as a percentage.
    #[inline]
    pub fn success_rate(&self) -> f64 {
        if self.scenarios == 0 {
            0.0
        } else {
            (self.optimal as f64 / self.scenarios as f64) * 100.0
        }
    }

    /// Mean solver time per scenario.
    pub fn mean_solve_time(&self) -> Duration {
        if self.scenarios == 0 {
            Duration::ZERO
        } else {
            self.solver_time / self.scenarios as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lp_core::ScenarioId;
    use lp_solver::{Failure, SolverDiagnostics};

    fn result(id: usize, status: SolveStatus, ms: u64) -> SolveResult {
        SolveResult {
            scenario_id: ScenarioId::new(id),
            status,
            solution: None,
            objective: None,
            elapsed: Duration::from_millis(ms),
            diagnostics: SolverDiagnostics::default(),
            metrics: None,
            failure: None,
        }
    }

    #[test]
    fn test_record_counts() {
        let mut summary = BatchSummary::new();
        summary.record(&result(0, SolveStatus::Optimal, 10));
        summary.record(&result(1, SolveStatus::Optimal, 30));
        summary.record(&result(2, SolveStatus::Infeasible, 20));
        summary.record(&SolveResult::failed(
            ScenarioId::new(3),
            Failure::new(FailureKind::Timeout, "slow"),
        ));

        assert_eq!(summary.scenarios, 4);
        assert_eq!(summary.count(SolveStatus::Optimal), 2);
        assert_eq!(summary.count(SolveStatus::Infeasible), 1);
        assert_eq!(summary.count(SolveStatus::Unknown), 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.crashes, 0);
        assert_eq!(summary.solver_time, Duration::from_millis(60));
        assert_eq!(summary.mean_solve_time(), Duration::from_millis(15));
        assert_eq!(summary.success_rate(), 50.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::new();
        assert_eq!(summary.success_rate(), 0.0);
        assert_eq!(summary.mean_solve_time(), Duration::ZERO);
    }
}
