//! Infeasibility probe.
//!
//! Re-solves scenarios that did not reach an optimal answer against the
//! [`ConstraintTemplate::ReturnProbe`] master, which drops the return floor
//! and maximises portfolio return instead. Comparing the attainable return
//! against the floor tells whether the floor explains the failure.

use std::fmt;
use std::sync::Arc;

use lp_core::{
    ConstraintTemplate, MasterInputs, MasterProblem, Scenario, ScenarioId, ScenarioIndexer, SubproblemBuilder,
};
use lp_solver::{PortfolioMetrics, SolveStatus, SolverAdapter};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::error::ProbeError;
use crate::orchestrator::default_worker_count;

/// Classified cause of a failed solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfeasibilityCause {
    /// Best attainable return is below the floor.
    ReturnInfeasible,
    /// Relaxed problem is not optimal either.
    StructurallyInfeasible,
    /// Floor is attainable, so it does not explain the failure.
    ReturnAttainable,
}

impl InfeasibilityCause {
    /// Short name written to the probe file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReturnInfeasible => "return_infeasible",
            Self::StructurallyInfeasible => "structurally_infeasible",
            Self::ReturnAttainable => "return_attainable",
        }
    }
}

impl fmt::Display for InfeasibilityCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probe verdict for one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// Probed scenario.
    pub scenario_id: ScenarioId,
    /// Status of the relaxed solve.
    pub status: SolveStatus,
    /// Maximum attainable return, when the relaxed solve was optimal.
    pub max_return: Option<f64>,
    /// Classified cause.
    pub cause: InfeasibilityCause,
}

/// Classifies failed scenarios by re-solving a return-maximising relaxation.
///
/// Batch classification runs on the probe's own bounded pool, never on the
/// global rayon pool.
#[derive(Debug, Clone)]
pub struct InfeasibilityProbe {
    master: Arc<MasterProblem>,
    adapter: SolverAdapter,
    pool: Arc<ThreadPool>,
}

impl InfeasibilityProbe {
    /// Wraps an existing probe master.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::WrongTemplate`] unless the master was built
    /// with [`ConstraintTemplate::ReturnProbe`], and
    /// [`ProbeError::PoolBuild`] if the worker pool cannot be started.
    pub fn new(master: Arc<MasterProblem>, adapter: SolverAdapter) -> Result<Self, ProbeError> {
        match master.template() {
            ConstraintTemplate::ReturnProbe => Ok(Self {
                master,
                adapter,
                pool: build_pool(default_worker_count())?,
            }),
            other => Err(ProbeError::WrongTemplate(other)),
        }
    }

    /// Replaces the pool with one of `worker_count` threads (at least one).
    pub fn with_worker_count(mut self, worker_count: usize) -> Result<Self, ProbeError> {
        self.pool = build_pool(worker_count)?;
        Ok(self)
    }

    /// Threads used by [`classify_ids`](Self::classify_ids).
    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Builds the probe master from the same inputs as the main run.
    pub fn from_inputs(inputs: &MasterInputs, adapter: SolverAdapter) -> Result<Self, ProbeError> {
        let master = MasterProblem::build(inputs, ConstraintTemplate::ReturnProbe)?;
        Self::new(Arc::new(master), adapter)
    }

    /// Return floor the outcomes are compared against.
    pub fn required_return(&self) -> f64 {
        self.master.required_return()
    }

    /// Classifies one scenario.
    ///
    /// # Errors
    ///
    /// Indexing errors (empty, duplicate or out-of-range variables) are
    /// returned as [`ProbeError::Core`].
    pub fn classify(&self, scenario: &Scenario) -> Result<ProbeOutcome, ProbeError> {
        let set = ScenarioIndexer::for_master(&self.master).compute(scenario.active_vars())?;
        let sub = SubproblemBuilder::new(&self.master).build_for(&set)?;

        let result = self.adapter.solve(scenario.id(), &sub);
        let max_return = result
            .solution
            .as_deref()
            .map(|x| PortfolioMetrics::compute(&self.master, sub.columns(), x).portfolio_return);
        let required = self.required_return();

        let cause = match max_return {
            None => InfeasibilityCause::StructurallyInfeasible,
            Some(r) if r < required => InfeasibilityCause::ReturnInfeasible,
            Some(_) => InfeasibilityCause::ReturnAttainable,
        };

        debug!(
            scenario = %scenario.id(),
            status = %result.status,
            max_return = ?max_return,
            required,
            cause = %cause,
            "scenario probed"
        );

        Ok(ProbeOutcome {
            scenario_id: scenario.id(),
            status: result.status,
            max_return,
            cause,
        })
    }

    /// Classifies the scenarios named by `ids`, in parallel.
    ///
    /// Outcomes come back in the order of `ids`. Ids missing from
    /// `scenarios` yield [`ProbeError::UnknownScenario`].
    pub fn classify_ids(
        &self,
        scenarios: &[Scenario],
        ids: &[ScenarioId],
    ) -> Vec<Result<ProbeOutcome, ProbeError>> {
        info!(count = ids.len(), workers = self.worker_count(), "probing unsolved scenarios");
        self.pool.install(|| {
            ids.par_iter()
                .map(|&id| {
                    let scenario = find_scenario(scenarios, id).ok_or(ProbeError::UnknownScenario(id))?;
                    self.classify(scenario)
                })
                .collect()
        })
    }
}

fn build_pool(worker_count: usize) -> Result<Arc<ThreadPool>, ProbeError> {
    ThreadPoolBuilder::new()
        .num_threads(worker_count.max(1))
        .thread_name(|i| format!("lp-probe-{i}"))
        .build()
        .map(Arc::new)
        .map_err(|e| ProbeError::PoolBuild(e.to_string()))
}

fn find_scenario(scenarios: &[Scenario], id: ScenarioId) -> Option<&Scenario> {
    match scenarios.get(id.index()) {
        Some(s) if s.id() == id => Some(s),
        _ => scenarios.iter().find(|s| s.id() == id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lp_solver::SolverOptions;

    fn inputs(required_return: f64) -> MasterInputs {
        MasterInputs::new(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![0.1, 0.2, 0.3, 0.4],
            vec![0.6, 0.6, 0.6, 0.6],
            required_return,
        )
    }

    fn probe(required_return: f64) -> InfeasibilityProbe {
        InfeasibilityProbe::from_inputs(
            &inputs(required_return),
            SolverAdapter::from_options(SolverOptions::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_min_return_master() {
        let master = MasterProblem::build(&inputs(0.1), ConstraintTemplate::MinReturn).unwrap();
        let err = InfeasibilityProbe::new(
            Arc::new(master),
            SolverAdapter::from_options(SolverOptions::default()),
        )
        .unwrap_err();
        assert!(matches!(err, ProbeError::WrongTemplate(ConstraintTemplate::MinReturn)));
    }

    #[test]
    fn test_return_infeasible() {
        // Best mix of assets 0 and 1 under a 0.6 cap: 0.4 * 0.1 + 0.6 * 0.2.
        let outcome = probe(0.35).classify(&Scenario::new(0usize, vec![0, 1])).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_relative_eq!(outcome.max_return.unwrap(), 0.16, epsilon = 1e-9);
        assert_eq!(outcome.cause, InfeasibilityCause::ReturnInfeasible);
    }

    #[test]
    fn test_structurally_infeasible() {
        // A single asset capped at 0.6 can never reach full investment.
        let outcome = probe(0.1).classify(&Scenario::new(1usize, vec![3])).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert_eq!(outcome.max_return, None);
        assert_eq!(outcome.cause, InfeasibilityCause::StructurallyInfeasible);
    }

    #[test]
    fn test_return_attainable() {
        let outcome = probe(0.3).classify(&Scenario::new(2usize, vec![2, 3])).unwrap();
        assert_relative_eq!(outcome.max_return.unwrap(), 0.36, epsilon = 1e-9);
        assert_eq!(outcome.cause, InfeasibilityCause::ReturnAttainable);
    }

    #[test]
    fn test_classify_rejects_bad_scenario() {
        let err = probe(0.1).classify(&Scenario::new(0usize, vec![])).unwrap_err();
        assert!(matches!(err, ProbeError::Core(lp_core::CoreError::DegenerateScenario)));
    }

    #[test]
    fn test_classify_ids_keeps_order_and_flags_unknown() {
        let scenarios = Scenario::from_lists(vec![vec![0, 1], vec![3], vec![2, 3]]);
        let ids = [ScenarioId::new(2), ScenarioId::new(9), ScenarioId::new(1)];
        let outcomes = probe(0.35).classify_ids(&scenarios, &ids);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].as_ref().unwrap().scenario_id, ScenarioId::new(2));
        assert!(matches!(outcomes[1], Err(ProbeError::UnknownScenario(id)) if id == ScenarioId::new(9)));
        assert_eq!(
            outcomes[2].as_ref().unwrap().cause,
            InfeasibilityCause::StructurallyInfeasible
        );
    }

    #[test]
    fn test_classify_ids_runs_on_bounded_pool() {
        let probe = probe(0.35).with_worker_count(2).unwrap();
        assert_eq!(probe.worker_count(), 2);
        assert_eq!(probe.clone().with_worker_count(0).unwrap().worker_count(), 1);

        let scenarios = Scenario::from_lists(vec![vec![0, 1], vec![3], vec![2, 3]]);
        let ids: Vec<ScenarioId> = (0..3).map(ScenarioId::new).collect();
        let names: Vec<Option<String>> = probe.pool.install(|| {
            ids.par_iter()
                .map(|_| std::thread::current().name().map(str::to_string))
                .collect()
        });
        assert!(names.iter().all(|n| n.as_deref().is_some_and(|n| n.starts_with("lp-probe-"))));

        let outcomes = probe.classify_ids(&scenarios, &ids);
        assert!(outcomes.iter().all(Result::is_ok));
        assert_eq!(outcomes[1].as_ref().unwrap().cause, InfeasibilityCause::StructurallyInfeasible);
    }

    #[test]
    fn test_find_scenario_falls_back_to_search() {
        let scenarios = vec![Scenario::new(10usize, vec![0]), Scenario::new(4usize, vec![1])];
        assert_eq!(find_scenario(&scenarios, ScenarioId::new(4)).unwrap().active_vars(), &[1]);
        assert!(find_scenario(&scenarios, ScenarioId::new(1)).is_none());
    }
}
