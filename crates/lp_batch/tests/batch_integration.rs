//! Integration tests for the batch orchestrator.
//!
//! These drive the full path from a frozen master through the worker pool
//! into result sinks, including injected solver faults.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use lp_batch::{
    BatchOrchestrator, InfeasibilityCause, InfeasibilityProbe, MemorySink, OrchestratorConfig, ProbeTsvWriter,
    ResultSink, StatusColumn, TsvResultSink,
};
use lp_core::{ConstraintTemplate, MasterInputs, MasterProblem, Scenario, ScenarioId, SubProblem};
use lp_solver::{
    FailureKind, LpSolver, RawSolution, SimplexSolver, SolveResult, SolveStatus, SolverAdapter, SolverError,
    SolverOptions,
};

// ============================================================================
// Fixtures
// ============================================================================

fn inputs() -> MasterInputs {
    MasterInputs::new(
        vec![5.0, 4.0, 3.0, 2.0, 1.0, 6.0],
        vec![0.02, 0.04, 0.06, 0.08, 0.01, 0.10],
        vec![0.7; 6],
        0.05,
    )
}

fn master() -> Arc<MasterProblem> {
    Arc::new(MasterProblem::build(&inputs(), ConstraintTemplate::MinReturn).unwrap())
}

/// Ten scenarios with distinct column sets; scenario 5 is `[1, 5]`.
fn scenarios() -> Vec<Scenario> {
    Scenario::from_lists(vec![
        vec![0, 1],
        vec![2, 3],
        vec![0, 4],
        vec![3],
        vec![0, 1, 2],
        vec![1, 5],
        vec![4, 5],
        vec![0, 2, 4],
        vec![1, 2, 3, 4],
        vec![0, 1, 2, 3, 4, 5],
    ])
}

const FAULTY_COLUMNS: [usize; 2] = [1, 5];

enum Fault {
    Error,
    Panic,
    Sleep(Duration),
    Hang,
}

/// Real backend that misbehaves on one column set.
struct FaultySolver {
    fault: Fault,
    inner: SimplexSolver,
}

impl FaultySolver {
    fn adapter(fault: Fault) -> SolverAdapter {
        SolverAdapter::new(
            Arc::new(Self {
                fault,
                inner: SimplexSolver::new(),
            }),
            SolverOptions::default(),
        )
    }
}

impl LpSolver for FaultySolver {
    fn name(&self) -> &str {
        "faulty"
    }

    fn solve(&self, problem: &SubProblem, options: &SolverOptions) -> Result<RawSolution, SolverError> {
        if problem.columns() == FAULTY_COLUMNS {
            match self.fault {
                Fault::Error => return Err(SolverError::Backend("injected failure".into())),
                Fault::Panic => panic!("injected panic"),
                Fault::Sleep(d) => std::thread::sleep(d),
                Fault::Hang => loop {
                    std::thread::park();
                },
            }
        }
        self.inner.solve(problem, options)
    }
}

fn orchestrator(workers: usize, adapter: SolverAdapter) -> BatchOrchestrator {
    BatchOrchestrator::new(OrchestratorConfig::default().with_worker_count(workers), adapter)
}

fn default_adapter() -> SolverAdapter {
    SolverAdapter::from_options(SolverOptions::default())
}

fn by_id(results: impl IntoIterator<Item = SolveResult>) -> BTreeMap<usize, SolveResult> {
    let mut map = BTreeMap::new();
    for r in results {
        let previous = map.insert(r.scenario_id.index(), r);
        assert!(previous.is_none(), "scenario emitted twice");
    }
    map
}

// ============================================================================
// Completeness and determinism
// ============================================================================

#[test]
fn test_every_scenario_emitted_exactly_once() {
    let orch = BatchOrchestrator::new(
        OrchestratorConfig::default().with_worker_count(3).with_batch_size(4),
        default_adapter(),
    );

    let results = by_id(orch.run(master(), scenarios()));
    assert_eq!(results.keys().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_worker_count_does_not_change_content() {
    let key = |r: &SolveResult| (r.status, r.objective.map(|o| (o * 1e9).round() as i64));

    let sequential = by_id(orchestrator(1, default_adapter()).run(master(), scenarios()));
    let parallel = by_id(orchestrator(4, default_adapter()).run(master(), scenarios()));

    assert_eq!(sequential.len(), parallel.len());
    for (id, r) in &sequential {
        assert_eq!(key(r), key(&parallel[id]), "scenario {id} differs");
    }
}

#[test]
fn test_optimal_results_respect_constraints() {
    let inputs = inputs();
    let results = by_id(orchestrator(2, default_adapter()).run(master(), scenarios()));

    for (id, r) in &results {
        if !r.is_optimal() {
            continue;
        }
        let x = r.solution.as_ref().unwrap();
        let vars = scenarios()[*id].active_vars().to_vec();
        assert_eq!(x.len(), vars.len());
        assert_relative_eq!(x.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        for (&j, &w) in vars.iter().zip(x) {
            assert!(w >= -1e-9 && w <= inputs.upper_bounds[j] + 1e-9);
        }
        let metrics = r.metrics.unwrap();
        assert!(metrics.portfolio_return >= inputs.required_return - 1e-9);
        assert_relative_eq!(metrics.expected_loss, r.objective.unwrap(), epsilon = 1e-9);
    }

    // A lone asset capped at 0.7 cannot be fully invested.
    assert_eq!(results[&3].status, SolveStatus::Infeasible);
}

// ============================================================================
// Fault containment
// ============================================================================

#[test]
fn test_solver_failure_on_scenario_five_is_contained() {
    let clean = by_id(orchestrator(4, default_adapter()).run(master(), scenarios()));
    let faulty = by_id(orchestrator(4, FaultySolver::adapter(Fault::Error)).run(master(), scenarios()));

    assert_eq!(faulty.len(), 10);
    let five = &faulty[&5];
    assert_eq!(five.status, SolveStatus::Unknown);
    assert_eq!(five.failure.as_ref().unwrap().kind, FailureKind::SolverFailure);

    for id in (0..10).filter(|&id| id != 5) {
        assert_eq!(faulty[&id].status, clean[&id].status);
        assert_eq!(faulty[&id].solution, clean[&id].solution);
        assert_eq!(faulty[&id].objective, clean[&id].objective);
    }
}

#[test]
fn test_worker_panic_is_recorded_as_crash() {
    let results = by_id(orchestrator(2, FaultySolver::adapter(Fault::Panic)).run(master(), scenarios()));

    assert_eq!(results.len(), 10);
    let crash = results[&5].failure.as_ref().unwrap();
    assert_eq!(crash.kind, FailureKind::WorkerCrash);
    assert!(crash.message.contains("injected panic"));
    assert!(results
        .iter()
        .filter(|(&id, _)| id != 5)
        .all(|(_, r)| r.failure.is_none()));
}

#[test]
fn test_slow_scenario_times_out() {
    let orch = BatchOrchestrator::new(
        OrchestratorConfig::default()
            .with_worker_count(2)
            .with_scenario_timeout(Duration::from_millis(200)),
        FaultySolver::adapter(Fault::Sleep(Duration::from_secs(3))),
    );

    let start = Instant::now();
    let results = by_id(orch.run(master(), scenarios()));
    assert!(start.elapsed() < Duration::from_secs(3));

    assert_eq!(results.len(), 10);
    let timed_out = &results[&5];
    assert_eq!(timed_out.status, SolveStatus::Unknown);
    assert_eq!(timed_out.failure.as_ref().unwrap().kind, FailureKind::Timeout);
    assert!(results
        .iter()
        .filter(|(&id, _)| id != 5)
        .all(|(_, r)| r.failure.is_none()));
}

#[test]
fn test_bad_scenarios_do_not_abort_the_batch() {
    let scenarios = vec![
        Scenario::new(0usize, vec![1, 3]),
        Scenario::new(1usize, vec![]),
        Scenario::new(2usize, vec![2, 2]),
        Scenario::new(3usize, vec![99]),
        Scenario::new(4usize, vec![2, 3]),
    ];
    let results = by_id(orchestrator(2, default_adapter()).run(master(), scenarios));

    assert_eq!(results.len(), 5);
    assert_eq!(results[&1].failure.as_ref().unwrap().kind, FailureKind::DegenerateScenario);
    assert_eq!(results[&2].failure.as_ref().unwrap().kind, FailureKind::InvalidScenario);
    assert_eq!(results[&3].failure.as_ref().unwrap().kind, FailureKind::ShapeMismatch);
    assert!(results[&0].is_optimal());
    assert!(results[&4].is_optimal());
}

#[test]
fn test_return_floor_out_of_reach_is_infeasible() {
    // Best mix of assets 0 and 1 under the 0.7 caps returns 0.034 < 0.05.
    let results = by_id(orchestrator(1, default_adapter()).run(master(), vec![Scenario::new(0usize, vec![0, 1])]));
    assert_eq!(results[&0].status, SolveStatus::Infeasible);
    assert!(results[&0].failure.is_none());
}

#[test]
fn test_hung_solve_does_not_stall_single_worker() {
    let orch = BatchOrchestrator::new(
        OrchestratorConfig::default()
            .with_worker_count(1)
            .with_batch_size(4)
            .with_scenario_timeout(Duration::from_millis(100)),
        FaultySolver::adapter(Fault::Hang),
    );

    let start = Instant::now();
    let mut run = orch.run(master(), scenarios());
    let results = by_id(run.by_ref());
    assert!(start.elapsed() < Duration::from_secs(10));

    assert_eq!(results.len(), 10);
    assert_eq!(run.batches_dispatched(), 3);
    assert_eq!(results[&5].failure.as_ref().unwrap().kind, FailureKind::Timeout);
    assert!(results
        .iter()
        .filter(|(&id, _)| id != 5)
        .all(|(_, r)| r.failure.is_none()));
}

#[test]
fn test_every_hung_solve_times_out_in_turn() {
    let hung = vec![
        Scenario::new(0usize, vec![1, 5]),
        Scenario::new(1usize, vec![1, 5]),
        Scenario::new(2usize, vec![2, 3]),
    ];
    let orch = BatchOrchestrator::new(
        OrchestratorConfig::default()
            .with_worker_count(1)
            .with_scenario_timeout(Duration::from_millis(100)),
        FaultySolver::adapter(Fault::Hang),
    );

    let results = by_id(orch.run(master(), hung));
    assert_eq!(results[&0].failure.as_ref().unwrap().kind, FailureKind::Timeout);
    assert_eq!(results[&1].failure.as_ref().unwrap().kind, FailureKind::Timeout);
    assert!(results[&2].is_optimal());
}

// ============================================================================
// Sinks
// ============================================================================

#[test]
fn test_run_into_flushes_per_batch() {
    let orch = BatchOrchestrator::new(
        OrchestratorConfig::default().with_worker_count(2).with_batch_size(3),
        default_adapter(),
    );

    let mut sink = MemorySink::new();
    let summary = orch.run_into(master(), scenarios(), &mut sink).unwrap();

    assert_eq!(summary.scenarios, 10);
    assert_eq!(summary.batches, 4);
    assert_eq!(sink.flushes(), 5);
    assert_eq!(
        summary.optimal + summary.infeasible + summary.unbounded + summary.unknown,
        10
    );
    assert_eq!(sink.len(), 10);
}

#[test]
fn test_run_into_tsv_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = TsvResultSink::create(dir.path(), StatusColumn::ALL.to_vec()).unwrap();
    orchestrator(2, default_adapter())
        .run_into(master(), scenarios(), &mut sink)
        .unwrap();
    drop(sink);

    let status = std::fs::read_to_string(dir.path().join("result_status.txt")).unwrap();
    let mut lines = status.lines();
    let header: Vec<&str> = lines.next().unwrap().split('\t').collect();
    assert_eq!(header.len(), StatusColumn::ALL.len());
    assert_eq!(header[0], "prob_num");

    let mut ids: Vec<usize> = lines
        .map(|l| l.split('\t').next().unwrap().parse().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..10).collect::<Vec<_>>());

    let weights = std::fs::read_to_string(dir.path().join("result_weights.txt")).unwrap();
    assert_eq!(weights.lines().count(), 10);
    let infeasible_row = weights
        .lines()
        .find(|l| l.split('\t').next() == Some("3"))
        .unwrap();
    assert_eq!(infeasible_row, "3");
}

/// Sink that fails after a fixed number of writes.
struct BrokenSink {
    remaining: usize,
}

impl ResultSink for BrokenSink {
    fn write(&mut self, _: &SolveResult) -> Result<(), lp_batch::SinkError> {
        if self.remaining == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.remaining -= 1;
        Ok(())
    }
}

#[test]
fn test_sink_failure_aborts_run() {
    let err = orchestrator(2, default_adapter())
        .run_into(master(), scenarios(), &mut BrokenSink { remaining: 3 })
        .unwrap_err();
    assert!(err.to_string().contains("disk full"));
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_four_asset_example() {
    let inputs = MasterInputs::new(vec![1.0; 4], vec![0.0; 4], vec![1.0; 4], 0.0);
    let master = Arc::new(MasterProblem::build(&inputs, ConstraintTemplate::MinReturn).unwrap());
    let mut sink = MemorySink::new();

    orchestrator(1, default_adapter())
        .run_into(master, vec![Scenario::new(0usize, vec![0, 2])], &mut sink)
        .unwrap();

    let result = &sink.results()[0];
    assert_eq!(result.scenario_id, ScenarioId::new(0));
    assert_eq!(result.status, SolveStatus::Optimal);
    assert_eq!(result.solution.as_ref().unwrap().len(), 2);
    assert!(result.objective.unwrap() <= 1.0 + 1e-9);
}

#[test]
fn test_probe_classifies_unsolved_scenarios() {
    let mut sink = MemorySink::new();
    orchestrator(2, default_adapter())
        .run_into(master(), scenarios(), &mut sink)
        .unwrap();

    let unsolved: Vec<ScenarioId> = sink
        .into_sorted()
        .into_iter()
        .filter(|r| !r.is_optimal())
        .map(|r| r.scenario_id)
        .collect();
    assert!(unsolved.contains(&ScenarioId::new(3)));

    let probe = InfeasibilityProbe::from_inputs(&inputs(), default_adapter()).unwrap();
    let outcomes = probe.classify_ids(&scenarios(), &unsolved);
    assert_eq!(outcomes.len(), unsolved.len());

    let mut writer = ProbeTsvWriter::new(Vec::new()).unwrap();
    for outcome in outcomes {
        let outcome = outcome.unwrap();
        if outcome.scenario_id == ScenarioId::new(3) {
            assert_eq!(outcome.cause, InfeasibilityCause::StructurallyInfeasible);
        }
        writer.write(&outcome).unwrap();
    }
    let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    assert!(text.contains("3\t-1\tstructurally_infeasible"));
}
