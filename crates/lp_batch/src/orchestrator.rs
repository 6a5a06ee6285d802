//! Batch orchestrator.
//!
//! Scenarios are queued in batches and handed one at a time to a bounded
//! set of worker threads. Workers send each [`SolveResult`] back over a
//! shared channel; the coordinating thread yields them in completion order.
//!
//! # Guarantees
//!
//! - Exactly one result per submitted scenario.
//! - A failing, panicking or timed-out scenario never affects the others.
//! - The master is shared read-only; workers never mutate it.
//!
//! Timed-out scenarios are reported as `Unknown` with a `timeout` note. The
//! worker thread itself cannot be preempted, so it is abandoned and replaced;
//! whatever it sends afterwards is discarded.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lp_core::{MasterProblem, Scenario, ScenarioIndexer, SubproblemBuilder};
use lp_solver::{Failure, FailureKind, PortfolioMetrics, SolveResult, SolverAdapter};
use tracing::{debug, error, info, warn};

use crate::error::BatchError;
use crate::sink::ResultSink;
use crate::summary::BatchSummary;

/// Orchestrator settings.
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorConfig {
    /// Worker threads, at least one.
    pub worker_count: usize,
    /// Scenarios per batch; `None` submits everything as one batch.
    pub batch_size: Option<usize>,
    /// Per-scenario wall-clock limit, measured from worker start.
    pub scenario_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            batch_size: None,
            scenario_timeout: None,
        }
    }
}

impl OrchestratorConfig {
    /// Sets the worker count, clamped to at least one.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    /// Sets the batch size, clamped to at least one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size.max(1));
        self
    }

    /// Sets the per-scenario timeout.
    pub fn with_scenario_timeout(mut self, timeout: Duration) -> Self {
        self.scenario_timeout = Some(timeout);
        self
    }

    fn effective_batch_size(&self, total: usize) -> usize {
        self.batch_size.unwrap_or(total).max(1)
    }
}

/// One worker per logical CPU, minus one for the coordinator.
pub fn default_worker_count() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Runs scenario batches on a bounded set of worker threads.
#[derive(Debug)]
pub struct BatchOrchestrator {
    config: OrchestratorConfig,
    adapter: SolverAdapter,
}

impl BatchOrchestrator {
    /// Creates the orchestrator.
    ///
    /// Worker threads are started lazily by each run.
    pub fn new(config: OrchestratorConfig, adapter: SolverAdapter) -> Self {
        info!(
            workers = config.worker_count,
            batch_size = ?config.batch_size,
            timeout = ?config.scenario_timeout,
            solver = adapter.solver_name(),
            "orchestrator ready"
        );
        Self { config, adapter }
    }

    /// Current configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Starts a run and returns the lazy result stream.
    ///
    /// Nothing is dispatched until the stream is polled.
    pub fn run(&self, master: Arc<MasterProblem>, scenarios: Vec<Scenario>) -> BatchRun {
        let batch_size = self.config.effective_batch_size(scenarios.len());
        let (results_tx, results_rx) = mpsc::channel();
        BatchRun {
            master,
            scenarios: scenarios.into(),
            adapter: self.adapter.clone(),
            worker_count: self.config.worker_count.max(1),
            batch_size,
            timeout: self.config.scenario_timeout,
            results_tx,
            results_rx,
            idle: Vec::new(),
            running: HashMap::new(),
            queue: VecDeque::new(),
            next_offset: 0,
            ready: VecDeque::new(),
            batches: 0,
            spawned: 0,
        }
    }

    /// Runs every scenario and writes each result into `sink`.
    ///
    /// The sink is flushed after every batch and once more at the end.
    ///
    /// # Errors
    ///
    /// Only sink failures abort the run.
    pub fn run_into<S>(
        &self,
        master: Arc<MasterProblem>,
        scenarios: Vec<Scenario>,
        sink: &mut S,
    ) -> Result<BatchSummary, BatchError>
    where
        S: ResultSink + ?Sized,
    {
        let start = Instant::now();
        let total = scenarios.len();
        let mut summary = BatchSummary::new();
        let mut run = self.run(master, scenarios);

        while let Some(result) = run.next() {
            summary.record(&result);
            sink.write(&result)?;

            if run.batch_drained() {
                sink.flush()?;
                info!(
                    batch = run.batches_dispatched(),
                    done = summary.scenarios,
                    total,
                    optimal = summary.optimal,
                    failures = summary.failures,
                    "batch complete"
                );
            }
        }
        sink.flush()?;

        summary.batches = run.batches_dispatched();
        summary.wall_time = start.elapsed();
        info!(
            scenarios = summary.scenarios,
            optimal = summary.optimal,
            infeasible = summary.infeasible,
            unknown = summary.unknown,
            wall_secs = summary.wall_time.as_secs_f64(),
            "run complete"
        );
        Ok(summary)
    }
}

/// Longest the coordinator sleeps before checking on its workers.
const LIVENESS_INTERVAL: Duration = Duration::from_millis(250);

/// A worker thread fed one scenario position at a time.
///
/// Dropping the job sender lets the thread exit once its current solve
/// returns.
struct Worker {
    jobs: Sender<usize>,
    handle: JoinHandle<()>,
}

struct Running {
    worker: Worker,
    started: Instant,
}

/// Lazy stream of results for one run, in completion order.
///
/// At most `worker_count` scenarios run at once. A worker stuck past the
/// timeout is abandoned and a fresh one takes its slot, so one hung solve
/// never holds up the rest of the batch.
pub struct BatchRun {
    master: Arc<MasterProblem>,
    scenarios: Arc<[Scenario]>,
    adapter: SolverAdapter,
    worker_count: usize,
    batch_size: usize,
    timeout: Option<Duration>,
    results_tx: Sender<(usize, SolveResult)>,
    results_rx: Receiver<(usize, SolveResult)>,
    idle: Vec<Worker>,
    running: HashMap<usize, Running>,
    queue: VecDeque<usize>,
    next_offset: usize,
    ready: VecDeque<SolveResult>,
    batches: usize,
    spawned: usize,
}

impl BatchRun {
    /// Scenarios submitted to this run.
    pub fn submitted(&self) -> usize {
        self.scenarios.len()
    }

    /// Batches dispatched so far.
    pub fn batches_dispatched(&self) -> usize {
        self.batches
    }

    /// Whether every result of the current batch has been yielded.
    pub fn batch_drained(&self) -> bool {
        self.ready.is_empty() && self.queue.is_empty() && self.running.is_empty()
    }

    fn enqueue_next_batch(&mut self) {
        let start = self.next_offset;
        let end = (start + self.batch_size).min(self.scenarios.len());
        self.queue.extend(start..end);
        self.next_offset = end;
        self.batches += 1;
        debug!(batch = self.batches, scenarios = end - start, "batch dispatched");
    }

    fn spawn_worker(&mut self) -> io::Result<Worker> {
        let (jobs, job_rx) = mpsc::channel::<usize>();
        let results = self.results_tx.clone();
        let master = Arc::clone(&self.master);
        let scenarios = Arc::clone(&self.scenarios);
        let adapter = self.adapter.clone();

        self.spawned += 1;
        let handle = thread::Builder::new()
            .name(format!("lp-worker-{}", self.spawned))
            .spawn(move || {
                for pos in job_rx {
                    let scenario = &scenarios[pos];
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        solve_scenario(&master, scenario, &adapter)
                    }))
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        error!(scenario = %scenario.id(), panic = %message, "worker panicked");
                        SolveResult::failed(scenario.id(), Failure::new(FailureKind::WorkerCrash, message))
                    });
                    // A closed receiver means the run is gone.
                    if results.send((pos, result)).is_err() {
                        break;
                    }
                }
            })?;
        Ok(Worker { jobs, handle })
    }

    /// Hands queued scenarios to idle or new workers up to the worker limit.
    fn fill_workers(&mut self) {
        while self.running.len() < self.worker_count {
            let Some(pos) = self.queue.pop_front() else {
                break;
            };
            let worker = match self.idle.pop() {
                Some(worker) => worker,
                None => match self.spawn_worker() {
                    Ok(worker) => worker,
                    Err(e) => {
                        let id = self.scenarios[pos].id();
                        error!(scenario = %id, error = %e, "could not start worker");
                        self.ready.push_back(SolveResult::failed(
                            id,
                            Failure::new(FailureKind::WorkerCrash, format!("could not start worker: {e}")),
                        ));
                        continue;
                    }
                },
            };
            if worker.jobs.send(pos).is_err() {
                warn!("idle worker gone; replacing it");
                self.queue.push_front(pos);
                continue;
            }
            self.running.insert(
                pos,
                Running {
                    worker,
                    started: Instant::now(),
                },
            );
        }
    }

    fn expire_timed_out(&mut self, timeout: Duration) {
        let now = Instant::now();
        let mut expired: Vec<usize> = self
            .running
            .iter()
            .filter(|(_, r)| now.duration_since(r.started) >= timeout)
            .map(|(pos, _)| *pos)
            .collect();
        expired.sort_unstable();

        for pos in expired {
            // Dropping the worker abandons its thread; whatever it sends later is discarded.
            self.running.remove(&pos);
            let id = self.scenarios[pos].id();
            warn!(scenario = %id, timeout_secs = timeout.as_secs_f64(), "scenario timed out");
            let mut result = SolveResult::failed(
                id,
                Failure::new(
                    FailureKind::Timeout,
                    format!("exceeded {:.3}s", timeout.as_secs_f64()),
                ),
            );
            result.elapsed = timeout;
            self.ready.push_back(result);
        }
    }

    /// Records a crash for every running scenario whose thread has exited.
    fn reap_dead_workers(&mut self) {
        let mut dead: Vec<usize> = self
            .running
            .iter()
            .filter(|(_, r)| r.worker.handle.is_finished())
            .map(|(pos, _)| *pos)
            .collect();
        dead.sort_unstable();

        for pos in dead {
            self.running.remove(&pos);
            let id = self.scenarios[pos].id();
            error!(scenario = %id, "worker vanished without reporting");
            self.ready.push_back(SolveResult::failed(
                id,
                Failure::new(FailureKind::WorkerCrash, "worker exited without a result"),
            ));
        }
    }

    fn wait(&self) -> Result<(usize, SolveResult), RecvTimeoutError> {
        let mut deadline = Instant::now() + LIVENESS_INTERVAL;
        if let Some(timeout) = self.timeout {
            if let Some(earliest) = self.running.values().map(|r| r.started).min() {
                deadline = deadline.min(earliest + timeout);
            }
        }
        self.results_rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
    }
}

impl Iterator for BatchRun {
    type Item = SolveResult;

    fn next(&mut self) -> Option<SolveResult> {
        loop {
            if let Some(result) = self.ready.pop_front() {
                return Some(result);
            }

            if self.queue.is_empty() && self.running.is_empty() {
                if self.next_offset >= self.scenarios.len() {
                    return None;
                }
                self.enqueue_next_batch();
                continue;
            }

            self.fill_workers();
            if !self.ready.is_empty() || self.running.is_empty() {
                continue;
            }

            match self.wait() {
                Ok((pos, result)) => match self.running.remove(&pos) {
                    Some(done) => {
                        self.idle.push(done.worker);
                        return Some(result);
                    }
                    None => debug!(scenario = %result.scenario_id, "discarding late result"),
                },
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(timeout) = self.timeout {
                        self.expire_timed_out(timeout);
                    }
                    self.reap_dead_workers();
                }
                // The run holds a sender, so this only happens if it was dropped.
                Err(RecvTimeoutError::Disconnected) => self.reap_dead_workers(),
            }
        }
    }
}

/// Solves one scenario against the shared master.
///
/// Never panics on bad input: indexing and slicing errors come back as an
/// `Unknown` result with a failure note. Optimal results carry
/// [`PortfolioMetrics`].
pub fn solve_scenario(master: &MasterProblem, scenario: &Scenario, adapter: &SolverAdapter) -> SolveResult {
    let id = scenario.id();
    let sub = ScenarioIndexer::for_master(master)
        .compute(scenario.active_vars())
        .and_then(|set| SubproblemBuilder::new(master).build_for(&set));

    let sub = match sub {
        Ok(sub) => sub,
        Err(e) => {
            warn!(scenario = %id, error = %e, "scenario rejected");
            return SolveResult::failed(id, Failure::from_core_error(&e));
        }
    };

    let result = adapter.solve(id, &sub);
    debug!(
        scenario = %id,
        status = %result.status,
        vars = sub.n_cols(),
        elapsed_ms = result.elapsed.as_secs_f64() * 1e3,
        "scenario solved"
    );

    let metrics = result
        .solution
        .as_deref()
        .map(|x| PortfolioMetrics::compute(master, sub.columns(), x));
    match metrics {
        Some(metrics) => result.with_metrics(metrics),
        None => result,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
