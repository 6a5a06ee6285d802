//! Solve command implementation
//!
//! Loads the data directory, builds the master problem and streams every
//! scenario result into the status and weights files.

use std::sync::Arc;

use lp_batch::{BatchOrchestrator, BatchSummary, TsvResultSink};
use lp_core::{ConstraintTemplate, MasterProblem};
use lp_solver::SolverAdapter;
use tracing::info;

use super::{banner, row};
use crate::config::BatchConfig;
use crate::{CliError, Result};

/// Run the solve command
pub fn run(config: &BatchConfig, limit: Option<usize>) -> Result<()> {
    if limit == Some(0) {
        return Err(CliError::InvalidArgument("--limit must be greater than 0".to_string()));
    }

    info!(data_dir = %config.data_dir.display(), "Loading data...");
    let mut data = config.loader().load()?;
    if let Some(limit) = limit {
        data.scenarios.truncate(limit);
    }

    let master = Arc::new(MasterProblem::build(&data.inputs, ConstraintTemplate::MinReturn)?);
    let adapter = SolverAdapter::from_options(config.solver_options());
    let orchestrator = BatchOrchestrator::new(config.orchestrator_config(), adapter);

    let mut sink = TsvResultSink::create(&config.output_dir, config.status_columns()?)?;
    info!(
        scenarios = data.scenarios.len(),
        workers = orchestrator.config().worker_count,
        output_dir = %config.output_dir.display(),
        "Solving..."
    );
    let summary = orchestrator.run_into(master, data.scenarios, &mut sink)?;
    sink.into_inner()?;

    info!(
        scenarios = summary.scenarios,
        optimal = summary.optimal,
        wall_secs = summary.wall_time.as_secs_f64(),
        "Solve complete"
    );
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    banner("Batch Summary");
    row("Scenarios", summary.scenarios);
    row("Optimal", summary.optimal);
    row("Infeasible", summary.infeasible);
    row("Unbounded", summary.unbounded);
    row("Unknown", summary.unknown);
    row("Failures", summary.failures);
    row("  timed out", summary.timeouts);
    row("  worker crashes", summary.crashes);
    row("Batches", summary.batches);
    row("Success rate", format!("{:.2}%", summary.success_rate()));
    row(
        "Mean solve time",
        format!("{:.4}s", summary.mean_solve_time().as_secs_f64()),
    );
    row("Wall time", format!("{:.2}s", summary.wall_time.as_secs_f64()));
    println!("========================================");
}
