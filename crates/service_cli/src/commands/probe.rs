//! Probe command implementation
//!
//! Re-solves the scenarios a previous run did not solve to optimality with
//! the return-maximising relaxation and records why each one failed.

use std::path::Path;

use adapter_loader::read_unsolved_ids;
use lp_batch::{InfeasibilityCause, InfeasibilityProbe, ProbeTsvWriter};
use lp_solver::SolverAdapter;
use tracing::{info, warn};

use super::{banner, row};
use crate::config::BatchConfig;
use crate::{CliError, Result};

/// Run the probe command
pub fn run(config: &BatchConfig, status_log: &Path, output: &Path) -> Result<()> {
    if !status_log.is_file() {
        return Err(CliError::FileNotFound(status_log.display().to_string()));
    }

    let ids = read_unsolved_ids(status_log)?;
    let mut writer = ProbeTsvWriter::create(output)?;
    if ids.is_empty() {
        info!("Every scenario solved; nothing to probe");
        writer.into_inner()?;
        return Ok(());
    }

    let data = config.loader().load()?;
    let adapter = SolverAdapter::from_options(config.solver_options());
    let probe = InfeasibilityProbe::from_inputs(&data.inputs, adapter)?
        .with_worker_count(config.orchestrator_config().worker_count)?;

    let (mut return_infeasible, mut structural, mut attainable, mut skipped) = (0, 0, 0, 0);
    for outcome in probe.classify_ids(&data.scenarios, &ids) {
        match outcome {
            Ok(outcome) => {
                match outcome.cause {
                    InfeasibilityCause::ReturnInfeasible => return_infeasible += 1,
                    InfeasibilityCause::StructurallyInfeasible => structural += 1,
                    InfeasibilityCause::ReturnAttainable => attainable += 1,
                }
                writer.write(&outcome)?;
            }
            Err(e) => {
                warn!(error = %e, "Skipping scenario");
                skipped += 1;
            }
        }
    }
    writer.into_inner()?;
    info!(output = %output.display(), probed = ids.len(), "Probe complete");

    banner("Infeasibility Probe");
    row("Unsolved scenarios", ids.len());
    row("Required return", probe.required_return());
    row("Return infeasible", return_infeasible);
    row("Structurally infeas.", structural);
    row("Return attainable", attainable);
    row("Skipped", skipped);
    println!("========================================");
    Ok(())
}
