//! Check command implementation
//!
//! Validates the effective configuration and the data directory without
//! solving anything.

use std::path::Path;

use lp_batch::StatusColumn;
use lp_core::{ConstraintTemplate, MasterProblem};
use tracing::info;

use super::{banner, row};
use crate::config::BatchConfig;
use crate::Result;

/// Run the check command
pub fn run(config: &BatchConfig, config_path: &Path) -> Result<()> {
    banner("lpbatch configuration check");
    let source = if config_path.is_file() {
        config_path.display().to_string()
    } else {
        "defaults (no config file)".to_string()
    };
    row("Config", source);
    row("Data directory", config.data_dir.display());
    row("Output directory", config.output_dir.display());

    let loader = config.loader();
    loader.check_layout()?;
    info!("Data layout OK");

    let inputs = loader.load_inputs()?;
    let scenarios = loader.load_scenarios()?;
    MasterProblem::build(&inputs, ConstraintTemplate::MinReturn)?;

    let orchestrator = config.orchestrator_config();
    row("Assets", inputs.n_assets());
    row("Scenarios", scenarios.len());
    row("Required return", inputs.required_return);
    row("Workers", orchestrator.worker_count);
    row(
        "Batch size",
        orchestrator
            .batch_size
            .map_or_else(|| "all".to_string(), |n| n.to_string()),
    );
    row(
        "Scenario timeout",
        orchestrator
            .scenario_timeout
            .map_or_else(|| "none".to_string(), |t| format!("{:.3}s", t.as_secs_f64())),
    );
    row("Solver backend", config.solver.backend);
    let columns = config.status_columns()?;
    let columns = if columns.is_empty() { StatusColumn::ALL.to_vec() } else { columns };
    row(
        "Status columns",
        columns.iter().map(StatusColumn::name).collect::<Vec<_>>().join(","),
    );
    println!("========================================");
    println!("All checks passed");
    Ok(())
}
