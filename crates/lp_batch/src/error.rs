//! Batch error types.

use lp_core::{ConstraintTemplate, CoreError, ScenarioId};
use thiserror::Error;

/// Errors that abort a batch.
///
/// Per-scenario problems never show up here; they become `Unknown` results.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Result sink failed.
    #[error("Result sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Errors raised by result sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// IO error on the output files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Unknown status column name.
    #[error("Unknown status column: {0}")]
    UnknownColumn(String),
}

/// Errors raised by the infeasibility probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Requested id is not in the scenario list.
    #[error("Unknown scenario: {0}")]
    UnknownScenario(ScenarioId),

    /// Probe master built with the wrong template.
    #[error("Probe master must use the ReturnProbe template, got {0:?}")]
    WrongTemplate(ConstraintTemplate),

    /// Worker pool could not be created.
    #[error("Failed to build probe pool: {0}")]
    PoolBuild(String),

    /// Master construction or scenario slicing failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}
