//! CLI error types.

use adapter_loader::LoaderError;
use lp_batch::{BatchError, ProbeError, SinkError};
use lp_core::CoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by `lpbatch` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input data could not be read.
    #[error("Data error: {0}")]
    Load(#[from] LoaderError),

    /// Master problem could not be built.
    #[error("Model error: {0}")]
    Core(#[from] CoreError),

    /// Batch run aborted.
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Result file could not be written.
    #[error("Output error: {0}")]
    Sink(#[from] SinkError),

    /// Probe could not start.
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
