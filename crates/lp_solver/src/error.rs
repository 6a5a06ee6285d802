//! Solver error types.

use thiserror::Error;

/// Errors raised by a solver backend.
///
/// The adapter never propagates these; they become `Unknown` results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// The backend failed internally.
    #[error("Solver backend error: {0}")]
    Backend(String),

    /// The backend returned output that cannot be interpreted.
    #[error("Invalid solver output: {0}")]
    InvalidOutput(String),

    /// Unknown backend name in configuration.
    #[error("Unknown solver backend: {0}. Supported: simplex")]
    UnknownBackend(String),
}
