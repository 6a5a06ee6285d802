//! Core error types.
//!
//! Configuration errors are fatal for a whole batch; the scenario-level
//! variants are contained by the orchestrator and recorded per scenario.

use thiserror::Error;

/// Errors raised while building the master problem or slicing sub-problems.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Missing or malformed master inputs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Scenario with no active variables.
    #[error("Degenerate scenario: no active variables")]
    DegenerateScenario,

    /// Scenario that lists the same asset more than once.
    #[error("Invalid scenario: asset index {index} appears more than once")]
    InvalidScenario {
        /// The repeated asset index.
        index: usize,
    },

    /// Row or column index outside the master matrix.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl CoreError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Whether the error invalidates the whole batch rather than one scenario.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
