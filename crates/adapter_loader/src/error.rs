//! Loader error types.

use std::path::PathBuf;

use lp_core::CoreError;
use thiserror::Error;

/// Errors raised while reading input files.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Data directory or a required file does not exist.
    #[error(
        "{} not found; expected layout:\n\
         data/\n| - Ldata.txt\n| - matrix_cp_mean.txt\n| - matrix_cp_return.txt\n| - point_2x0.txt\n| - vars.txt",
        .path.display()
    )]
    MissingFile {
        /// Missing path.
        path: PathBuf,
    },

    /// IO failure on an existing file.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV decoding failure.
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// A line could not be interpreted.
    #[error("Malformed {} at line {line}: {reason}", .path.display())]
    Malformed {
        /// File being read.
        path: PathBuf,
        /// One-based line number.
        line: u64,
        /// What went wrong.
        reason: String,
    },

    /// Vector lengths disagree with each other or the configured asset count.
    #[error("Data shape doesn't match: {0}")]
    ShapeMismatch(String),

    /// Loaded values rejected by the core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl LoaderError {
    /// Creates a malformed-line error.
    pub fn malformed(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Whether the error is a configuration problem rather than an IO fault.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingFile { .. } | Self::ShapeMismatch(_) | Self::Malformed { .. } | Self::Core(_)
        )
    }
}
