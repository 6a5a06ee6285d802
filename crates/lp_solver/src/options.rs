//! Solver options.

use std::fmt;
use std::str::FromStr;

use crate::error::SolverError;

/// Available solver backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SolverBackend {
    /// Primal/dual simplex from `microlp`.
    #[default]
    Simplex,
}

impl SolverBackend {
    /// Configuration name of the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simplex => "simplex",
        }
    }

    /// Log target of the backend library, used to silence it.
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::Simplex => "microlp",
        }
    }
}

impl FromStr for SolverBackend {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simplex" | "microlp" => Ok(Self::Simplex),
            other => Err(SolverError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed to every solver call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverOptions {
    /// Backend to dispatch to.
    pub backend: SolverBackend,
    /// Whether backend and per-solve logging is enabled.
    ///
    /// Off by default: workers must not flood the shared log.
    pub verbose: bool,
}

impl SolverOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend.
    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets verbosity.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("simplex".parse::<SolverBackend>().unwrap(), SolverBackend::Simplex);
        assert_eq!("MicroLP".parse::<SolverBackend>().unwrap(), SolverBackend::Simplex);
        assert!("glpk".parse::<SolverBackend>().is_err());
    }

    #[test]
    fn test_default_options_are_quiet() {
        let options = SolverOptions::default();
        assert!(!options.verbose);
        assert_eq!(options.backend, SolverBackend::Simplex);
        assert!(SolverOptions::new().with_verbose(true).verbose);
    }
}
