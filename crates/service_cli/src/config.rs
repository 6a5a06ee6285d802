//! Batch configuration.
//!
//! Loaded from a TOML file (missing file means defaults), then overridden by
//! `LPBATCH_*` environment variables, then by command-line flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use adapter_loader::DataLoader;
use lp_batch::sink::{PROBE_FILE, STATUS_FILE};
use lp_batch::{OrchestratorConfig, StatusColumn};
use lp_core::{DEFAULT_ASSET_COUNT, DEFAULT_REQUIRED_RETURN};
use lp_solver::{SolverBackend, SolverOptions};
use serde::Deserialize;
use thiserror::Error;

/// Default configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "lpbatch.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config file {path}: {message}")]
    Io {
        /// Config file path.
        path: String,
        /// Underlying error.
        message: String,
    },

    /// Config file is not valid TOML for this schema.
    #[error("Failed to parse config file: {0}")]
    Parse(String),

    /// Unknown log level.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Environment variable holds an unusable value.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue {
        /// Variable or key name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// One or more settings are out of range.
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Log levels accepted in the config file and environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Directive for `EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn deserialize_backend<'de, D>(deserializer: D) -> Result<SolverBackend, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    SolverBackend::from_str(&s).map_err(serde::de::Error::custom)
}

/// `[solver]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SolverSection {
    /// Backend name.
    #[serde(deserialize_with = "deserialize_backend")]
    pub backend: SolverBackend,
    /// Let the backend log.
    pub verbose: bool,
}

/// Full batch configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Input directory.
    pub data_dir: PathBuf,
    /// Directory for result files.
    pub output_dir: PathBuf,
    /// Expected asset count.
    pub asset_count: usize,
    /// Minimum portfolio return of the main solve.
    pub min_return: f64,
    /// Worker threads; defaults to CPUs minus one.
    pub worker_count: Option<usize>,
    /// Scenarios per batch; defaults to all.
    pub batch_size: Option<usize>,
    /// Per-scenario timeout in seconds.
    pub scenario_timeout_secs: Option<f64>,
    /// Log level when `RUST_LOG` is unset.
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Status file columns; empty means all.
    pub status_columns: Vec<String>,
    /// Solver settings.
    pub solver: SolverSection,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
            asset_count: DEFAULT_ASSET_COUNT,
            min_return: DEFAULT_REQUIRED_RETURN,
            worker_count: None,
            batch_size: None,
            scenario_timeout_secs: None,
            log_level: LogLevel::default(),
            status_columns: Vec::new(),
            solver: SolverSection::default(),
        }
    }
}

/// Command-line overrides; `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--data-dir`.
    pub data_dir: Option<PathBuf>,
    /// `--output-dir`.
    pub output_dir: Option<PathBuf>,
    /// `--workers`.
    pub worker_count: Option<usize>,
    /// `--batch-size`.
    pub batch_size: Option<usize>,
    /// `--timeout-secs`.
    pub timeout_secs: Option<f64>,
    /// `--verbose`.
    pub verbose: bool,
}

impl BatchConfig {
    /// Parses a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Loads `path`, or returns defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies `LPBATCH_*` environment variables.
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("LPBATCH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("LPBATCH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup("LPBATCH_WORKERS") {
            self.worker_count = Some(parse_env("LPBATCH_WORKERS", &v)?);
        }
        if let Some(v) = lookup("LPBATCH_BATCH_SIZE") {
            self.batch_size = Some(parse_env("LPBATCH_BATCH_SIZE", &v)?);
        }
        if let Some(v) = lookup("LPBATCH_TIMEOUT_SECS") {
            self.scenario_timeout_secs = Some(parse_env("LPBATCH_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("LPBATCH_LOG_LEVEL") {
            self.log_level = LogLevel::from_str(&v)?;
        }
        Ok(self)
    }

    /// Merges command-line flags (highest priority).
    pub fn merge_with_cli(&mut self, cli: &CliOverrides) {
        if let Some(dir) = &cli.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(n) = cli.worker_count {
            self.worker_count = Some(n);
        }
        if let Some(n) = cli.batch_size {
            self.batch_size = Some(n);
        }
        if let Some(t) = cli.timeout_secs {
            self.scenario_timeout_secs = Some(t);
        }
        if cli.verbose {
            self.solver.verbose = true;
            self.log_level = LogLevel::Debug;
        }
    }

    /// Checks every setting and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.data_dir.as_os_str().is_empty() {
            errors.push("data_dir cannot be empty".to_string());
        }
        if self.output_dir.as_os_str().is_empty() {
            errors.push("output_dir cannot be empty".to_string());
        }
        if self.asset_count == 0 {
            errors.push("asset_count must be greater than 0".to_string());
        }
        if !self.min_return.is_finite() {
            errors.push(format!("min_return must be finite, got {}", self.min_return));
        }
        if self.worker_count == Some(0) {
            errors.push("worker_count must be greater than 0".to_string());
        }
        if self.batch_size == Some(0) {
            errors.push("batch_size must be greater than 0".to_string());
        }
        if let Some(t) = self.scenario_timeout_secs {
            if !(t.is_finite() && t > 0.0) {
                errors.push(format!("scenario_timeout_secs must be positive, got {t}"));
            } else if Duration::try_from_secs_f64(t).is_err() {
                errors.push(format!("scenario_timeout_secs is too large, got {t}"));
            }
        }
        for name in &self.status_columns {
            if StatusColumn::from_str(name).is_err() {
                errors.push(format!("Unknown status column '{name}'"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Orchestrator settings.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::default();
        if let Some(n) = self.worker_count {
            config = config.with_worker_count(n);
        }
        if let Some(n) = self.batch_size {
            config = config.with_batch_size(n);
        }
        if let Some(timeout) = self
            .scenario_timeout_secs
            .and_then(|t| Duration::try_from_secs_f64(t).ok())
        {
            config = config.with_scenario_timeout(timeout);
        }
        config
    }

    /// Solver options.
    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions::new()
            .with_backend(self.solver.backend)
            .with_verbose(self.solver.verbose)
    }

    /// Status columns, defaulting to all of them.
    pub fn status_columns(&self) -> Result<Vec<StatusColumn>, ConfigError> {
        self.status_columns
            .iter()
            .map(|name| {
                StatusColumn::from_str(name).map_err(|_| ConfigError::InvalidValue {
                    key: "status_columns".to_string(),
                    value: name.clone(),
                })
            })
            .collect()
    }

    /// Loader for the configured data directory.
    pub fn loader(&self) -> DataLoader {
        DataLoader::new(&self.data_dir)
            .with_asset_count(Some(self.asset_count))
            .with_required_return(self.min_return)
    }

    /// Status file written by `solve`.
    pub fn status_log_path(&self) -> PathBuf {
        self.output_dir.join(STATUS_FILE)
    }

    /// Probe file written by `probe`.
    pub fn probe_output_path(&self) -> PathBuf {
        self.output_dir.join(PROBE_FILE)
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
