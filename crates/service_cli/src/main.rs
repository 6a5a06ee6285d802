//! lpbatch - batch solver for scenario portfolio LPs
//!
//! Operational entry point: loads the data directory, solves every scenario
//! sub-problem on a worker pool and writes the result files.
//!
//! # Commands
//!
//! - `lpbatch solve` - Solve every scenario and write the status/weights files
//! - `lpbatch probe` - Classify the scenarios a previous run did not solve
//! - `lpbatch check` - Validate configuration and the data layout
//!
//! # Architecture
//!
//! As part of the **S**ervice layer in the A-I-P-S architecture, this crate
//! wires the loader, solver and batch crates behind a command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

use config::{BatchConfig, CliOverrides, DEFAULT_CONFIG_FILE};

/// Scenario portfolio LP batch solver
#[derive(Parser)]
#[command(name = "lpbatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output, including backend solver logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve every scenario sub-problem
    Solve {
        /// Input data directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Directory for the result files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Scenarios per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Per-scenario timeout in seconds
        #[arg(short, long)]
        timeout_secs: Option<f64>,

        /// Solve only the first N scenarios
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Classify scenarios a previous run left unsolved
    Probe {
        /// Input data directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Status file of the previous run
        #[arg(short, long)]
        status_log: Option<PathBuf>,

        /// Probe result file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check configuration and data directory layout
    Check {
        /// Input data directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
}

impl Commands {
    fn overrides(&self, verbose: bool) -> CliOverrides {
        let mut overrides = CliOverrides {
            verbose,
            ..Default::default()
        };
        match self {
            Commands::Solve {
                data_dir,
                output_dir,
                workers,
                batch_size,
                timeout_secs,
                ..
            } => {
                overrides.data_dir = data_dir.clone();
                overrides.output_dir = output_dir.clone();
                overrides.worker_count = *workers;
                overrides.batch_size = *batch_size;
                overrides.timeout_secs = *timeout_secs;
            }
            Commands::Probe { data_dir, .. } | Commands::Check { data_dir } => {
                overrides.data_dir = data_dir.clone();
            }
        }
        overrides
    }
}

/// Installs the subscriber; `RUST_LOG` wins over the configured level.
fn init_tracing(config: &BatchConfig) {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter_str()));
    if !config.solver.verbose {
        let silenced = format!("{}=off", config.solver.backend.log_target());
        if let Ok(directive) = silenced.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = BatchConfig::load_or_default(&cli.config)?.with_env_override()?;
    config.merge_with_cli(&cli.command.overrides(cli.verbose));

    init_tracing(&config);
    if cli.verbose {
        info!("Verbose mode enabled");
    }
    debug!(config = ?config, "effective configuration");
    config.validate()?;

    match cli.command {
        Commands::Solve { limit, .. } => commands::solve::run(&config, limit),
        Commands::Probe {
            status_log, output, ..
        } => {
            let status_log = status_log.unwrap_or_else(|| config.status_log_path());
            let output = output.unwrap_or_else(|| config.probe_output_path());
            commands::probe::run(&config, &status_log, &output)
        }
        Commands::Check { .. } => commands::check::run(&config, &cli.config),
    }
}

fn main() -> anyhow::Result<()> {
    run(Cli::parse())?;
    Ok(())
}
