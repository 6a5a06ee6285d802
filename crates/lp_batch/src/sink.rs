//! Result sinks.
//!
//! [`TsvResultSink`] writes the two tab-separated result files:
//! `result_status.txt` (one row per scenario, configurable columns) and
//! `result_weights.txt` (scenario id, followed by the weights when the
//! solve was optimal). [`MemorySink`] collects results for tests and embedding.

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use csv::{Writer, WriterBuilder};
use lp_solver::SolveResult;

use crate::error::SinkError;
use crate::probe::ProbeOutcome;

/// Status file name.
pub const STATUS_FILE: &str = "result_status.txt";
/// Weights file name.
pub const WEIGHTS_FILE: &str = "result_weights.txt";
/// Probe file name.
pub const PROBE_FILE: &str = "result_infeasible_test.txt";

/// Consumer of per-scenario results.
pub trait ResultSink {
    /// Records one result.
    fn write(&mut self, result: &SolveResult) -> Result<(), SinkError>;

    /// Pushes buffered output to its destination.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Column of the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusColumn {
    /// Scenario id.
    ProbNum,
    /// Normalised status.
    Status,
    /// Primal objective.
    PrimalObjective,
    /// Dual objective.
    DualObjective,
    /// Duality gap.
    Gap,
    /// Relative duality gap.
    RelativeGap,
    /// Primal infeasibility.
    PrimalInfeasibility,
    /// Dual infeasibility.
    DualInfeasibility,
    /// Primal slack.
    PrimalSlack,
    /// Dual slack.
    DualSlack,
    /// Primal residual.
    ResPrimal,
    /// Dual residual.
    ResDual,
    /// Solver seconds.
    Elapsed,
    /// Portfolio expected loss.
    ExpectedLoss,
    /// Portfolio return.
    PortfolioReturn,
    /// Failure note.
    Note,
}

impl StatusColumn {
    /// Every column, in default file order.
    pub const ALL: [StatusColumn; 16] = [
        Self::ProbNum,
        Self::Status,
        Self::PrimalObjective,
        Self::DualObjective,
        Self::Gap,
        Self::RelativeGap,
        Self::PrimalInfeasibility,
        Self::DualInfeasibility,
        Self::PrimalSlack,
        Self::DualSlack,
        Self::ResPrimal,
        Self::ResDual,
        Self::Elapsed,
        Self::ExpectedLoss,
        Self::PortfolioReturn,
        Self::Note,
    ];

    /// Header name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProbNum => "prob_num",
            Self::Status => "status",
            Self::PrimalObjective => "primal_objective",
            Self::DualObjective => "dual_objective",
            Self::Gap => "gap",
            Self::RelativeGap => "relative_gap",
            Self::PrimalInfeasibility => "primal_infeasibility",
            Self::DualInfeasibility => "dual_infeasibility",
            Self::PrimalSlack => "primal_slack",
            Self::DualSlack => "dual_slack",
            Self::ResPrimal => "res_primal",
            Self::ResDual => "res_dual",
            Self::Elapsed => "elapsed",
            Self::ExpectedLoss => "expected_loss",
            Self::PortfolioReturn => "portfolio_return",
            Self::Note => "note",
        }
    }

    /// Cell value for `result`; empty when the value is absent.
    pub fn cell(&self, result: &SolveResult) -> String {
        let d = &result.diagnostics;
        let m = result.metrics.as_ref();
        match self {
            Self::ProbNum => result.scenario_id.to_string(),
            Self::Status => result.status.as_str().to_string(),
            Self::PrimalObjective => opt(result.objective),
            Self::DualObjective => opt(d.dual_objective),
            Self::Gap => opt(d.gap),
            Self::RelativeGap => opt(d.relative_gap),
            Self::PrimalInfeasibility => opt(d.primal_infeasibility),
            Self::DualInfeasibility => opt(d.dual_infeasibility),
            Self::PrimalSlack => opt(d.primal_slack),
            Self::DualSlack => opt(d.dual_slack),
            Self::ResPrimal => opt(d.res_primal),
            Self::ResDual => opt(d.res_dual),
            Self::Elapsed => result.elapsed_secs().to_string(),
            Self::ExpectedLoss => opt(m.map(|m| m.expected_loss)),
            Self::PortfolioReturn => opt(m.map(|m| m.portfolio_return)),
            Self::Note => result
                .failure
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for StatusColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatusColumn {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == key)
            .ok_or_else(|| SinkError::UnknownColumn(s.to_string()))
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn tsv_writer<W: Write>(inner: W) -> Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(inner)
}

/// Tab-separated status and weights writer.
pub struct TsvResultSink<W: Write> {
    status: Writer<W>,
    weights: Writer<W>,
    columns: Vec<StatusColumn>,
}

impl TsvResultSink<File> {
    /// Creates `output_dir` if needed and truncates both result files.
    pub fn create(output_dir: &Path, columns: Vec<StatusColumn>) -> Result<Self, SinkError> {
        fs::create_dir_all(output_dir)?;
        let status = File::create(output_dir.join(STATUS_FILE))?;
        let weights = File::create(output_dir.join(WEIGHTS_FILE))?;
        Self::new(status, weights, columns)
    }
}

impl<W: Write> TsvResultSink<W> {
    /// Wraps two writers and emits the status header.
    ///
    /// An empty column list falls back to [`StatusColumn::ALL`].
    pub fn new(status: W, weights: W, columns: Vec<StatusColumn>) -> Result<Self, SinkError> {
        let columns = if columns.is_empty() {
            StatusColumn::ALL.to_vec()
        } else {
            columns
        };
        let mut status = tsv_writer(status);
        status.write_record(columns.iter().map(StatusColumn::name))?;
        Ok(Self {
            status,
            weights: tsv_writer(weights),
            columns,
        })
    }

    /// Status columns in file order.
    pub fn columns(&self) -> &[StatusColumn] {
        &self.columns
    }

    /// Flushes and returns the inner writers.
    pub fn into_inner(self) -> Result<(W, W), SinkError> {
        let status = self
            .status
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))?;
        let weights = self
            .weights
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))?;
        Ok((status, weights))
    }
}

impl<W: Write> ResultSink for TsvResultSink<W> {
    fn write(&mut self, result: &SolveResult) -> Result<(), SinkError> {
        self.status
            .write_record(self.columns.iter().map(|c| c.cell(result)))?;

        let weights = result.solution.as_deref().unwrap_or_default();
        let row = std::iter::once(result.scenario_id.to_string()).chain(weights.iter().map(f64::to_string));
        self.weights.write_record(row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.status.flush()?;
        self.weights.flush()?;
        Ok(())
    }
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Vec<SolveResult>,
    flushes: usize,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Results in arrival order.
    pub fn results(&self) -> &[SolveResult] {
        &self.results
    }

    /// Number of recorded results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of flushes seen.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Consumes the sink, returning results sorted by scenario id.
    pub fn into_sorted(mut self) -> Vec<SolveResult> {
        self.results.sort_by_key(|r| r.scenario_id);
        self.results
    }
}

impl ResultSink for MemorySink {
    fn write(&mut self, result: &SolveResult) -> Result<(), SinkError> {
        self.results.push(result.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.flushes += 1;
        Ok(())
    }
}

/// Writer for probe outcomes: `prob_num`, `max_return`, `cause`.
///
/// A missing maximum return is written as `-1`.
pub struct ProbeTsvWriter<W: Write> {
    writer: Writer<W>,
}

impl ProbeTsvWriter<File> {
    /// Creates (or truncates) the probe file at `path`.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Self::new(File::create(path)?)
    }
}

impl<W: Write> ProbeTsvWriter<W> {
    /// Wraps a writer and emits the header.
    pub fn new(inner: W) -> Result<Self, SinkError> {
        let mut writer = tsv_writer(inner);
        writer.write_record(["prob_num", "max_return", "cause"])?;
        Ok(Self { writer })
    }

    /// Writes one outcome.
    pub fn write(&mut self, outcome: &ProbeOutcome) -> Result<(), SinkError> {
        let max_return = outcome
            .max_return
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-1".to_string());
        self.writer.write_record([
            outcome.scenario_id.to_string(),
            max_return,
            outcome.cause.as_str().to_string(),
        ])?;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}
