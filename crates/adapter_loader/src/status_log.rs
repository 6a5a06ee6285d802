//! Reader for a previously written status file.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use lp_core::ScenarioId;
use tracing::info;

use crate::error::LoaderError;

/// One row of the status file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLogEntry {
    /// Scenario id (`prob_num`).
    pub scenario_id: ScenarioId,
    /// Status as written.
    pub status: String,
}

impl StatusLogEntry {
    /// Whether the scenario solved to optimality.
    pub fn is_optimal(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("optimal")
    }
}

/// Reads every `(prob_num, status)` pair from a status file.
///
/// The header must name both columns; any other columns are ignored.
pub fn read_status_log(path: &Path) -> Result<Vec<StatusLogEntry>, LoaderError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => LoaderError::MissingFile {
            path: path.to_path_buf(),
        },
        _ => LoaderError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let csv_err = |source: csv::Error| LoaderError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoaderError::malformed(path, 1, format!("missing '{name}' column")))
    };
    let id_col = column("prob_num")?;
    let status_col = column("status")?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());
        let raw_id = record.get(id_col).unwrap_or_default();
        let id = raw_id
            .parse::<usize>()
            .map_err(|_| LoaderError::malformed(path, line, format!("invalid prob_num '{raw_id}'")))?;
        entries.push(StatusLogEntry {
            scenario_id: ScenarioId::new(id),
            status: record.get(status_col).unwrap_or_default().to_string(),
        });
    }
    Ok(entries)
}

/// Ids whose recorded status is anything other than `optimal`, in file order.
pub fn read_unsolved_ids(path: &Path) -> Result<Vec<ScenarioId>, LoaderError> {
    let entries = read_status_log(path)?;
    let total = entries.len();
    let unsolved: Vec<ScenarioId> = entries
        .into_iter()
        .filter(|e| !e.is_optimal())
        .map(|e| e.scenario_id)
        .collect();
    info!(
        file = %path.display(),
        total,
        unsolved = unsolved.len(),
        "status log read"
    );
    Ok(unsolved)
}
