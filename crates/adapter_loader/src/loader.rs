//! Data directory loader.
//!
//! Every file is tab separated without a header the reader would know
//! about; headers and summary rows are dropped per file below. Values are
//! read once and returned by value, so nothing here needs to be shared
//! between workers.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use lp_core::{MasterInputs, Scenario, DEFAULT_ASSET_COUNT, DEFAULT_REQUIRED_RETURN};
use tracing::{debug, info, warn};

use crate::error::LoaderError;

/// Upper bounds, one `x<digits>\t<value>` row per asset.
pub const POINT_2X0_FILE: &str = "point_2x0.txt";
/// Asset returns on the second line.
pub const MATRIX_CP_RETURN_FILE: &str = "matrix_cp_return.txt";
/// Simulated losses, one row per simulation after the header.
pub const MATRIX_CP_MEAN_FILE: &str = "matrix_cp_mean.txt";
/// Cached column sums of the loss matrix.
pub const LDATA_FILE: &str = "Ldata.txt";
/// Active asset indices, one scenario per line.
pub const VARS_FILE: &str = "vars.txt";

/// Files that must exist before anything is loaded.
pub const REQUIRED_FILES: [&str; 4] = [POINT_2X0_FILE, MATRIX_CP_RETURN_FILE, MATRIX_CP_MEAN_FILE, VARS_FILE];

/// Master inputs and scenarios read from one data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedData {
    /// Vectors the master problem is built from.
    pub inputs: MasterInputs,
    /// Scenarios in file order; the id is the line index.
    pub scenarios: Vec<Scenario>,
}

/// Reader for the tab-separated data directory.
#[derive(Debug, Clone)]
pub struct DataLoader {
    data_dir: PathBuf,
    asset_count: Option<usize>,
    required_return: f64,
}

impl DataLoader {
    /// Loader for `data_dir`, expecting the production asset count.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            asset_count: Some(DEFAULT_ASSET_COUNT),
            required_return: DEFAULT_REQUIRED_RETURN,
        }
    }

    /// Sets the expected asset count; `None` accepts whatever the files hold.
    pub fn with_asset_count(mut self, asset_count: Option<usize>) -> Self {
        self.asset_count = asset_count;
        self
    }

    /// Sets the minimum portfolio return.
    pub fn with_required_return(mut self, required_return: f64) -> Self {
        self.required_return = required_return;
        self
    }

    /// Data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Checks that the directory and every required file exist.
    pub fn check_layout(&self) -> Result<(), LoaderError> {
        if !self.data_dir.is_dir() {
            return Err(LoaderError::MissingFile {
                path: self.data_dir.clone(),
            });
        }
        for name in REQUIRED_FILES {
            let path = self.path(name);
            if !path.is_file() {
                return Err(LoaderError::MissingFile { path });
            }
        }
        debug!(dir = %self.data_dir.display(), "data layout ok");
        Ok(())
    }

    /// Loads master inputs and scenarios.
    pub fn load(&self) -> Result<LoadedData, LoaderError> {
        self.check_layout()?;
        let inputs = self.load_inputs()?;
        let scenarios = self.load_scenarios()?;
        info!(
            assets = inputs.n_assets(),
            scenarios = scenarios.len(),
            required_return = inputs.required_return,
            "data loaded"
        );
        Ok(LoadedData { inputs, scenarios })
    }

    /// Loads and validates the master vectors.
    ///
    /// # Errors
    ///
    /// [`LoaderError::ShapeMismatch`] unless losses, returns and upper
    /// bounds all have the configured asset count.
    pub fn load_inputs(&self) -> Result<MasterInputs, LoaderError> {
        let expected_loss = self.expected_loss()?;
        let asset_returns = self.asset_returns()?;
        let upper_bounds = self.upper_bounds()?;

        let n = self.asset_count.unwrap_or(expected_loss.len());
        if expected_loss.len() != n || asset_returns.len() != n || upper_bounds.len() != n {
            return Err(LoaderError::ShapeMismatch(format!(
                "expected {n} assets, got L={}, R={}, U={}",
                expected_loss.len(),
                asset_returns.len(),
                upper_bounds.len()
            )));
        }

        let inputs = MasterInputs::new(expected_loss, asset_returns, upper_bounds, self.required_return);
        inputs.validate(self.asset_count)?;
        Ok(inputs)
    }

    /// Expected loss per asset.
    ///
    /// Read from the `Ldata.txt` cache when present; otherwise derived as
    /// the column sums of the loss matrix and written back to the cache.
    pub fn expected_loss(&self) -> Result<Vec<f64>, LoaderError> {
        let cache = self.path(LDATA_FILE);
        if cache.is_file() {
            let rows = read_rows(&cache)?;
            let first = rows
                .first()
                .ok_or_else(|| LoaderError::malformed(&cache, 1, "empty cache"))?;
            let values = parse_floats(&cache, first)?;
            info!(file = LDATA_FILE, assets = values.len(), "loaded");
            return Ok(values);
        }

        let sums = self.loss_column_sums()?;
        if let Err(e) = write_row(&cache, &sums) {
            warn!(file = %cache.display(), error = %e, "could not write loss cache");
        }
        Ok(sums)
    }

    /// Column sums of `matrix_cp_mean.txt`, header excluded.
    pub fn loss_column_sums(&self) -> Result<Vec<f64>, LoaderError> {
        let path = self.path(MATRIX_CP_MEAN_FILE);
        let rows = read_rows(&path)?;

        let mut sums: Vec<f64> = Vec::new();
        for record in rows.iter().skip(1) {
            let values = parse_floats(&path, record)?;
            if sums.is_empty() {
                sums = vec![0.0; values.len()];
            }
            if values.len() != sums.len() {
                return Err(LoaderError::malformed(
                    &path,
                    line_of(record),
                    format!("expected {} values, found {}", sums.len(), values.len()),
                ));
            }
            for (s, v) in sums.iter_mut().zip(values) {
                *s += v;
            }
        }
        info!(file = MATRIX_CP_MEAN_FILE, simulations = rows.len().saturating_sub(1), "loaded");
        Ok(sums)
    }

    /// Asset returns from the second line of `matrix_cp_return.txt`.
    pub fn asset_returns(&self) -> Result<Vec<f64>, LoaderError> {
        let path = self.path(MATRIX_CP_RETURN_FILE);
        let rows = read_rows(&path)?;
        let record = rows
            .get(1)
            .ok_or_else(|| LoaderError::malformed(&path, 2, "missing return row"))?;
        let values = parse_floats(&path, record)?;
        info!(file = MATRIX_CP_RETURN_FILE, assets = values.len(), "loaded");
        Ok(values)
    }

    /// Upper bounds from the `x<digits>` rows of `point_2x0.txt`.
    pub fn upper_bounds(&self) -> Result<Vec<f64>, LoaderError> {
        let path = self.path(POINT_2X0_FILE);
        let mut values = Vec::new();
        for record in read_rows(&path)? {
            let name = record.get(0).unwrap_or_default();
            if !is_asset_name(name) {
                continue;
            }
            let raw = record.get(1).unwrap_or_default();
            let value = raw.parse::<f64>().map_err(|_| {
                LoaderError::malformed(&path, line_of(&record), format!("invalid bound '{raw}' for {name}"))
            })?;
            values.push(value);
        }
        info!(file = POINT_2X0_FILE, assets = values.len(), "loaded");
        Ok(values)
    }

    /// Scenarios from `vars.txt`; the id is the zero-based line number.
    ///
    /// A blank line is kept as an empty scenario so later ids do not shift.
    pub fn load_scenarios(&self) -> Result<Vec<Scenario>, LoaderError> {
        let path = self.path(VARS_FILE);
        let rows = read_rows(&path)?;
        let mut scenarios = Vec::with_capacity(rows.len());

        for record in &rows {
            let id = record
                .position()
                .and_then(|p| usize::try_from(p.line()).ok())
                .map_or(scenarios.len(), |line| line.saturating_sub(1))
                .max(scenarios.len());
            // The reader drops blank lines; restore them in place.
            while scenarios.len() < id {
                let blank = scenarios.len();
                debug!(file = VARS_FILE, scenario = blank, "blank line");
                scenarios.push(Scenario::new(blank, Vec::new()));
            }
            let vars = record
                .iter()
                .filter(|f| !f.is_empty())
                .map(|f| {
                    f.parse::<usize>().map_err(|_| {
                        LoaderError::malformed(&path, line_of(record), format!("invalid asset index '{f}'"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            scenarios.push(Scenario::new(id, vars));
        }
        info!(file = VARS_FILE, scenarios = scenarios.len(), "loaded");
        Ok(scenarios)
    }
}

/// Whether `name` looks like `x<digits>`.
fn is_asset_name(name: &str) -> bool {
    name.strip_prefix('x')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn read_rows(path: &Path) -> Result<Vec<StringRecord>, LoaderError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoaderError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            LoaderError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(file)
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| LoaderError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_floats(path: &Path, record: &StringRecord) -> Result<Vec<f64>, LoaderError> {
    record
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| {
            f.parse::<f64>()
                .map_err(|_| LoaderError::malformed(path, line_of(record), format!("invalid number '{f}'")))
        })
        .collect()
}

fn write_row(path: &Path, values: &[f64]) -> Result<(), LoaderError> {
    let csv_err = |source: csv::Error| LoaderError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(csv_err)?;
    writer
        .write_record(values.iter().map(f64::to_string))
        .map_err(csv_err)?;
    writer.flush().map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(file = %path.display(), "loss cache written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_asset_name() {
        assert!(is_asset_name("x1"));
        assert!(is_asset_name("x3000"));
        assert!(!is_asset_name("x"));
        assert!(!is_asset_name("component_name"));
        assert!(!is_asset_name("x1a"));
        assert!(!is_asset_name("objective"));
    }

    #[test]
    fn test_builder_setters() {
        let loader = DataLoader::new("data")
            .with_asset_count(None)
            .with_required_return(0.02);
        assert_eq!(loader.data_dir(), Path::new("data"));
        assert_eq!(loader.asset_count, None);
        assert_eq!(loader.required_return, 0.02);
    }

    #[test]
    fn test_missing_directory() {
        let loader = DataLoader::new("/definitely/not/here");
        assert!(matches!(loader.check_layout(), Err(LoaderError::MissingFile { .. })));
    }
}
