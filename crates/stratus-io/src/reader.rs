//! CSV climate series reader with full input validation.

use std::path::{Path, PathBuf};

use stratus_series::{ClimateSeries, GapPolicy, Granularity, PhysicalRange, parse_timestamp};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a climate series from a CSV file.
///
/// Expected CSV format:
/// - Header row required (first column is the timestamp, remaining are
///   variable names)
/// - `date,tem,rain,...`
/// - Timestamps as `YYYY-MM-DD`, `YYYY-MM` or `YYYY`, one row per step
///
/// The whole file is rejected on the first invalid row.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoVariableColumns`] | Header has only the timestamp column |
/// | [`IoError::MissingColumn`] | A selected variable is not in the header |
/// | [`IoError::InvalidHeader`] | Variable names repeat |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::InvalidTimestamp`] | Timestamp cell cannot be parsed |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::InvalidRow`] | Out of range, misaligned, out of order, or a gap |
pub struct SeriesReader {
    path: PathBuf,
    granularity: Granularity,
    gap_policy: GapPolicy,
    bounds: Vec<(String, PhysicalRange)>,
    variables: Option<Vec<String>>,
}

impl SeriesReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path, granularity: Granularity) -> Self {
        Self {
            path: path.to_path_buf(),
            granularity,
            gap_policy: GapPolicy::Reject,
            bounds: Vec::new(),
            variables: None,
        }
    }

    /// Set how missing steps are handled.
    #[must_use]
    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    /// Override the physical range of one variable.
    #[must_use]
    pub fn with_bounds(mut self, variable: &str, min: f64, max: f64) -> Self {
        self.bounds
            .push((variable.to_string(), PhysicalRange::new(min, max)));
        self
    }

    /// Load only these variable columns, in this order.
    #[must_use]
    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Read and validate the CSV file, returning a [`ClimateSeries`].
    #[instrument(skip(self), fields(path = %self.path.display(), granularity = %self.granularity))]
    pub fn read(&self) -> Result<ClimateSeries, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that InconsistentRowLength fires instead of CsvParse.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let expected_cols = header.len();
        if expected_cols < 2 {
            return Err(IoError::NoVariableColumns {
                path: self.path.clone(),
            });
        }
        let columns: Vec<String> = header.iter().skip(1).map(|c| c.trim().to_string()).collect();
        let selected = self.select_columns(&columns)?;
        let names: Vec<String> = selected.iter().map(|&i| columns[i].clone()).collect();
        debug!(expected_cols, variables = ?names, "read CSV header");

        let mut builder = ClimateSeries::builder(self.granularity, names.clone())
            .map_err(|source| IoError::InvalidHeader {
                path: self.path.clone(),
                source,
            })?
            .with_gap_policy(self.gap_policy);
        for (variable, range) in &self.bounds {
            builder = builder.with_range(variable, *range);
        }

        let mut n_rows = 0;
        let mut values = Vec::with_capacity(selected.len());
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let raw_ts = record.get(0).unwrap_or("");
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| IoError::InvalidTimestamp {
                path: self.path.clone(),
                row_index,
                raw: raw_ts.to_string(),
            })?;

            values.clear();
            for (&col, name) in selected.iter().zip(&names) {
                let raw = record.get(col + 1).unwrap_or("").trim();
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: name.clone(),
                        raw: raw.to_string(),
                    })?;
                values.push(value);
            }

            builder
                .push(timestamp, &values)
                .map_err(|source| IoError::InvalidRow {
                    path: self.path.clone(),
                    row_index,
                    source,
                })?;
            n_rows += 1;
        }

        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        let series = builder.build().map_err(|source| IoError::InvalidRow {
            path: self.path.clone(),
            row_index: n_rows - 1,
            source,
        })?;

        info!(
            n_rows,
            n_steps = series.len(),
            n_variables = series.n_features(),
            first = %series.timestamps()[0],
            last = %series.last_timestamp(),
            "series loaded"
        );
        Ok(series)
    }

    /// Indices into the variable columns (header minus the timestamp column).
    fn select_columns(&self, columns: &[String]) -> Result<Vec<usize>, IoError> {
        let Some(wanted) = &self.variables else {
            return Ok((0..columns.len()).collect());
        };
        wanted
            .iter()
            .map(|w| {
                columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(w.trim()))
                    .ok_or_else(|| IoError::MissingColumn {
                        path: self.path.clone(),
                        column: w.clone(),
                    })
            })
            .collect()
    }
}
