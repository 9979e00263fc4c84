//! I/O error types for stratus-io.

use std::path::PathBuf;

use stratus_series::SeriesError;

/// Errors from file I/O, CSV parsing, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the header has a timestamp column but no variables.
    #[error("no variable columns in {path}")]
    NoVariableColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a requested or required column is missing from the header.
    #[error("column \"{column}\" not found in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The missing column name.
        column: String,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when the timestamp cell cannot be parsed.
    #[error("invalid timestamp in {path}: row {row_index}, raw value \"{raw}\"")]
    InvalidTimestamp {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw cell.
        raw: String,
    },

    /// Returned when a cell value is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Column name.
        column: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the header declares an invalid variable set.
    #[error("invalid header in {path}")]
    InvalidHeader {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying validation error.
        source: SeriesError,
    },

    /// Returned when a row fails series validation (range, order, gap).
    #[error("invalid row {row_index} in {path}")]
    InvalidRow {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Underlying validation error.
        source: SeriesError,
    },

    /// Returned when a site row carries a negative physical quantity or an empty name.
    #[error("invalid site in {path}: row {row_index}, {reason}")]
    InvalidSite {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// What is wrong with the row.
        reason: String,
    },

    /// Returned when the same site name appears more than once.
    #[error("duplicate site \"{name}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateSite {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated site name.
        name: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when the experiment name is not a plain `[a-zA-Z0-9_-]+` file stem.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+, not start with '-', and be at most 64 bytes")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV result file cannot be written.
    #[error("cannot write CSV file {path}")]
    CsvWrite {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },
}
