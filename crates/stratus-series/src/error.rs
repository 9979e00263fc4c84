//! Validation errors for climate series construction and windowing.

use chrono::NaiveDate;

/// Errors raised while building or slicing a [`ClimateSeries`](crate::ClimateSeries).
///
/// Every step-level variant carries the zero-based `step` index of the
/// offending input row, so loaders can report it without re-deriving it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    /// Returned when a series is built from zero variables.
    #[error("a climate series needs at least one variable")]
    NoVariables,

    /// Returned when the same variable name is declared twice.
    #[error("variable \"{name}\" is declared more than once")]
    DuplicateVariable {
        /// The repeated variable name.
        name: String,
    },

    /// Returned when `build()` is called before any step was pushed.
    #[error("climate series has zero time steps")]
    EmptySeries,

    /// Returned when a step carries a different number of values than variables.
    #[error("step {step} has {got} values, expected {expected}")]
    FeatureCountMismatch {
        /// Zero-based input step index.
        step: usize,
        /// Number of declared variables.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },

    /// Returned when a value is NaN or infinite.
    #[error("non-finite value for \"{variable}\" at step {step}")]
    NonFiniteValue {
        /// Zero-based input step index.
        step: usize,
        /// Variable name.
        variable: String,
    },

    /// Returned when a value lies outside the variable's physical range.
    #[error("value {value} for \"{variable}\" at step {step} is outside [{min}, {max}]")]
    OutOfRange {
        /// Zero-based input step index.
        step: usize,
        /// Variable name.
        variable: String,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// Returned when a timestamp does not land on the declared granularity
    /// (e.g. a mid-month date in a monthly series).
    #[error("timestamp {timestamp} at step {step} is not aligned to {granularity} steps")]
    MisalignedTimestamp {
        /// Zero-based input step index.
        step: usize,
        /// The misaligned timestamp.
        timestamp: NaiveDate,
        /// Declared granularity name.
        granularity: &'static str,
    },

    /// Returned when a timestamp is not strictly after its predecessor.
    #[error("timestamp {timestamp} at step {step} does not follow {previous}")]
    NonMonotonic {
        /// Zero-based input step index.
        step: usize,
        /// The offending timestamp.
        timestamp: NaiveDate,
        /// The preceding timestamp.
        previous: NaiveDate,
    },

    /// Returned when one or more steps are missing and gaps are rejected.
    #[error("gap at step {step}: expected {expected}, found {found}")]
    Gap {
        /// Zero-based input step index.
        step: usize,
        /// The timestamp the granularity requires next.
        expected: NaiveDate,
        /// The timestamp actually supplied.
        found: NaiveDate,
    },

    /// Returned when a window length, horizon or stride of zero is requested.
    #[error("{parameter} must be at least 1, got 0")]
    ZeroWindowParameter {
        /// Which parameter was zero (`window_len`, `horizon` or `stride`).
        parameter: &'static str,
    },

    /// Returned when a flat value buffer cannot be split into whole steps.
    #[error("buffer of {len} values is not a whole number of {n_features}-feature steps")]
    RaggedBuffer {
        /// Buffer length.
        len: usize,
        /// Features per step.
        n_features: usize,
    },
}
