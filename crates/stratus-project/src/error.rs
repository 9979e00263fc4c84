//! Error types for stratus-project.

use std::path::PathBuf;

use stratus_energy::EnergyError;
use stratus_model::ShapeError;
use stratus_series::SeriesError;

/// Errors from loading a [`Scenario`](crate::Scenario) definition.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Returned when scenario JSON is malformed or names an unknown key.
    #[error("invalid scenario JSON")]
    Json {
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a scenario file cannot be read.
    #[error("cannot read scenario file {path}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an adjustment's scale or offset is NaN or infinite.
    #[error("scenario \"{scenario}\": adjustment of \"{variable}\" is not finite")]
    NonFiniteAdjustment {
        /// Scenario name.
        scenario: String,
        /// Adjusted variable.
        variable: String,
    },

    /// Returned when a preset name is not recognised.
    #[error("unknown scenario preset \"{name}\"")]
    UnknownPreset {
        /// The requested name.
        name: String,
    },
}

/// Errors from setting up or running a projection.
///
/// Once a [`Projection`](crate::Projection) yields an error it yields
/// nothing further, and [`Projector::run`](crate::Projector::run) returns
/// the error without a partial result.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// Returned when a scenario adjusts a variable the series does not contain.
    #[error("scenario \"{scenario}\" adjusts unknown variable \"{variable}\"")]
    UnknownVariable {
        /// Scenario name.
        scenario: String,
        /// The unmatched variable.
        variable: String,
    },

    /// Returned when the series is shorter than the model window.
    #[error("series has {available} steps, model window needs {required}")]
    InsufficientHistory {
        /// Steps available.
        available: usize,
        /// Window length required.
        required: usize,
    },

    /// Returned when a projection of zero steps is requested.
    #[error("projection must cover at least one step")]
    ZeroSteps,

    /// Returned when the start window does not fit the model.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Returned when a start window buffer is malformed.
    #[error(transparent)]
    Series(#[from] SeriesError),

    /// Returned when a forecaster returns the wrong number of values.
    #[error("forecaster returned {got} values, expected {expected}")]
    OutputLength {
        /// `horizon × n_features`.
        expected: usize,
        /// Values returned.
        got: usize,
    },

    /// Returned when recursive projection produces a NaN or infinite value.
    #[error("projection diverged at step {step}: \"{variable}\" is not finite")]
    Divergence {
        /// Zero-based projected step.
        step: usize,
        /// First non-finite variable.
        variable: String,
    },

    /// Returned when the power model rejects a projected step.
    #[error("power estimate failed at step {step}")]
    Energy {
        /// Zero-based projected step.
        step: usize,
        /// Underlying energy error.
        source: EnergyError,
    },

    /// Returned when a projected timestamp falls outside the supported calendar.
    #[error("timestamp of step {step} is outside the supported calendar")]
    CalendarOverflow {
        /// Zero-based projected step.
        step: usize,
    },
}
