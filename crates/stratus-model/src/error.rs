use std::path::PathBuf;

/// Errors from validating a [`ForecastConfig`](crate::ForecastConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Returned when a size or count parameter is zero.
    #[error("{parameter} must be at least 1, got 0")]
    ZeroParameter {
        /// Name of the offending parameter.
        parameter: &'static str,
    },

    /// Returned when the learning rate is not finite and positive.
    #[error("learning_rate must be finite and > 0, got {learning_rate}")]
    InvalidLearningRate {
        /// The invalid learning rate.
        learning_rate: f64,
    },

    /// Returned when the validation fraction is not in (0.0, 1.0).
    #[error("validation_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidValidationFraction {
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when a JSON config cannot be parsed or names an unknown key.
    #[error("invalid forecast config JSON")]
    Json {
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a JSON config file cannot be read.
    #[error("cannot read forecast config {path}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors from training a [`ForecastModel`](crate::ForecastModel).
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    /// Returned when the config fails validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Returned when the window set is empty.
    #[error("cannot train on zero windows")]
    EmptyWindows,

    /// Returned when the chronological split leaves one side without samples.
    #[error("split of {n_windows} windows leaves {n_train} for training and {n_validation} for validation")]
    EmptySplit {
        /// Total number of windows.
        n_windows: usize,
        /// Windows assigned to training.
        n_train: usize,
        /// Windows assigned to validation.
        n_validation: usize,
    },

    /// Returned when a window's step count disagrees with the config.
    #[error("window {window}: {part} has {got} steps, expected {expected}")]
    WindowShape {
        /// Zero-based window index.
        window: usize,
        /// `input` or `target`.
        part: &'static str,
        /// Steps required by the config.
        expected: usize,
        /// Steps found.
        got: usize,
    },

    /// Returned when windows disagree on the number of variables.
    #[error("window {window} has {got} features, expected {expected}")]
    FeatureCount {
        /// Zero-based window index.
        window: usize,
        /// Feature count of the first window.
        expected: usize,
        /// Feature count found.
        got: usize,
    },

    /// Returned when the loss becomes NaN or infinite.
    #[error("training diverged: non-finite loss in epoch {epoch}")]
    NonFiniteLoss {
        /// Zero-based epoch in which the loss diverged.
        epoch: usize,
    },
}

/// Errors from feeding a window of the wrong shape to a trained model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// Returned when an input view has the wrong number of steps.
    #[error("input has {got} steps, model expects {expected}")]
    WindowLength {
        /// Trained window length.
        expected: usize,
        /// Steps supplied.
        got: usize,
    },

    /// Returned when an input or target has the wrong number of variables.
    #[error("input has {got} features, model expects {expected}")]
    FeatureCount {
        /// Trained feature count.
        expected: usize,
        /// Features supplied.
        got: usize,
    },

    /// Returned when an evaluation window's target length differs from the model horizon.
    #[error("window {window}: target has {got} steps, model horizon is {expected}")]
    Horizon {
        /// Zero-based window index.
        window: usize,
        /// Trained horizon.
        expected: usize,
        /// Target steps supplied.
        got: usize,
    },

    /// Returned when evaluating on zero windows.
    #[error("cannot evaluate on zero windows")]
    EmptyWindowSet,

    /// Returned when variances are requested from a model trained without them.
    #[error("model was trained without uncertainty estimation")]
    UncertaintyNotConfigured,
}

/// Errors from saving or loading a model file.
#[derive(Debug, thiserror::Error)]
pub enum ModelIoError {
    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    Serialize {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    Deserialize {
        /// Path to the model file.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    Write {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the file was written by an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleVersion {
        /// Format version this build reads.
        expected: u32,
        /// Format version in the file.
        found: u32,
        /// Path to the model file.
        path: PathBuf,
    },
}
