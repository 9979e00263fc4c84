//! Configuration builder for forecast model training.

use std::path::Path;

use stratus_series::Window;

use crate::error::{ConfigError, TrainingError};
use crate::model::ForecastModel;

/// Network structure used by the regressor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// Stacked tanh recurrent layers with a dense head, plus a linear
    /// autoregressive highway over the flattened window.
    #[default]
    Elman,
    /// The linear autoregressive highway alone.
    Autoregressive,
}

/// Configuration for forecast model training.
///
/// Construct via [`ForecastConfig::new`], then chain `with_*` methods, or
/// load from JSON with [`ForecastConfig::from_json_str`]. Unknown JSON keys
/// are rejected. Fields other than `window_len` and `horizon` are optional
/// in JSON.
///
/// # Defaults
///
/// | Parameter             | Default  |
/// |-----------------------|----------|
/// | `hidden_size`         | 16       |
/// | `layers`              | 1        |
/// | `architecture`        | `Elman`  |
/// | `epochs`              | 200      |
/// | `learning_rate`       | 0.01     |
/// | `batch_size`          | 32       |
/// | `validation_fraction` | 0.2      |
/// | `seed`                | 42       |
/// | `uncertainty`         | false    |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastConfig {
    pub(crate) window_len: usize,
    pub(crate) horizon: usize,
    #[serde(default = "default_hidden_size")]
    pub(crate) hidden_size: usize,
    #[serde(default = "default_layers")]
    pub(crate) layers: usize,
    #[serde(default)]
    pub(crate) architecture: Architecture,
    #[serde(default = "default_epochs")]
    pub(crate) epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub(crate) learning_rate: f64,
    #[serde(default = "default_batch_size")]
    pub(crate) batch_size: usize,
    #[serde(default = "default_validation_fraction")]
    pub(crate) validation_fraction: f64,
    #[serde(default = "default_seed")]
    pub(crate) seed: u64,
    #[serde(default)]
    pub(crate) uncertainty: bool,
}

fn default_hidden_size() -> usize {
    16
}
fn default_layers() -> usize {
    1
}
fn default_epochs() -> usize {
    200
}
fn default_learning_rate() -> f64 {
    0.01
}
fn default_batch_size() -> usize {
    32
}
fn default_validation_fraction() -> f64 {
    0.2
}
fn default_seed() -> u64 {
    42
}

impl ForecastConfig {
    /// Create a new config for windows of `window_len` input steps and
    /// `horizon` target steps.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroParameter`] if either is zero.
    pub fn new(window_len: usize, horizon: usize) -> Result<Self, ConfigError> {
        let config = Self {
            window_len,
            horizon,
            hidden_size: default_hidden_size(),
            layers: default_layers(),
            architecture: Architecture::default(),
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            batch_size: default_batch_size(),
            validation_fraction: default_validation_fraction(),
            seed: default_seed(),
            uncertainty: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config and validate it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ConfigError::Json`] | Malformed JSON, a missing required key or an unknown key |
    /// | Other [`ConfigError`] | A parsed value fails validation |
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Json { source: e })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] if the file cannot be read, otherwise
    /// as [`ForecastConfig::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&json)
    }

    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ConfigError::ZeroParameter`] | `window_len`, `horizon`, `hidden_size`, `layers`, `epochs` or `batch_size` is zero |
    /// | [`ConfigError::InvalidLearningRate`] | `learning_rate` is not finite and positive |
    /// | [`ConfigError::InvalidValidationFraction`] | `validation_fraction` is not in (0.0, 1.0) |
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (parameter, value) in [
            ("window_len", self.window_len),
            ("horizon", self.horizon),
            ("hidden_size", self.hidden_size),
            ("layers", self.layers),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroParameter { parameter });
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(ConfigError::InvalidValidationFraction {
                fraction: self.validation_fraction,
            });
        }
        Ok(())
    }

    // --- Setters ---

    /// Set the recurrent hidden size.
    #[must_use]
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Set the number of stacked recurrent layers.
    #[must_use]
    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Set the network architecture.
    #[must_use]
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    /// Set the number of passes over the training windows.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the Adam step size.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the mini-batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the fraction of windows (taken from the end) held out for validation.
    #[must_use]
    pub fn with_validation_fraction(mut self, validation_fraction: f64) -> Self {
        self.validation_fraction = validation_fraction;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Record per-output residual variance so predictions carry intervals.
    #[must_use]
    pub fn with_uncertainty(mut self, uncertainty: bool) -> Self {
        self.uncertainty = uncertainty;
        self
    }

    // --- Getters ---

    /// Return the input window length.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Return the forecast horizon.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Return the recurrent hidden size.
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Return the number of recurrent layers.
    #[must_use]
    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Return the architecture.
    #[must_use]
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Return the epoch count.
    #[must_use]
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Return the learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Return the mini-batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Return the validation fraction.
    #[must_use]
    pub fn validation_fraction(&self) -> f64 {
        self.validation_fraction
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return whether residual variances are recorded.
    #[must_use]
    pub fn uncertainty(&self) -> bool {
        self.uncertainty
    }

    /// Train a model on `windows`. Equivalent to [`crate::train`].
    ///
    /// # Errors
    ///
    /// See [`crate::train`].
    pub fn fit(&self, windows: &[Window<'_>]) -> Result<ForecastModel, TrainingError> {
        crate::train::train(self, windows)
    }
}
