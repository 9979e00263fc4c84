//! Model serialization and deserialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::ModelIoError;
use crate::model::ForecastModel;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Input window length.
    window_len: usize,
    /// Forecast horizon.
    horizon: usize,
    /// Variables per step.
    n_features: usize,
    /// The serialized model.
    model: ForecastModel,
}

impl ForecastModel {
    /// Save the model to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelIoError::Serialize`] | bincode encoding failed |
    /// | [`ModelIoError::Write`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelIoError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            window_len: self.window_len(),
            horizon: self.horizon(),
            n_features: self.n_features(),
            model: self.clone(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| ModelIoError::Serialize { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| ModelIoError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(size_bytes = bytes.len(), "model saved");
        Ok(())
    }

    /// Load a model from a binary file, checking the format version.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelIoError::Read`] | file read failed |
    /// | [`ModelIoError::Deserialize`] | bincode decoding failed |
    /// | [`ModelIoError::IncompatibleVersion`] | format version mismatch |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelIoError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| ModelIoError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| ModelIoError::Deserialize {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ModelIoError::IncompatibleVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            window_len = envelope.window_len,
            horizon = envelope.horizon,
            n_features = envelope.n_features,
            "model loaded"
        );

        Ok(envelope.model)
    }
}
