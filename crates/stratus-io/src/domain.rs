//! Experiment naming for output artifacts.

use std::fmt;
use std::str::FromStr;

use crate::IoError;

/// Longest accepted experiment name, in bytes.
pub const MAX_EXPERIMENT_LEN: usize = 64;

/// Name shared by every artifact of one run (`{name}_forecast.json`, ...).
///
/// Must match `[a-zA-Z0-9_-]+`, must not start with `-` and is at most
/// [`MAX_EXPERIMENT_LEN`] bytes, so it is always a plain file-name stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty, too
    /// long, starts with `-` or contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_EXPERIMENT_LEN
            && !name.starts_with('-')
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of one artifact, e.g. `dhaka_forecast.csv`.
    #[must_use]
    pub fn artifact(&self, kind: &str, extension: &str) -> String {
        format!("{}_{kind}.{extension}", self.0)
    }
}

impl FromStr for ExperimentName {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
