//! Named what-if adjustments applied to climate variables.

use std::path::Path;

use stratus_series::VariableKind;

use crate::error::{ProjectionError, ScenarioError};

/// Which side of the model a scenario perturbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentTarget {
    /// Adjust the starting history once, before the first prediction.
    Input,
    /// Adjust each projected step after it is predicted.
    #[default]
    Output,
}

/// `value * scale + offset` applied to one variable.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Adjustment {
    /// Column name, or a generic name such as `temperature` or `rainfall`
    /// that matches the first column of that kind.
    pub variable: String,
    /// Multiplier, 1.0 by default.
    #[serde(default = "unit_scale")]
    pub scale: f64,
    /// Additive shift after scaling, 0.0 by default.
    #[serde(default)]
    pub offset: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl Adjustment {
    /// Multiply `variable` by `scale`.
    #[must_use]
    pub fn scale(variable: &str, scale: f64) -> Self {
        Self {
            variable: variable.to_string(),
            scale,
            offset: 0.0,
        }
    }

    /// Add `offset` to `variable`.
    #[must_use]
    pub fn offset(variable: &str, offset: f64) -> Self {
        Self {
            variable: variable.to_string(),
            scale: 1.0,
            offset,
        }
    }

    /// Apply the adjustment to one value.
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

/// A named set of adjustments. Pure data.
///
/// # Presets
///
/// | Name         | Adjustments                        |
/// |--------------|------------------------------------|
/// | `normal`     | none                               |
/// | `wetter`     | rainfall ×1.3                      |
/// | `drier`      | rainfall ×0.7                      |
/// | `hotter`     | temperature ×1.1, rainfall ×0.9    |
/// | `warming-2c` | temperature +2                     |
/// | `drought`    | rainfall ×0.5                      |
///
/// Presets target projected outputs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Scenario name, carried into results.
    pub name: String,
    /// Input or output side.
    #[serde(default)]
    pub target: AdjustmentTarget,
    /// Adjustments, applied in order.
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
}

/// Names accepted by [`Scenario::preset`].
pub const PRESET_NAMES: [&str; 6] = ["normal", "wetter", "drier", "hotter", "warming-2c", "drought"];

impl Scenario {
    /// Create a scenario with no adjustments.
    #[must_use]
    pub fn new(name: &str, target: AdjustmentTarget) -> Self {
        Self {
            name: name.to_string(),
            target,
            adjustments: Vec::new(),
        }
    }

    /// The unadjusted baseline.
    #[must_use]
    pub fn baseline() -> Self {
        Self::new("baseline", AdjustmentTarget::Output)
    }

    /// Append an adjustment.
    #[must_use]
    pub fn with_adjustment(mut self, adjustment: Adjustment) -> Self {
        self.adjustments.push(adjustment);
        self
    }

    /// Look up a built-in preset by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::UnknownPreset`] for names not in
    /// [`PRESET_NAMES`].
    pub fn preset(name: &str) -> Result<Self, ScenarioError> {
        let key = name.trim().to_ascii_lowercase();
        let base = Self::new(&key, AdjustmentTarget::Output);
        let scenario = match key.as_str() {
            "normal" => base,
            "wetter" => base.with_adjustment(Adjustment::scale("rainfall", 1.3)),
            "drier" => base.with_adjustment(Adjustment::scale("rainfall", 0.7)),
            "hotter" => base
                .with_adjustment(Adjustment::scale("temperature", 1.1))
                .with_adjustment(Adjustment::scale("rainfall", 0.9)),
            "warming-2c" => base.with_adjustment(Adjustment::offset("temperature", 2.0)),
            "drought" => base.with_adjustment(Adjustment::scale("rainfall", 0.5)),
            _ => {
                return Err(ScenarioError::UnknownPreset {
                    name: name.to_string(),
                });
            }
        };
        Ok(scenario)
    }

    /// Parse a scenario from JSON. Unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Json`] on malformed input and
    /// [`ScenarioError::NonFiniteAdjustment`] if a scale or offset is not
    /// finite.
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Self =
            serde_json::from_str(json).map_err(|source| ScenarioError::Json { source })?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read and parse a scenario JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::ReadFile`] if the file cannot be read, plus
    /// the errors of [`Scenario::from_json_str`].
    pub fn from_json_file(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Resolve a preset name or a path to a scenario JSON file.
    ///
    /// # Errors
    ///
    /// Returns the file errors of [`Scenario::from_json_file`] when `name_or_path`
    /// names an existing file, [`ScenarioError::UnknownPreset`] otherwise.
    pub fn from_name_or_path(name_or_path: &str) -> Result<Self, ScenarioError> {
        let path = Path::new(name_or_path);
        if path.is_file() {
            return Self::from_json_file(path);
        }
        Self::preset(name_or_path)
    }

    /// Check that every adjustment is finite.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NonFiniteAdjustment`] on the first offender.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        match self
            .adjustments
            .iter()
            .find(|a| !a.scale.is_finite() || !a.offset.is_finite())
        {
            Some(a) => Err(ScenarioError::NonFiniteAdjustment {
                scenario: self.name.clone(),
                variable: a.variable.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Return true if the scenario changes nothing.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.adjustments
            .iter()
            .all(|a| a.scale == 1.0 && a.offset == 0.0)
    }

    /// Bind each adjustment to a column of `variables`.
    ///
    /// An exact (case-insensitive) column name wins; otherwise a generic name
    /// binds to the first column of the same [`VariableKind`].
    pub(crate) fn resolve(
        &self,
        variables: &[String],
    ) -> Result<Vec<(usize, Adjustment)>, ProjectionError> {
        self.adjustments
            .iter()
            .map(|adjustment| {
                let wanted = adjustment.variable.trim();
                let exact = variables
                    .iter()
                    .position(|v| v.trim().eq_ignore_ascii_case(wanted));
                let by_kind = || match VariableKind::of(wanted) {
                    VariableKind::Other => None,
                    kind => kind.find(variables),
                };
                exact
                    .or_else(by_kind)
                    .map(|feature| (feature, adjustment.clone()))
                    .ok_or_else(|| ProjectionError::UnknownVariable {
                        scenario: self.name.clone(),
                        variable: adjustment.variable.clone(),
                    })
            })
            .collect()
    }
}

/// Apply resolved adjustments to every step of a row-major buffer.
pub(crate) fn apply_all(resolved: &[(usize, Adjustment)], values: &mut [f64], n_features: usize) {
    for step in values.chunks_exact_mut(n_features) {
        for (feature, adjustment) in resolved {
            step[*feature] = adjustment.apply(step[*feature]);
        }
    }
}
