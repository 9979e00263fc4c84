//! The trained forecast model and the black-box forecaster seam.

use stratus_series::{Scaler, SeriesView};

use crate::config::ForecastConfig;
use crate::error::ShapeError;
use crate::network::Network;
use crate::result::TrainingMetadata;

/// One predicted value with the residual variance observed for its output.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredictionInterval {
    /// Point prediction.
    pub mean: f64,
    /// Residual variance of this output on the validation windows.
    pub variance: f64,
}

impl PredictionInterval {
    /// Return `(lower, upper)` at `z` standard deviations around the mean.
    #[must_use]
    pub fn bounds(&self, z: f64) -> (f64, f64) {
        let half = z * self.variance.max(0.0).sqrt();
        (self.mean - half, self.mean + half)
    }
}

/// Window-in, values-out regressor.
///
/// The scenario projector depends only on this trait, so any model that maps
/// `window_len` steps of `n_features` variables to `horizon` steps can drive
/// a projection.
pub trait Forecaster {
    /// Input steps per prediction.
    fn window_len(&self) -> usize;

    /// Output steps per prediction.
    fn horizon(&self) -> usize;

    /// Variables per step.
    fn n_features(&self) -> usize;

    /// Predict `horizon × n_features` values, row-major.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] if `input` does not match the trained shape.
    fn predict(&self, input: SeriesView<'_>) -> Result<Vec<f64>, ShapeError>;

    /// Predict with per-value variance.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::UncertaintyNotConfigured`] unless overridden.
    fn predict_with_variance(
        &self,
        input: SeriesView<'_>,
    ) -> Result<Vec<PredictionInterval>, ShapeError> {
        let _ = input;
        Err(ShapeError::UncertaintyNotConfigured)
    }

    /// Return true if [`Forecaster::predict_with_variance`] is available.
    fn has_uncertainty(&self) -> bool {
        false
    }
}

/// A trained forecast model.
///
/// Owns the learned parameters, the input scaler, the config used to train
/// it and the training metadata. Immutable: retraining produces a new
/// instance.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ForecastModel {
    pub(crate) config: ForecastConfig,
    pub(crate) network: Network,
    pub(crate) scaler: Scaler,
    pub(crate) variables: Option<Vec<String>>,
    pub(crate) metadata: TrainingMetadata,
}

impl ForecastModel {
    /// Attach the variable names of the training series, in column order.
    #[must_use]
    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Return the config the model was trained with.
    #[must_use]
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Return the training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Return the fitted scaler.
    #[must_use]
    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    /// Return the training variable names, if attached.
    #[must_use]
    pub fn variables(&self) -> Option<&[String]> {
        self.variables.as_deref()
    }

    /// Return the trained window length.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.config.window_len
    }

    /// Return the trained horizon.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.config.horizon
    }

    /// Return the trained feature count.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.network.shape().n_features
    }

    pub(crate) fn check_input(&self, input: SeriesView<'_>) -> Result<(), ShapeError> {
        if input.n_features() != self.n_features() {
            return Err(ShapeError::FeatureCount {
                expected: self.n_features(),
                got: input.n_features(),
            });
        }
        if input.steps() != self.window_len() {
            return Err(ShapeError::WindowLength {
                expected: self.window_len(),
                got: input.steps(),
            });
        }
        Ok(())
    }

    /// Predict the next `horizon` steps after `input`.
    ///
    /// Returns `horizon × n_features` values in physical units, row-major.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ShapeError::WindowLength`] | `input.steps()` differs from the trained window length |
    /// | [`ShapeError::FeatureCount`] | `input.n_features()` differs from the trained feature count |
    pub fn predict(&self, input: SeriesView<'_>) -> Result<Vec<f64>, ShapeError> {
        self.check_input(input)?;
        let x = self.scaler.transform(input.as_slice());
        Ok(self.scaler.inverse(&self.network.predict(&x)))
    }

    /// Predict with the per-output residual variance recorded during training.
    ///
    /// # Errors
    ///
    /// As [`ForecastModel::predict`], plus
    /// [`ShapeError::UncertaintyNotConfigured`] if the model was trained
    /// without `with_uncertainty(true)`.
    pub fn predict_with_variance(
        &self,
        input: SeriesView<'_>,
    ) -> Result<Vec<PredictionInterval>, ShapeError> {
        let Some(variance) = &self.metadata.residual_variance else {
            return Err(ShapeError::UncertaintyNotConfigured);
        };
        let mean = self.predict(input)?;
        Ok(mean
            .into_iter()
            .zip(variance)
            .map(|(mean, &variance)| PredictionInterval { mean, variance })
            .collect())
    }
}

impl Forecaster for ForecastModel {
    fn window_len(&self) -> usize {
        ForecastModel::window_len(self)
    }

    fn horizon(&self) -> usize {
        ForecastModel::horizon(self)
    }

    fn n_features(&self) -> usize {
        ForecastModel::n_features(self)
    }

    fn predict(&self, input: SeriesView<'_>) -> Result<Vec<f64>, ShapeError> {
        ForecastModel::predict(self, input)
    }

    fn predict_with_variance(
        &self,
        input: SeriesView<'_>,
    ) -> Result<Vec<PredictionInterval>, ShapeError> {
        ForecastModel::predict_with_variance(self, input)
    }

    fn has_uncertainty(&self) -> bool {
        self.metadata.residual_variance.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_bounds() {
        let p = PredictionInterval {
            mean: 10.0,
            variance: 4.0,
        };
        assert_eq!(p.bounds(1.96), (10.0 - 3.92, 10.0 + 3.92));
    }
}
