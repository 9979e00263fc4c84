//! Error metrics over a window set.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use stratus_series::Window;
use tracing::{info, instrument};

use crate::error::ShapeError;
use crate::model::ForecastModel;

/// Forecast error over every target value of a window set.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvaluationMetrics {
    /// Mean absolute error in physical units.
    pub mean_absolute_error: f64,
    /// Root mean squared error in physical units.
    pub root_mean_squared_error: f64,
    /// Number of windows evaluated.
    pub n_windows: usize,
    /// Number of target values compared.
    pub n_values: usize,
}

impl ForecastModel {
    /// Compare predictions against the targets of `windows`.
    ///
    /// Every window must match the trained window length, horizon and
    /// feature count; nothing is truncated.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ShapeError::EmptyWindowSet`] | `windows` is empty |
    /// | [`ShapeError::Horizon`] | A target length differs from the trained horizon |
    /// | [`ShapeError::WindowLength`] | An input length differs from the trained window length |
    /// | [`ShapeError::FeatureCount`] | A window has the wrong number of variables |
    #[instrument(skip_all, fields(n_windows = windows.len()))]
    pub fn evaluate(&self, windows: &[Window<'_>]) -> Result<EvaluationMetrics, ShapeError> {
        if windows.is_empty() {
            return Err(ShapeError::EmptyWindowSet);
        }
        for (window, w) in windows.iter().enumerate() {
            if w.target().n_features() != self.n_features() {
                return Err(ShapeError::FeatureCount {
                    expected: self.n_features(),
                    got: w.target().n_features(),
                });
            }
            if w.target().steps() != self.horizon() {
                return Err(ShapeError::Horizon {
                    window,
                    expected: self.horizon(),
                    got: w.target().steps(),
                });
            }
            self.check_input(w.input())?;
        }

        let errors: Vec<(f64, f64)> = windows
            .par_iter()
            .map(|w| -> Result<(f64, f64), ShapeError> {
                let pred = self.predict(w.input())?;
                Ok(pred
                    .iter()
                    .zip(w.target().as_slice())
                    .fold((0.0, 0.0), |(abs, sq), (p, t)| {
                        let e = p - t;
                        (abs + e.abs(), sq + e * e)
                    }))
            })
            .collect::<Result<_, _>>()?;

        let n_values = windows.len() * self.horizon() * self.n_features();
        let (abs, sq) = errors
            .iter()
            .fold((0.0, 0.0), |(a, s), (ea, es)| (a + ea, s + es));
        let metrics = EvaluationMetrics {
            mean_absolute_error: abs / n_values as f64,
            root_mean_squared_error: (sq / n_values as f64).sqrt(),
            n_windows: windows.len(),
            n_values,
        };
        info!(
            mae = metrics.mean_absolute_error,
            rmse = metrics.root_mean_squared_error,
            "evaluation complete"
        );
        Ok(metrics)
    }
}
