//! Training metadata recorded alongside a fitted model.

/// Losses after one epoch, on z-scored data.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EpochLoss {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean squared error over the training windows.
    pub train_loss: f64,
    /// Mean squared error over the validation windows.
    pub validation_loss: f64,
}

/// Metadata about the training run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainingMetadata {
    /// Total windows supplied.
    pub n_windows: usize,
    /// Windows used for gradient updates.
    pub n_train: usize,
    /// Trailing windows held out for validation.
    pub n_validation: usize,
    /// Variables per step.
    pub n_features: usize,
    /// Number of learned parameters.
    pub n_params: usize,
    /// Epochs completed.
    pub epochs_run: usize,
    /// Training loss of the last epoch.
    pub final_train_loss: f64,
    /// Validation loss of the last epoch.
    pub final_validation_loss: f64,
    /// Per-output residual variance on the validation windows, in physical
    /// units, when uncertainty was requested.
    pub residual_variance: Option<Vec<f64>>,
    /// Loss curve, one entry per epoch.
    pub history: Vec<EpochLoss>,
}
