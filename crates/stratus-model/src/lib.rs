//! Forecast model: train, predict, evaluate, persist.
//!
//! A seeded Elman recurrent regressor with a linear autoregressive highway,
//! trained with Adam on z-scored windows. The [`Forecaster`] trait is the
//! only surface the scenario projector depends on.

mod config;
mod error;
mod eval;
mod model;
mod network;
mod optim;
mod result;
mod serialize;
mod train;

pub use config::{Architecture, ForecastConfig};
pub use error::{ConfigError, ModelIoError, ShapeError, TrainingError};
pub use eval::EvaluationMetrics;
pub use model::{ForecastModel, Forecaster, PredictionInterval};
pub use result::{EpochLoss, TrainingMetadata};
pub use train::train;
