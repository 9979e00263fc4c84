//! Scenario projection: drive a trained forecaster past the end of the
//! observed series and turn every projected step into a power estimate.

mod error;
mod projector;
mod result;
mod scenario;

pub use error::{ProjectionError, ScenarioError};
pub use projector::{INTERVAL_Z, Projection, Projector, StartWindow};
pub use result::{ConfidenceBand, ForecastRecord, ForecastResult, ForecastSummary};
pub use scenario::{Adjustment, AdjustmentTarget, PRESET_NAMES, Scenario};
