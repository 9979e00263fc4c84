//! Validated climate series, windowing and normalization.
//!
//! Pure data library with zero I/O. A [`ClimateSeries`] is an ordered,
//! gap-free, multi-variable record at a fixed [`Granularity`]; [`Windows`]
//! slices it into supervised input/target pairs without copying.

mod bounds;
mod error;
mod granularity;
mod scaler;
mod series;
mod window;

pub use bounds::{PhysicalRange, VariableKind};
pub use error::SeriesError;
pub use granularity::{Granularity, parse_timestamp};
pub use scaler::Scaler;
pub use series::{ClimateSeries, GapPolicy, SeriesBuilder, SeriesView};
pub use window::{Window, Windows};
