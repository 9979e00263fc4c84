//! File I/O, validation, and serialization for the stratus pipeline.

mod domain;
mod error;
mod reader;
mod site_reader;
mod writer;

pub use domain::{ExperimentName, MAX_EXPERIMENT_LEN};
pub use error::IoError;
pub use reader::SeriesReader;
pub use site_reader::{SITE_COLUMNS, SiteReader};
pub use writer::ResultWriter;
