//! Historical bar loading.
//!
//! Bars enter the workspace here: CSV rows are parsed, checked against the
//! timeframe grid and validated before the replayer or strategy sees them.

mod aggregate;
mod csv_source;
mod loader;

pub use aggregate::aggregate;
pub use csv_source::CsvDataSource;
pub use loader::{load_timeframes, timeframe_file};

use std::path::Path;
use zoombot_core::error::DataError;
use zoombot_core::types::{Bar, Timeframe};

/// Load `timeframe` bars from a CSV file.
pub fn load_csv(path: impl AsRef<Path>, timeframe: Timeframe) -> Result<Vec<Bar>, DataError> {
    CsvDataSource::new(path)?.load(timeframe)
}
