//! CSV data source.

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zoombot_core::error::DataError;
use zoombot_core::types::{Bar, Timeframe};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp", alias = "time")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// CSV file of bars for one pair and one timeframe.
pub struct CsvDataSource {
    path: PathBuf,
}

impl CsvDataSource {
    /// Create a new CSV data source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all bars, sorted by timestamp.
    ///
    /// Every bar must open on a `timeframe` boundary and pass
    /// [`Bar::validate`]. Rows repeating a timestamp keep the last one.
    pub fn load(&self, timeframe: Timeframe) -> Result<Vec<Bar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut bars = Vec::new();

        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
            let timestamp = parse_timestamp(&record.date)?;

            if timeframe.align(timestamp) != timestamp {
                return Err(DataError::InvalidBar {
                    timestamp,
                    reason: format!("not aligned to a {timeframe} boundary"),
                });
            }

            let bar = Bar::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            );
            bar.validate()?;
            bars.push(bar);
        }

        // Stable sort keeps file order among equal timestamps
        bars.sort_by_key(|b| b.timestamp);
        let before = bars.len();
        bars.reverse();
        bars.dedup_by_key(|b| b.timestamp);
        bars.reverse();
        if bars.len() < before {
            warn!(
                path = %self.path.display(),
                duplicates = before - bars.len(),
                "dropped duplicate bars"
            );
        }

        debug!(path = %self.path.display(), %timeframe, bars = bars.len(), "loaded csv");
        Ok(bars)
    }
}

/// Parse various timestamp formats into Unix milliseconds (UTC).
fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    let date_time_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in date_time_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp_millis());
        }
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.timestamp_millis());
    }

    // Unix timestamp: seconds up to 10^10 (year 2286), milliseconds above
    if let Ok(ts) = date_str.parse::<i64>() {
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}
