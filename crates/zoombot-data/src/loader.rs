//! Load a full hierarchy of timeframes from a data directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zoombot_core::error::DataError;
use zoombot_core::types::{Bar, Timeframe, TimeframeHierarchy, TradingPair};

use crate::aggregate::aggregate;
use crate::csv_source::CsvDataSource;

/// Expected file for one pair and timeframe, e.g. `BTC-AUD_5m.csv`.
pub fn timeframe_file(dir: &Path, pair: &TradingPair, timeframe: Timeframe) -> PathBuf {
    dir.join(format!("{}-{}_{}.csv", pair.secondary, pair.primary, timeframe))
}

/// Load bars for every level of `hierarchy` from `dir`.
///
/// Levels without a file are aggregated from the finest loaded level that
/// divides them. Fails with [`DataError::NoDataAvailable`] when a level can
/// be neither loaded nor derived.
pub fn load_timeframes(
    dir: &Path,
    pair: &TradingPair,
    hierarchy: &TimeframeHierarchy,
) -> Result<HashMap<Timeframe, Vec<Bar>>, DataError> {
    let mut data = HashMap::new();

    for &timeframe in hierarchy.levels() {
        let path = timeframe_file(dir, pair, timeframe);
        if path.exists() {
            let bars = CsvDataSource::new(&path)?.load(timeframe)?;
            info!(path = %path.display(), %timeframe, bars = bars.len(), "loaded bars");
            data.insert(timeframe, bars);
        }
    }

    for &timeframe in hierarchy.levels() {
        if data.contains_key(&timeframe) {
            continue;
        }
        let source = hierarchy
            .levels()
            .iter()
            .copied()
            .filter(|tf| {
                tf.as_millis() < timeframe.as_millis()
                    && timeframe.as_millis() % tf.as_millis() == 0
            })
            .find(|tf| data.contains_key(tf));

        let Some(source) = source else {
            warn!(dir = %dir.display(), %timeframe, "no bars and nothing to aggregate from");
            return Err(DataError::NoDataAvailable);
        };
        let bars = aggregate(&data[&source], source, timeframe)?;
        info!(%source, %timeframe, bars = bars.len(), "aggregated bars");
        data.insert(timeframe, bars);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    const T0: i64 = 1_699_920_000_000;

    fn write_minutes(dir: &Path, pair: &TradingPair, count: i64) {
        let mut csv = String::from("timestamp,open,high,low,close,volume\n");
        for i in 0..count {
            writeln!(csv, "{},10,10.5,9.5,10.2,1", T0 + i * 60_000).unwrap();
        }
        std::fs::write(timeframe_file(dir, pair, Timeframe::Minute1), csv).unwrap();
    }

    #[test]
    fn test_file_name() {
        let pair = TradingPair::new("AUD", "BTC");
        let path = timeframe_file(Path::new("data"), &pair, Timeframe::Hour4);
        assert_eq!(path, Path::new("data/BTC-AUD_4h.csv"));
    }

    #[test]
    fn test_missing_levels_are_aggregated() {
        let dir = tempfile::tempdir().unwrap();
        let pair = TradingPair::new("AUD", "BTC");
        write_minutes(dir.path(), &pair, 120);

        let hierarchy =
            TimeframeHierarchy::new(vec![Timeframe::Minute1, Timeframe::Minute5, Timeframe::Hour1])
                .unwrap();
        let data = load_timeframes(dir.path(), &pair, &hierarchy).unwrap();

        assert_eq!(data[&Timeframe::Minute1].len(), 120);
        assert_eq!(data[&Timeframe::Minute5].len(), 24);
        assert_eq!(data[&Timeframe::Hour1].len(), 2);
        assert_eq!(data[&Timeframe::Hour1][0].timestamp, T0);
    }

    #[test]
    fn test_underivable_level_fails() {
        let dir = tempfile::tempdir().unwrap();
        let pair = TradingPair::new("AUD", "BTC");

        let hierarchy = TimeframeHierarchy::default();
        let err = load_timeframes(dir.path(), &pair, &hierarchy).unwrap_err();
        assert!(matches!(err, DataError::NoDataAvailable));
    }
}
