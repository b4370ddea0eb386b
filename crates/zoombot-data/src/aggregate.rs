//! Roll fine bars up into a coarser timeframe.

use zoombot_core::error::DataError;
use zoombot_core::types::{Bar, Timeframe};

/// Aggregate sorted `from` bars into `to` bars.
///
/// `to` must be a whole multiple of `from`. A trailing bucket whose last
/// source bar does not close the `to` period is dropped, since that bar
/// has not completed yet. Gaps inside a bucket are tolerated.
pub fn aggregate(bars: &[Bar], from: Timeframe, to: Timeframe) -> Result<Vec<Bar>, DataError> {
    let (fine, coarse) = (from.as_millis(), to.as_millis());
    if coarse <= fine || coarse % fine != 0 {
        return Err(DataError::InvalidTimeframe(format!(
            "cannot aggregate {from} bars into {to}"
        )));
    }

    let mut aggregated = Vec::new();
    let mut current: Option<Bar> = None;
    let mut last_close = i64::MIN;

    for bar in bars {
        let bucket_start = to.align(bar.timestamp);

        match current.as_mut() {
            Some(agg) if agg.timestamp == bucket_start => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                if let Some(done) = current.take() {
                    aggregated.push(done);
                }
                current = Some(Bar::new(
                    bucket_start,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                ));
            }
        }
        last_close = bar.timestamp + fine;
    }

    if let Some(agg) = current {
        if last_close == agg.timestamp + coarse {
            aggregated.push(agg);
        }
    }

    Ok(aggregated)
}
