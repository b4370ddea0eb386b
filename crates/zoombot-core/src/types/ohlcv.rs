//! OHLC bar data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::Timeframe;
use crate::error::DataError;

/// Compact OHLC bar.
/// Uses f64 for fast indicator calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Unix timestamp in milliseconds (bar open, aligned to the timeframe)
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume, zero when the source does not report it
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check the bar before it enters the core.
    pub fn validate(&self) -> Result<(), DataError> {
        let invalid = |reason: &str| DataError::InvalidBar {
            timestamp: self.timestamp,
            reason: reason.to_string(),
        };

        if ![self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite())
        {
            return Err(invalid("non-finite price"));
        }
        if self.close <= 0.0 {
            return Err(invalid("close must be positive"));
        }
        if self.low > self.high {
            return Err(invalid("low above high"));
        }
        Ok(())
    }

    /// Midpoint of open and close.
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    /// Calculate the bar's range (high - low).
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Bounded, time-ordered bar buffer for one timeframe.
#[derive(Debug, Clone)]
pub struct BarStore {
    timeframe: Timeframe,
    bars: VecDeque<Bar>,
    /// Maximum capacity (0 = unlimited)
    capacity: usize,
}

impl BarStore {
    /// Create a store with a maximum capacity.
    /// When capacity is reached, oldest bars are removed.
    pub fn with_capacity(timeframe: Timeframe, capacity: usize) -> Self {
        Self {
            timeframe,
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Timeframe of the stored bars.
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Append a bar newer than the current tail.
    ///
    /// Returns the bar evicted to make room, which `undo_push` needs to
    /// restore the previous contents exactly.
    pub fn push(&mut self, bar: Bar) -> Result<Option<Bar>, DataError> {
        if let Some(last) = self.bars.back() {
            if bar.timestamp <= last.timestamp {
                return Err(DataError::OutOfOrder {
                    last: last.timestamp,
                    got: bar.timestamp,
                });
            }
        }

        let evicted = if self.capacity > 0 && self.bars.len() >= self.capacity {
            self.bars.pop_front()
        } else {
            None
        };
        self.bars.push_back(bar);
        Ok(evicted)
    }

    /// Revert the most recent `push`.
    pub fn undo_push(&mut self, evicted: Option<Bar>) {
        self.bars.pop_back();
        if let Some(bar) = evicted {
            self.bars.push_front(bar);
        }
    }

    /// Discard all bars and load a new timeframe's history.
    ///
    /// Bars are sorted and deduplicated by timestamp; only the most recent
    /// `capacity` bars are kept.
    pub fn replace(&mut self, timeframe: Timeframe, mut bars: Vec<Bar>) {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        let skip = if self.capacity > 0 {
            bars.len().saturating_sub(self.capacity)
        } else {
            0
        };
        self.timeframe = timeframe;
        self.bars = bars.into_iter().skip(skip).collect();
    }

    /// Get the number of bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Check if the store is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Get the last bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Get a bar by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Extract close prices as a vector.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Lowest low in the store.
    pub fn lowest_low(&self) -> Option<f64> {
        self.bars.iter().map(|b| b.low).reduce(f64::min)
    }

    /// Get an iterator over the bars.
    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar::new(ts, close, close + 1.0, close - 1.0, close, 1000.0)
    }

    #[test]
    fn test_bar_validation() {
        assert!(bar(1, 100.0).validate().is_ok());

        let mut b = bar(1, 100.0);
        b.close = 0.0;
        assert!(b.validate().is_err());

        let mut b = bar(1, 100.0);
        b.high = f64::NAN;
        assert!(b.validate().is_err());

        let mut b = bar(1, 100.0);
        b.low = 200.0;
        assert!(matches!(b.validate(), Err(DataError::InvalidBar { .. })));
    }

    #[test]
    fn test_bar_store_capacity() {
        let mut store = BarStore::with_capacity(Timeframe::Minute1, 3);

        store.push(bar(1, 100.0)).unwrap();
        store.push(bar(2, 101.0)).unwrap();
        store.push(bar(3, 102.0)).unwrap();
        assert_eq!(store.len(), 3);

        // Should remove oldest when at capacity
        let evicted = store.push(bar(4, 103.0)).unwrap();
        assert_eq!(evicted.map(|b| b.timestamp), Some(1));
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(0).unwrap().timestamp, 2);
    }

    #[test]
    fn test_bar_store_rejects_out_of_order() {
        let mut store = BarStore::with_capacity(Timeframe::Minute1, 10);
        store.push(bar(2, 100.0)).unwrap();
        assert!(matches!(
            store.push(bar(2, 100.0)),
            Err(DataError::OutOfOrder { last: 2, got: 2 })
        ));
        assert!(store.push(bar(1, 100.0)).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_undo_push_restores_contents() {
        let mut store = BarStore::with_capacity(Timeframe::Minute1, 2);
        store.push(bar(1, 100.0)).unwrap();
        store.push(bar(2, 101.0)).unwrap();

        let evicted = store.push(bar(3, 102.0)).unwrap();
        store.undo_push(evicted);

        let stamps: Vec<i64> = store.iter().map(|b| b.timestamp).collect();
        assert_eq!(stamps, vec![1, 2]);
    }

    #[test]
    fn test_replace_keeps_most_recent() {
        let mut store = BarStore::with_capacity(Timeframe::Hour1, 2);
        store.push(bar(1, 100.0)).unwrap();

        store.replace(
            Timeframe::Minute5,
            vec![bar(30, 3.0), bar(10, 1.0), bar(20, 2.0), bar(20, 2.0)],
        );
        assert_eq!(store.timeframe(), Timeframe::Minute5);
        assert_eq!(store.closes(), vec![2.0, 3.0]);
        assert_eq!(store.lowest_low(), Some(1.0));
    }
}
