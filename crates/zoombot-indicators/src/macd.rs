//! MACD and the EMA family it is built from, maintained incrementally.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use zoombot_core::error::IndicatorError;
use zoombot_core::traits::Indicator;
use zoombot_core::types::Timeframe;

use crate::moving_average::Ema;

/// Indicator periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    /// Fast EMA period
    pub fast: usize,
    /// Slow EMA period
    pub slow: usize,
    /// Signal line period (EMA of MACD)
    pub signal: usize,
    /// Long trend EMA period
    pub long: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
            long: 100,
        }
    }
}

impl MacdParams {
    /// Check the periods.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        if self.fast == 0 || self.slow == 0 || self.signal == 0 || self.long == 0 {
            return Err(IndicatorError::InvalidParameter(
                "indicator periods must be greater than 0".into(),
            ));
        }
        if self.fast >= self.slow {
            return Err(IndicatorError::InvalidParameter(format!(
                "fast period ({}) must be less than slow period ({})",
                self.fast, self.slow
            )));
        }
        Ok(())
    }
}

/// One row of an [`IndicatorSet`], aligned with a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub fast: f64,
    pub slow: f64,
    pub long: f64,
    pub macd: f64,
    pub signal: f64,
}

/// Fast, slow and long EMAs plus MACD and its signal line for one timeframe.
///
/// All five sequences always have the same length and element `i` belongs
/// to the `i`-th bar of the matching bar store.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    timeframe: Timeframe,
    capacity: usize,
    fast_ema: Ema,
    slow_ema: Ema,
    long_ema: Ema,
    signal_ema: Ema,
    fast: VecDeque<f64>,
    slow: VecDeque<f64>,
    long: VecDeque<f64>,
    macd: VecDeque<f64>,
    signal: VecDeque<f64>,
}

impl IndicatorSet {
    /// Create an empty set. A capacity of 0 means unbounded.
    ///
    /// `params` must already be validated.
    pub fn new(timeframe: Timeframe, params: MacdParams, capacity: usize) -> Self {
        Self {
            timeframe,
            capacity,
            fast_ema: Ema::new(params.fast),
            slow_ema: Ema::new(params.slow),
            long_ema: Ema::new(params.long),
            signal_ema: Ema::new(params.signal),
            fast: VecDeque::new(),
            slow: VecDeque::new(),
            long: VecDeque::new(),
            macd: VecDeque::new(),
            signal: VecDeque::new(),
        }
    }

    /// Replace the contents with indicators computed over `closes`.
    ///
    /// The full window is used for the recursion, then only the most recent
    /// `capacity` points are kept.
    pub fn seed(&mut self, closes: &[f64]) {
        let fast = self.fast_ema.calculate(closes);
        let slow = self.slow_ema.calculate(closes);
        let long = self.long_ema.calculate(closes);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = self.signal_ema.calculate(&macd);

        let skip = if self.capacity > 0 {
            closes.len().saturating_sub(self.capacity)
        } else {
            0
        };
        self.fast = fast.into_iter().skip(skip).collect();
        self.slow = slow.into_iter().skip(skip).collect();
        self.long = long.into_iter().skip(skip).collect();
        self.macd = macd.into_iter().skip(skip).collect();
        self.signal = signal.into_iter().skip(skip).collect();
    }

    /// Append the indicators for one new close.
    ///
    /// Returns the point evicted to stay within capacity, which
    /// [`undo_update`](Self::undo_update) needs to restore the set exactly.
    pub fn update(&mut self, close: f64) -> Result<Option<IndicatorPoint>, IndicatorError> {
        let prev = self.last().ok_or(IndicatorError::Uninitialized(self.timeframe))?;

        let fast = self.fast_ema.step(prev.fast, close);
        let slow = self.slow_ema.step(prev.slow, close);
        let long = self.long_ema.step(prev.long, close);
        let macd = fast - slow;
        let signal = self.signal_ema.step(prev.signal, macd);

        let evicted = if self.capacity > 0 && self.len() >= self.capacity {
            self.pop_front()
        } else {
            None
        };

        self.fast.push_back(fast);
        self.slow.push_back(slow);
        self.long.push_back(long);
        self.macd.push_back(macd);
        self.signal.push_back(signal);

        Ok(evicted)
    }

    /// Revert the most recent [`update`](Self::update).
    pub fn undo_update(&mut self, evicted: Option<IndicatorPoint>) {
        self.fast.pop_back();
        self.slow.pop_back();
        self.long.pop_back();
        self.macd.pop_back();
        self.signal.pop_back();

        if let Some(p) = evicted {
            self.fast.push_front(p.fast);
            self.slow.push_front(p.slow);
            self.long.push_front(p.long);
            self.macd.push_front(p.macd);
            self.signal.push_front(p.signal);
        }
    }

    fn pop_front(&mut self) -> Option<IndicatorPoint> {
        Some(IndicatorPoint {
            fast: self.fast.pop_front()?,
            slow: self.slow.pop_front()?,
            long: self.long.pop_front()?,
            macd: self.macd.pop_front()?,
            signal: self.signal.pop_front()?,
        })
    }

    /// Point at `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<IndicatorPoint> {
        Some(IndicatorPoint {
            fast: *self.fast.get(index)?,
            slow: *self.slow.get(index)?,
            long: *self.long.get(index)?,
            macd: *self.macd.get(index)?,
            signal: *self.signal.get(index)?,
        })
    }

    /// Most recent point.
    pub fn last(&self) -> Option<IndicatorPoint> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    fn last_two(&self) -> Option<(IndicatorPoint, IndicatorPoint)> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        Some((self.get(n - 2)?, self.get(n - 1)?))
    }

    /// `macd[-1] - macd[-2]`, `None` with fewer than two points.
    pub fn macd_gradient(&self) -> Option<f64> {
        self.last_two().map(|(prev, last)| last.macd - prev.macd)
    }

    /// `signal[-1] - signal[-2]`, `None` with fewer than two points.
    pub fn signal_gradient(&self) -> Option<f64> {
        self.last_two().map(|(prev, last)| last.signal - prev.signal)
    }

    /// MACD crossed above its signal line on the latest point.
    pub fn macd_cross(&self) -> bool {
        self.last_two().map_or(false, |(prev, last)| {
            prev.macd < prev.signal && last.macd > last.signal
        })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.macd.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }

    pub fn fast(&self) -> &VecDeque<f64> {
        &self.fast
    }

    pub fn slow(&self) -> &VecDeque<f64> {
        &self.slow
    }

    pub fn long(&self) -> &VecDeque<f64> {
        &self.long
    }

    pub fn macd(&self) -> &VecDeque<f64> {
        &self.macd
    }

    pub fn signal(&self) -> &VecDeque<f64> {
        &self.signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.15).sin() * 8.0 + i as f64 * 0.02)
            .collect()
    }

    fn set(capacity: usize) -> IndicatorSet {
        IndicatorSet::new(Timeframe::Minute5, MacdParams::default(), capacity)
    }

    #[test]
    fn test_params_validation() {
        assert!(MacdParams::default().validate().is_ok());

        let inverted = MacdParams {
            fast: 26,
            slow: 12,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero = MacdParams {
            signal: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_update_before_seed_fails() {
        let mut s = set(0);
        let err = s.update(10.0).unwrap_err();
        assert!(matches!(err, IndicatorError::Uninitialized(Timeframe::Minute5)));

        s.seed(&[]);
        assert!(s.update(10.0).is_err());
    }

    #[test]
    fn test_seed_matches_incremental() {
        let data = wave(300);

        let mut batch = set(0);
        batch.seed(&data);

        let mut streamed = set(0);
        streamed.seed(&data[..1]);
        for &close in &data[1..] {
            streamed.update(close).unwrap();
        }

        assert_eq!(batch.len(), data.len());
        assert_eq!(streamed.len(), data.len());
        for i in 0..data.len() {
            assert_eq!(batch.get(i), streamed.get(i), "mismatch at {i}");
        }
    }

    #[test]
    fn test_sequences_stay_aligned() {
        let data = wave(50);
        let mut s = set(20);
        s.seed(&data[..30]);
        assert_eq!(s.len(), 20);

        for &close in &data[30..] {
            s.update(close).unwrap();
            assert_eq!(s.len(), 20);
            assert_eq!(s.fast().len(), s.signal().len());
            assert_eq!(s.slow().len(), s.long().len());
        }
    }

    #[test]
    fn test_capacity_keeps_most_recent() {
        let data = wave(120);
        let mut full = set(0);
        full.seed(&data);

        let mut bounded = set(40);
        bounded.seed(&data);

        assert_eq!(bounded.len(), 40);
        assert_eq!(bounded.last(), full.last());
        assert_eq!(bounded.get(0), full.get(80));
    }

    #[test]
    fn test_undo_update_restores_exactly() {
        let data = wave(40);
        let mut s = set(30);
        s.seed(&data[..30]);
        let before = s.clone();

        let evicted = s.update(data[30]).unwrap();
        assert!(evicted.is_some());
        s.undo_update(evicted);

        assert_eq!(s.len(), before.len());
        for i in 0..s.len() {
            assert_eq!(s.get(i), before.get(i));
        }
    }

    #[test]
    fn test_gradients_need_two_points() {
        let mut s = set(0);
        s.seed(&[10.0]);
        assert_eq!(s.macd_gradient(), None);
        assert_eq!(s.signal_gradient(), None);
        assert!(!s.macd_cross());

        s.update(12.0).unwrap();
        let grad = s.macd_gradient().unwrap();
        let macd = s.macd();
        assert_eq!(grad, macd[1] - macd[0]);
        assert!(grad > 0.0);
        assert!(s.signal_gradient().unwrap() > 0.0);
    }

    #[test]
    fn test_cross_after_dip_trough() {
        // Flat, one dip, then recovery: the cross lands on the recovery bar
        let mut closes = vec![10.0; 40];
        closes.push(9.0);
        closes.push(11.0);

        let mut s = set(0);
        s.seed(&closes[..1]);
        let mut crosses = Vec::new();
        for (i, &close) in closes.iter().enumerate().skip(1) {
            s.update(close).unwrap();
            if s.macd_cross() {
                crosses.push(i);
            }
        }

        assert_eq!(crosses, vec![41]);
    }

    #[test]
    fn test_single_crossover_detected_once() {
        // Falling then steadily rising prices: macd - signal turns positive once
        let closes: Vec<f64> = (0..60)
            .map(|i| if i < 30 { 100.0 - i as f64 } else { 70.0 + (i - 30) as f64 * 2.0 })
            .collect();

        let mut s = set(0);
        s.seed(&closes[..1]);
        let mut count = 0;
        for &close in &closes[1..] {
            s.update(close).unwrap();
            if s.macd_cross() {
                count += 1;
            }
        }

        assert_eq!(count, 1);
    }
}
