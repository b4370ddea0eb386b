//! Indicator sets keyed by timeframe.

use std::collections::HashMap;
use tracing::debug;
use zoombot_core::error::IndicatorError;
use zoombot_core::types::Timeframe;

use crate::macd::{IndicatorPoint, IndicatorSet, MacdParams};

/// Owns the indicator set of the active timeframe.
///
/// Bootstrapping a timeframe discards every other set: data from a previous
/// timeframe is never merged into the new one.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    params: MacdParams,
    capacity: usize,
    sets: HashMap<Timeframe, IndicatorSet>,
}

impl IndicatorEngine {
    /// Create an engine with validated periods.
    pub fn new(params: MacdParams, capacity: usize) -> Result<Self, IndicatorError> {
        params.validate()?;
        Ok(Self {
            params,
            capacity,
            sets: HashMap::new(),
        })
    }

    pub fn params(&self) -> &MacdParams {
        &self.params
    }

    /// Seed `timeframe` from its full history of closes.
    pub fn bootstrap(&mut self, timeframe: Timeframe, closes: &[f64]) -> &IndicatorSet {
        let mut set = IndicatorSet::new(timeframe, self.params, self.capacity);
        set.seed(closes);
        debug!(%timeframe, bars = closes.len(), kept = set.len(), "indicators bootstrapped");

        self.sets.clear();
        self.sets.entry(timeframe).or_insert(set)
    }

    /// Append one close to the set for `timeframe`.
    pub fn update(
        &mut self,
        timeframe: Timeframe,
        close: f64,
    ) -> Result<Option<IndicatorPoint>, IndicatorError> {
        self.sets
            .get_mut(&timeframe)
            .ok_or(IndicatorError::Uninitialized(timeframe))?
            .update(close)
    }

    /// Revert the last `update` for `timeframe`.
    pub fn undo_update(&mut self, timeframe: Timeframe, evicted: Option<IndicatorPoint>) {
        if let Some(set) = self.sets.get_mut(&timeframe) {
            set.undo_update(evicted);
        }
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&IndicatorSet> {
        self.sets.get(&timeframe)
    }

    /// Timeframes currently holding indicators.
    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.sets.keys().copied()
    }
}
