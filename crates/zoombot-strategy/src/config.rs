//! Zoom strategy configuration.

use rust_decimal::Decimal;
use zoombot_core::error::StrategyError;
use zoombot_core::traits::StrategyConfig;
use zoombot_core::types::{Timeframe, TimeframeHierarchy, TradingPair};
use zoombot_core::RetryPolicy;
use zoombot_indicators::MacdParams;

/// Largest history window a timeframe switch may request.
pub const MAX_HISTORY_BARS: usize = 1_000_000;

/// Configuration for the zoom strategy.
#[derive(Debug, Clone)]
pub struct ZoomConfig {
    /// Pair to trade
    pub pair: TradingPair,
    /// Timeframe watched while flat after a (re)start
    pub start_timeframe: Timeframe,
    /// Ordered timeframes the strategy may zoom through
    pub hierarchy: TimeframeHierarchy,
    /// Indicator periods
    pub params: MacdParams,
    /// Fraction of the primary balance spent on a buy, in (0, 1]
    pub buy_rate: Decimal,
    /// Non-positive MACD gradients tolerated before selling
    pub tolerance: u32,
    /// Bars of history loaded when a timeframe is (re)selected
    pub history_bars: usize,
    /// Bars and indicator points kept per timeframe (0 = unbounded)
    pub bar_capacity: usize,
    /// Polling budget for the most recently completed bar
    pub retry: RetryPolicy,
}

impl ZoomConfig {
    pub fn new(pair: TradingPair, start_timeframe: Timeframe) -> Self {
        Self {
            pair,
            start_timeframe,
            hierarchy: TimeframeHierarchy::default(),
            params: MacdParams::default(),
            buy_rate: Decimal::ONE,
            tolerance: 2,
            history_bars: 1440,
            bar_capacity: 2000,
            retry: RetryPolicy::default(),
        }
    }
}

impl StrategyConfig for ZoomConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        self.params
            .validate()
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;

        if !self.hierarchy.contains(self.start_timeframe) {
            return Err(StrategyError::InvalidConfig(format!(
                "start timeframe {} is not part of the hierarchy",
                self.start_timeframe
            )));
        }
        if self.buy_rate <= Decimal::ZERO || self.buy_rate > Decimal::ONE {
            return Err(StrategyError::InvalidConfig(format!(
                "buy rate must be in (0, 1], got {}",
                self.buy_rate
            )));
        }
        if self.history_bars < 2 {
            return Err(StrategyError::InvalidConfig(
                "at least 2 history bars are required".into(),
            ));
        }
        if self.history_bars > MAX_HISTORY_BARS {
            return Err(StrategyError::InvalidConfig(format!(
                "history bars must not exceed {MAX_HISTORY_BARS}, got {}",
                self.history_bars
            )));
        }
        if self.bar_capacity != 0 && self.bar_capacity < 2 {
            return Err(StrategyError::InvalidConfig(
                "bar capacity must be 0 (unbounded) or at least 2".into(),
            ));
        }
        if self.pair.primary.is_empty() || self.pair.secondary.is_empty() {
            return Err(StrategyError::InvalidConfig("pair assets must be set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> ZoomConfig {
        ZoomConfig::new(TradingPair::new("AUD", "BTC"), Timeframe::Hour1)
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_start_timeframe_outside_hierarchy() {
        let mut c = config();
        c.start_timeframe = Timeframe::Minute15;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_buy_rate_bounds() {
        let mut c = config();
        c.buy_rate = dec!(0);
        assert!(c.validate().is_err());
        c.buy_rate = dec!(1.5);
        assert!(c.validate().is_err());
        c.buy_rate = dec!(0.25);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_invalid_periods() {
        let mut c = config();
        c.params.fast = 40;
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("fast period"));
    }

    #[test]
    fn test_history_and_capacity() {
        let mut c = config();
        c.history_bars = 1;
        assert!(c.validate().is_err());
        c.history_bars = usize::MAX;
        assert!(c.validate().is_err());
        c.history_bars = MAX_HISTORY_BARS;
        assert!(c.validate().is_ok());

        let mut c = config();
        c.bar_capacity = 1;
        assert!(c.validate().is_err());
        c.bar_capacity = 0;
        assert!(c.validate().is_ok());
    }
}
