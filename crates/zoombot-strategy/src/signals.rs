//! Entry and exit conditions evaluated on the active timeframe.

use zoombot_core::types::Bar;
use zoombot_indicators::IndicatorSet;

/// Long-term trend is at or below the bar's low and MACD has just crossed
/// above its signal line.
pub fn macro_buy_signal(indicators: &IndicatorSet, bar: &Bar) -> bool {
    let above_trend = indicators
        .last()
        .map_or(false, |point| point.long <= bar.low);
    above_trend && indicators.macd_cross()
}

/// Momentum is not increasing. `None` until two points exist.
pub fn momentum_fading(indicators: &IndicatorSet) -> Option<bool> {
    indicators.macd_gradient().map(|g| g <= 0.0)
}
