//! Trading state owned by the zoom state machine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use zoombot_core::types::{OrderHandle, Timeframe};

/// Position lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No position, watching the coarse timeframe
    Flat,
    /// Watching a finer timeframe for an entry
    Zoomed,
    /// Holding a position, watching for an exit
    Bought,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Flat => write!(f, "FLAT"),
            Phase::Zoomed => write!(f, "ZOOMED"),
            Phase::Bought => write!(f, "BOUGHT"),
        }
    }
}

/// Stop-loss protecting an open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingStop {
    pub handle: OrderHandle,
    /// Trigger price in primary per secondary
    pub trigger: Decimal,
    /// Secondary asset the stop sells
    pub amount: Decimal,
}

/// Snapshot of the state machine.
///
/// Invariants, upheld by the transition methods:
/// - bought implies zoomed
/// - `pending_stop_loss` is only set while bought
/// - `swing_low` never rises while bought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingState {
    /// Timeframe whose bars drive the next tick
    pub timeframe: Timeframe,
    pub phase: Phase,
    pub running: bool,
    /// Lowest low observed since the last reset
    pub swing_low: f64,
    /// Remaining non-positive MACD gradients before an exit
    pub tolerance_remaining: i32,
    pub pending_stop_loss: Option<PendingStop>,
    /// Secondary asset held (zero while not bought)
    pub position_size: Decimal,
}

impl TradingState {
    /// Fresh flat state on `timeframe`.
    pub fn flat(timeframe: Timeframe, swing_low: f64, tolerance: u32) -> Self {
        Self {
            timeframe,
            phase: Phase::Flat,
            running: false,
            swing_low,
            tolerance_remaining: tolerance_budget(tolerance),
            pending_stop_loss: None,
            position_size: Decimal::ZERO,
        }
    }

    pub fn zoomed(&self) -> bool {
        matches!(self.phase, Phase::Zoomed | Phase::Bought)
    }

    pub fn bought(&self) -> bool {
        self.phase == Phase::Bought
    }

    /// Lower the swing low to `low` if it is a new extreme.
    pub fn observe_low(&mut self, low: f64) {
        if low < self.swing_low {
            self.swing_low = low;
        }
    }

    /// Whether `low` reaches the protective level of an open position.
    pub fn stop_touched(&self, low: f64, trigger: f64) -> bool {
        low <= self.swing_low.max(trigger)
    }

    pub(crate) fn zoom_in(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
        self.phase = Phase::Zoomed;
    }

    pub(crate) fn enter(&mut self, size: Decimal, stop: Option<PendingStop>, tolerance: u32) {
        self.phase = Phase::Bought;
        self.position_size = size;
        self.pending_stop_loss = stop;
        self.tolerance_remaining = tolerance_budget(tolerance);
    }

    /// Close the position and zoom out to `timeframe`.
    pub(crate) fn exit(&mut self, timeframe: Timeframe, tolerance: u32) {
        self.timeframe = timeframe;
        self.phase = Phase::Flat;
        self.position_size = Decimal::ZERO;
        self.pending_stop_loss = None;
        self.tolerance_remaining = tolerance_budget(tolerance);
    }

    pub(crate) fn reset_tolerance(&mut self, tolerance: u32) {
        self.tolerance_remaining = tolerance_budget(tolerance);
    }
}

fn tolerance_budget(tolerance: u32) -> i32 {
    i32::try_from(tolerance).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_phase_flags() {
        let mut state = TradingState::flat(Timeframe::Hour1, 9.5, 2);
        assert!(!state.zoomed());
        assert!(!state.bought());

        state.zoom_in(Timeframe::Minute5);
        assert!(state.zoomed());
        assert!(!state.bought());

        state.enter(dec!(0.5), None, 2);
        assert!(state.zoomed());
        assert!(state.bought());
        assert_eq!(state.position_size, dec!(0.5));
    }

    #[test]
    fn test_exit_clears_position() {
        let mut state = TradingState::flat(Timeframe::Hour1, 9.5, 2);
        state.zoom_in(Timeframe::Minute5);
        let stop = PendingStop {
            handle: OrderHandle("000000000001".into()),
            trigger: dec!(9.5),
            amount: dec!(0.5),
        };
        state.enter(dec!(0.5), Some(stop), 2);
        state.tolerance_remaining = -1;

        state.exit(Timeframe::Hour1, 2);
        assert_eq!(state.phase, Phase::Flat);
        assert_eq!(state.timeframe, Timeframe::Hour1);
        assert!(state.pending_stop_loss.is_none());
        assert_eq!(state.position_size, Decimal::ZERO);
        assert_eq!(state.tolerance_remaining, 2);
    }

    #[test]
    fn test_swing_low_only_falls() {
        let mut state = TradingState::flat(Timeframe::Hour1, 9.5, 2);
        state.observe_low(9.8);
        assert_eq!(state.swing_low, 9.5);
        state.observe_low(9.1);
        assert_eq!(state.swing_low, 9.1);
    }

    #[test]
    fn test_stop_touched() {
        let state = TradingState::flat(Timeframe::Hour1, 9.0, 2);
        assert!(state.stop_touched(9.0, 8.5));
        assert!(state.stop_touched(9.2, 9.3));
        assert!(!state.stop_touched(9.2, 8.5));
    }

    #[test]
    fn test_state_serializes() {
        let state = TradingState::flat(Timeframe::Minute5, 10.0, 3);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"phase\":\"flat\""));
        assert!(json.contains("\"timeframe\":\"5m\""));
    }
}
