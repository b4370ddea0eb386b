//! Backtest statistics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zoombot_core::types::{TradeKind, TradeRecord};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A buy and the exit that closed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry: TradeRecord,
    pub exit: TradeRecord,
    /// Primary asset received minus primary asset spent
    pub pnl: Decimal,
}

/// Backtest statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStats {
    /// Initial capital in the primary asset
    pub initial_capital: Decimal,
    /// Final equity in the primary asset
    pub final_equity: Decimal,
    /// Total return percentage
    pub total_return_pct: Decimal,
    /// Maximum drawdown percentage
    pub max_drawdown_pct: Decimal,
    /// Completed buy/exit pairs
    pub round_trips: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Exits through the stop-loss
    pub stopped_out: usize,
    /// Win rate percentage
    pub win_rate_pct: Decimal,
    /// Average profit per winning trade
    pub avg_win: Decimal,
    /// Average loss per losing trade
    pub avg_loss: Decimal,
    /// Profit factor (gross profit / gross loss)
    pub profit_factor: Decimal,
    /// Ticks that committed
    pub bars_processed: usize,
    /// Ticks skipped because the bar was missing or an order did not fill
    pub ticks_skipped: usize,
    /// Equity curve as (timestamp ms, equity)
    pub equity_curve: Vec<(i64, Decimal)>,
    pub trips: Vec<RoundTrip>,
    /// Peak equity (for drawdown)
    peak_equity: Decimal,
}

impl BacktestStats {
    /// Create new stats tracker.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            final_equity: initial_capital,
            total_return_pct: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            round_trips: 0,
            winning_trades: 0,
            losing_trades: 0,
            stopped_out: 0,
            win_rate_pct: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            bars_processed: 0,
            ticks_skipped: 0,
            equity_curve: Vec::new(),
            trips: Vec::new(),
            peak_equity: initial_capital,
        }
    }

    /// Record equity at a timestamp.
    pub fn record_equity(&mut self, timestamp: i64, equity: Decimal) {
        self.equity_curve.push((timestamp, equity));

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * HUNDRED;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }

    /// Calculate final statistics from the executed orders.
    ///
    /// A buy still open at the end counts towards equity only.
    pub fn finalize(&mut self, final_equity: Decimal, history: &[TradeRecord]) {
        self.final_equity = final_equity;
        if self.initial_capital > Decimal::ZERO {
            self.total_return_pct =
                (self.final_equity - self.initial_capital) / self.initial_capital * HUNDRED;
        }

        self.trips = pair_round_trips(history);
        self.round_trips = self.trips.len();
        self.stopped_out = self
            .trips
            .iter()
            .filter(|t| t.exit.kind == TradeKind::StopLoss)
            .count();

        let mut total_profit = Decimal::ZERO;
        let mut total_loss = Decimal::ZERO;
        for trip in &self.trips {
            if trip.pnl > Decimal::ZERO {
                self.winning_trades += 1;
                total_profit += trip.pnl;
            } else if trip.pnl < Decimal::ZERO {
                self.losing_trades += 1;
                total_loss += trip.pnl.abs();
            }
        }

        if self.round_trips > 0 {
            self.win_rate_pct =
                Decimal::from(self.winning_trades * 100) / Decimal::from(self.round_trips);
        }
        if self.winning_trades > 0 {
            self.avg_win = total_profit / Decimal::from(self.winning_trades);
        }
        if self.losing_trades > 0 {
            self.avg_loss = total_loss / Decimal::from(self.losing_trades);
        }
        if total_loss > Decimal::ZERO {
            self.profit_factor = total_profit / total_loss;
        }
    }
}

/// Match each buy with the next exit.
fn pair_round_trips(history: &[TradeRecord]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<&TradeRecord> = None;

    for record in history {
        match (record.kind, open) {
            (TradeKind::Buy, _) => open = Some(record),
            (_, Some(entry)) => {
                trips.push(RoundTrip {
                    entry: entry.clone(),
                    exit: record.clone(),
                    pnl: record.total - entry.total,
                });
                open = None;
            }
            (_, None) => {}
        }
    }
    trips
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use zoombot_core::types::{OrderHandle, Timeframe};

    fn record(kind: TradeKind, total: Decimal) -> TradeRecord {
        TradeRecord {
            handle: OrderHandle("000000000001".into()),
            kind,
            timeframe: Timeframe::Minute5,
            timestamp: 0,
            rate: dec!(10),
            amount: total / dec!(10),
            total,
        }
    }

    #[test]
    fn test_drawdown_tracks_peak() {
        let mut stats = BacktestStats::new(dec!(1000));
        stats.record_equity(0, dec!(1000));
        stats.record_equity(1, dec!(1200));
        stats.record_equity(2, dec!(900));
        stats.record_equity(3, dec!(1300));

        assert_eq!(stats.max_drawdown_pct, dec!(25));
        assert_eq!(stats.equity_curve.len(), 4);
    }

    #[test]
    fn test_round_trip_statistics() {
        let history = vec![
            record(TradeKind::Buy, dec!(1000)),
            record(TradeKind::Sell, dec!(1100)),
            record(TradeKind::Buy, dec!(1100)),
            record(TradeKind::StopLoss, dec!(1050)),
            record(TradeKind::Buy, dec!(1050)),
        ];

        let mut stats = BacktestStats::new(dec!(1000));
        stats.finalize(dec!(1080), &history);

        assert_eq!(stats.total_return_pct, dec!(8));
        assert_eq!(stats.round_trips, 2);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.stopped_out, 1);
        assert_eq!(stats.win_rate_pct, dec!(50));
        assert_eq!(stats.avg_win, dec!(100));
        assert_eq!(stats.avg_loss, dec!(50));
        assert_eq!(stats.profit_factor, dec!(2));
        assert_eq!(stats.trips[1].pnl, dec!(-50));
    }

    #[test]
    fn test_no_trades() {
        let mut stats = BacktestStats::new(dec!(1000));
        stats.finalize(dec!(1000), &[]);
        assert_eq!(stats.round_trips, 0);
        assert_eq!(stats.win_rate_pct, Decimal::ZERO);
        assert_eq!(stats.profit_factor, Decimal::ZERO);
    }
}
