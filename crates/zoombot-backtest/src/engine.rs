//! Backtesting engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zoombot_broker::{FillMode, SimulatedExchange};
use zoombot_core::error::{DataError, TradingError, TradingResult};
use zoombot_core::types::{Bar, Timeframe};
use zoombot_core::RetryPolicy;
use zoombot_strategy::{TickAction, ZoomConfig, ZoomStrategy};

use crate::report::BacktestReport;
use crate::scheduler::ReplayScheduler;
use crate::statistics::BacktestStats;

/// Backtest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting balance in the primary asset
    pub initial_capital: Decimal,
    /// Price used for market order fills
    pub fill_mode: FillMode,
    /// Seed for [`FillMode::Random`]
    pub seed: u64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(1000),
            fill_mode: FillMode::Close,
            seed: 0,
        }
    }
}

/// Backtesting engine.
///
/// Drives the live strategy against a [`SimulatedExchange`]: the replay
/// clock jumps from one boundary of the active timeframe to the next and the
/// strategy ticks once per boundary.
pub struct BacktestEngine {
    config: BacktestConfig,
    strategy: ZoomConfig,
}

impl BacktestEngine {
    /// Create a new backtest engine.
    ///
    /// Bars are never late in a replay, so the retry policy is replaced by a
    /// single attempt.
    pub fn new(config: BacktestConfig, mut strategy: ZoomConfig) -> Self {
        strategy.retry = RetryPolicy::immediate();
        Self { config, strategy }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay `data` from `start` (Unix ms) until `end`, or until the last
    /// loaded bar closes when `end` is `None`.
    ///
    /// Bars before `start` serve as bootstrap history. Reaching the edge of
    /// the hierarchy ends the replay early and is reported as a halt.
    pub async fn run(
        &self,
        data: HashMap<Timeframe, Vec<Bar>>,
        start: i64,
        end: Option<i64>,
    ) -> TradingResult<BacktestReport> {
        let exchange = Arc::new(SimulatedExchange::new(
            self.strategy.pair.clone(),
            data,
            self.config.initial_capital,
            self.config.fill_mode,
            self.config.seed,
            start,
        )?);
        let end = match end.or_else(|| exchange.last_timestamp()) {
            Some(end) => end,
            None => return Err(DataError::NoDataAvailable.into()),
        };

        let mut strategy = ZoomStrategy::new(
            self.strategy.clone(),
            exchange.clone(),
            ReplayScheduler::default(),
        )?;
        strategy.start(start).await?;

        info!(
            pair = %self.strategy.pair,
            start,
            end,
            timeframe = %self.strategy.start_timeframe,
            fill_mode = %self.config.fill_mode,
            "backtest started"
        );

        let mut stats = BacktestStats::new(self.config.initial_capital);
        stats.record_equity(start, self.config.initial_capital);
        let mut halted = false;

        while let Some(timeframe) = strategy.scheduler().active() {
            let next = timeframe.next_boundary(exchange.now());
            if next > end {
                break;
            }
            exchange.advance_to(next);

            match strategy.tick().await {
                Ok(report) => {
                    stats.bars_processed += 1;
                    if !matches!(report.action, TickAction::Hold) {
                        debug!(
                            timestamp = report.bar.timestamp,
                            %timeframe,
                            action = ?report.action,
                            phase = %report.phase,
                            "replay tick"
                        );
                    }
                }
                Err(TradingError::Timeframe(e)) => {
                    warn!(%timeframe, timestamp = next, error = %e, "strategy halted");
                    halted = true;
                    break;
                }
                Err(e) if e.is_retryable() => {
                    stats.ticks_skipped += 1;
                    debug!(%timeframe, timestamp = next, error = %e, "tick skipped");
                }
                Err(e) => {
                    strategy.shutdown().await;
                    return Err(e);
                }
            }

            if let Some(mark) = exchange.mark_price() {
                stats.record_equity(next, exchange.balances().value_at(mark));
            }
        }

        strategy.shutdown().await;

        let final_balances = exchange.balances();
        let final_equity = exchange
            .mark_price()
            .map_or(final_balances.primary, |mark| final_balances.value_at(mark));
        stats.finalize(final_equity, strategy.history());

        info!(
            ticks = stats.bars_processed,
            skipped = stats.ticks_skipped,
            round_trips = stats.round_trips,
            %final_equity,
            halted,
            "backtest finished"
        );

        Ok(BacktestReport {
            config: self.config.clone(),
            stats,
            trades: strategy.history().to_vec(),
            final_balances,
            final_state: strategy.current_state(),
            halted,
        })
    }
}
