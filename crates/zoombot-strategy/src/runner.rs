//! Live event loop: boundary ticks in, strategy ticks out.

use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use zoombot_core::error::TradingResult;
use zoombot_core::traits::Exchange;

use crate::machine::ZoomStrategy;
use crate::timer::{BoundaryTimer, Tick};

/// Feeds [`Tick`]s from a [`BoundaryTimer`] into a started strategy, one at
/// a time.
pub struct LiveRunner<E: Exchange + ?Sized> {
    strategy: ZoomStrategy<E, BoundaryTimer>,
    ticks: mpsc::Receiver<Tick>,
}

impl<E: Exchange + ?Sized> LiveRunner<E> {
    pub fn new(strategy: ZoomStrategy<E, BoundaryTimer>, ticks: mpsc::Receiver<Tick>) -> Self {
        Self { strategy, ticks }
    }

    pub fn strategy(&self) -> &ZoomStrategy<E, BoundaryTimer> {
        &self.strategy
    }

    /// Process ticks until `shutdown` resolves, the strategy halts or a
    /// non-retryable error occurs.
    ///
    /// Ticks issued before the latest timeframe switch are discarded.
    pub async fn run<F>(&mut self, shutdown: F) -> TradingResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                tick = self.ticks.recv() => {
                    let Some(tick) = tick else {
                        warn!("tick channel closed");
                        break;
                    };

                    let current = self.strategy.scheduler().generation();
                    if tick.generation != current {
                        debug!(
                            timeframe = %tick.timeframe,
                            generation = tick.generation,
                            current,
                            "discarding stale tick"
                        );
                        continue;
                    }

                    match self.strategy.tick().await {
                        Ok(report) => {
                            info!(
                                timeframe = %report.timeframe,
                                due = %tick.due,
                                close = report.bar.close,
                                phase = %report.phase,
                                action = ?report.action,
                                "tick processed"
                            );
                        }
                        Err(e) if e.is_retryable() => {
                            warn!(timeframe = %tick.timeframe, error = %e, "tick failed, waiting for next boundary");
                        }
                        Err(e) => {
                            error!(timeframe = %tick.timeframe, error = %e, "tick failed, stopping");
                            self.strategy.shutdown().await;
                            return Err(e);
                        }
                    }

                    if !self.strategy.current_state().running {
                        break;
                    }
                }
            }
        }

        self.strategy.shutdown().await;
        Ok(())
    }
}
