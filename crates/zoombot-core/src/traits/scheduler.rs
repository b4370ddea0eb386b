//! Tick scheduling trait.

use crate::types::Timeframe;
use async_trait::async_trait;

/// Periodic timer that drives `tick()` once per timeframe boundary.
///
/// At most one timer may be active: `start` replaces any running timer and
/// `stop` must have fully halted the previous one before returning, so no
/// tick for a stale timeframe can be delivered afterwards.
#[async_trait]
pub trait TickScheduler: Send {
    /// Begin emitting ticks at the cadence of `timeframe`.
    async fn start(&mut self, timeframe: Timeframe);

    /// Halt the active timer, if any.
    async fn stop(&mut self);

    /// Whether a timer is currently active.
    fn is_running(&self) -> bool;
}
