//! Scheduler for replays: remembers the cadence, never waits.

use async_trait::async_trait;
use zoombot_core::traits::TickScheduler;
use zoombot_core::types::Timeframe;

/// [`TickScheduler`] driven by the replay loop instead of a clock.
///
/// The loop reads [`active`](Self::active) to decide how far to advance the
/// simulated clock before the next tick.
#[derive(Debug, Default)]
pub struct ReplayScheduler {
    active: Option<Timeframe>,
    starts: usize,
}

impl ReplayScheduler {
    pub fn active(&self) -> Option<Timeframe> {
        self.active
    }

    /// Number of `start` calls, i.e. timeframe selections.
    pub fn starts(&self) -> usize {
        self.starts
    }
}

#[async_trait]
impl TickScheduler for ReplayScheduler {
    async fn start(&mut self, timeframe: Timeframe) {
        self.active = Some(timeframe);
        self.starts += 1;
    }

    async fn stop(&mut self) {
        self.active = None;
    }

    fn is_running(&self) -> bool {
        self.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracks_active_timeframe() {
        let mut scheduler = ReplayScheduler::default();
        assert!(!scheduler.is_running());

        scheduler.start(Timeframe::Hour1).await;
        scheduler.stop().await;
        scheduler.start(Timeframe::Minute5).await;

        assert_eq!(scheduler.active(), Some(Timeframe::Minute5));
        assert_eq!(scheduler.starts(), 2);

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }
}
