//! Wall-clock timer emitting one tick per timeframe boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};
use zoombot_core::traits::TickScheduler;
use zoombot_core::types::Timeframe;

/// Request to process the bar that closed at `due`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub timeframe: Timeframe,
    /// Incremented on every `start`; ticks from an older generation are stale
    pub generation: u64,
    /// Boundary the tick was scheduled for
    pub due: DateTime<Utc>,
}

/// [`TickScheduler`] backed by a tokio task.
///
/// The task sleeps until the next boundary of the timeframe plus a
/// publication delay, then sends a [`Tick`] every timeframe period. Only one
/// task is alive at a time; `stop` aborts it and waits for it to finish.
#[derive(Debug)]
pub struct BoundaryTimer {
    tx: mpsc::Sender<Tick>,
    delay: Duration,
    generation: u64,
    active: Option<Timeframe>,
    task: Option<JoinHandle<()>>,
}

impl BoundaryTimer {
    /// Create a timer and the receiving end of its ticks.
    pub fn new(delay: Duration, buffer: usize) -> (Self, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::with_sender(tx, delay), rx)
    }

    /// Create a timer that sends into an existing channel.
    pub fn with_sender(tx: mpsc::Sender<Tick>, delay: Duration) -> Self {
        Self {
            tx,
            delay,
            generation: 0,
            active: None,
            task: None,
        }
    }

    /// Generation of the most recent `start`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active(&self) -> Option<Timeframe> {
        self.active
    }
}

#[async_trait]
impl TickScheduler for BoundaryTimer {
    async fn start(&mut self, timeframe: Timeframe) {
        self.stop().await;
        self.generation += 1;

        let generation = self.generation;
        let tx = self.tx.clone();
        let delay = self.delay;

        self.task = Some(tokio::spawn(async move {
            let now = Utc::now().timestamp_millis();
            let until_boundary = (timeframe.next_boundary(now) - now).max(0) as u64;
            let first = Instant::now() + Duration::from_millis(until_boundary) + delay;

            let mut interval = tokio::time::interval_at(first, timeframe.duration());
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let boundary = timeframe.align(Utc::now().timestamp_millis() - delay.as_millis() as i64);
                let tick = Tick {
                    timeframe,
                    generation,
                    due: DateTime::from_timestamp_millis(boundary).unwrap_or(DateTime::UNIX_EPOCH),
                };
                trace!(%timeframe, generation, due = %tick.due, "tick");
                if tx.send(tick).await.is_err() {
                    break;
                }
            }
        }));
        self.active = Some(timeframe);
        debug!(%timeframe, generation, "boundary timer started");
    }

    async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            debug!(timeframe = ?self.active, generation = self.generation, "boundary timer stopped");
        }
        self.active = None;
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for BoundaryTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
