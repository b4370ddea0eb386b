//! Bounded retry for bars the exchange has not published yet.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::DataError;
use crate::traits::MarketData;
use crate::types::{Bar, Timeframe, TradingPair};

/// Exponential backoff with a fixed attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound for a single wait
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no waiting. Used by the backtest replayer.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Wait before attempt number `attempt` (1-based, so attempt 2 waits
    /// `initial_backoff`).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(2).min(16);
        self.initial_backoff
            .saturating_mul(1 << doublings)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Poll for the most recently completed bar, newer than `after` when given.
///
/// Connection errors and not-yet-published bars are retried until the
/// policy's budget is spent, then surfaced as [`DataError::DataUnavailable`].
/// The returned bar has passed [`Bar::validate`].
pub async fn fetch_completed_bar<M>(
    market: &M,
    pair: &TradingPair,
    timeframe: Timeframe,
    after: Option<i64>,
    policy: &RetryPolicy,
) -> Result<Bar, DataError>
where
    M: MarketData + ?Sized,
{
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        if attempt > 1 {
            let wait = policy.backoff(attempt);
            debug!(%pair, %timeframe, attempt, wait_ms = wait.as_millis() as u64, "waiting for completed bar");
            tokio::time::sleep(wait).await;
        }

        match market.latest_bar(pair, timeframe).await {
            Ok(Some(bar)) if after.map_or(true, |last| bar.timestamp > last) => {
                bar.validate()?;
                return Ok(bar);
            }
            Ok(_) => {}
            Err(DataError::ConnectionError(reason)) => {
                warn!(%pair, %timeframe, attempt, %reason, "bar fetch failed");
            }
            Err(e) => return Err(e),
        }
    }

    Err(DataError::DataUnavailable {
        pair: pair.to_string(),
        timeframe,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Publishes its bar only after `delay` polls.
    struct SlowFeed {
        polls: AtomicU32,
        delay: u32,
        bar: Bar,
    }

    #[async_trait]
    impl MarketData for SlowFeed {
        async fn latest_bar(
            &self,
            _pair: &TradingPair,
            _timeframe: Timeframe,
        ) -> Result<Option<Bar>, DataError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.delay {
                Ok(None)
            } else {
                Ok(Some(self.bar))
            }
        }

        async fn history(
            &self,
            _pair: &TradingPair,
            _timeframe: Timeframe,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<Bar>, DataError> {
            Ok(vec![])
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn feed(delay: u32, bar: Bar) -> SlowFeed {
        SlowFeed {
            polls: AtomicU32::new(0),
            delay,
            bar,
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(400),
        }
    }

    #[test]
    fn test_backoff_growth() {
        let p = policy(10);
        assert_eq!(p.backoff(2), Duration::from_millis(100));
        assert_eq!(p.backoff(3), Duration::from_millis(200));
        assert_eq!(p.backoff(4), Duration::from_millis(400));
        assert_eq!(p.backoff(9), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_published() {
        let bar = Bar::new(60_000, 10.0, 11.0, 9.0, 10.5, 0.0);
        let market = feed(2, bar);
        let pair = TradingPair::new("AUD", "BTC");

        let got = fetch_completed_bar(&market, &pair, Timeframe::Minute1, Some(0), &policy(5))
            .await
            .unwrap();
        assert_eq!(got, bar);
        assert_eq!(market.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted() {
        let bar = Bar::new(60_000, 10.0, 11.0, 9.0, 10.5, 0.0);
        let market = feed(100, bar);
        let pair = TradingPair::new("AUD", "BTC");

        let err = fetch_completed_bar(&market, &pair, Timeframe::Minute1, None, &policy(3))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::DataUnavailable { attempts: 3, .. }));
        assert_eq!(market.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stale_bar_is_not_returned() {
        let bar = Bar::new(60_000, 10.0, 11.0, 9.0, 10.5, 0.0);
        let market = feed(0, bar);
        let pair = TradingPair::new("AUD", "BTC");

        let err = fetch_completed_bar(
            &market,
            &pair,
            Timeframe::Minute1,
            Some(60_000),
            &RetryPolicy::immediate(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DataError::DataUnavailable { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_invalid_bar_rejected() {
        let bar = Bar::new(60_000, 10.0, 11.0, 9.0, -1.0, 0.0);
        let market = feed(0, bar);
        let pair = TradingPair::new("AUD", "BTC");

        let err = fetch_completed_bar(&market, &pair, Timeframe::Minute1, None, &RetryPolicy::immediate())
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidBar { .. }));
    }
}
