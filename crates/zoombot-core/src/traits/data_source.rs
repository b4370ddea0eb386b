//! Market data trait definitions.

use crate::error::DataError;
use crate::types::{Bar, Timeframe, TradingPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of OHLC bars for a trading pair.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Get the most recently completed bar.
    ///
    /// Returns `None` when the exchange has not published a completed bar
    /// for the timeframe yet; callers poll through
    /// [`fetch_completed_bar`](crate::retry::fetch_completed_bar).
    async fn latest_bar(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
    ) -> Result<Option<Bar>, DataError>;

    /// Fetch completed historical bars.
    ///
    /// # Arguments
    /// * `pair` - The pair to fetch
    /// * `timeframe` - The bar timeframe
    /// * `start` - Start of the range (inclusive)
    /// * `end` - End of the range (exclusive); only bars closed by then are returned
    ///
    /// # Returns
    /// A vector of bars ordered from oldest to newest
    async fn history(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError>;

    /// Get the data source name.
    fn name(&self) -> &str;
}
