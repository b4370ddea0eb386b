//! In-memory exchange replaying historical bars.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use zoombot_core::error::{BrokerError, DataError};
use zoombot_core::traits::{MarketData, OrderGateway};
use zoombot_core::types::{
    Bar, MarketOrder, OrderHandle, OrderResult, OrderStatus, OrderType, Side, Timeframe,
    TradingPair,
};

use crate::fill::FillMode;
use crate::ids::IdGenerator;

/// Decimal places kept for rates and filled amounts.
const PRECISION: u32 = 8;

/// Primary and secondary holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balances {
    pub primary: Decimal,
    pub secondary: Decimal,
}

impl Balances {
    /// Value in the primary asset at `rate`.
    pub fn value_at(&self, rate: Decimal) -> Decimal {
        self.primary + self.secondary * rate
    }
}

#[derive(Debug)]
struct StopOrder {
    amount: Decimal,
    trigger: Decimal,
}

#[derive(Debug)]
struct Inner {
    /// Replay clock (Unix ms); only bars closed by now are visible
    cursor: i64,
    balances: Balances,
    orders: HashMap<OrderHandle, OrderResult>,
    /// Stop orders still waiting for their trigger
    stops: BTreeMap<OrderHandle, StopOrder>,
    ids: IdGenerator,
    rng: StdRng,
}

/// Exchange simulator with local bookkeeping and zero fees.
///
/// Market orders fill immediately at a price taken from the latest closed
/// bar of the finest loaded timeframe, according to the [`FillMode`]. Stop
/// orders are checked against each finest bar the clock advances over.
pub struct SimulatedExchange {
    pair: TradingPair,
    bars: HashMap<Timeframe, Vec<Bar>>,
    reference: Timeframe,
    mode: FillMode,
    inner: Mutex<Inner>,
}

impl SimulatedExchange {
    /// Create an exchange over `bars` with the clock at `start` (Unix ms).
    ///
    /// Bars are sorted by timestamp per timeframe. Fails with
    /// [`DataError::NoDataAvailable`] when no timeframe has bars.
    pub fn new(
        pair: TradingPair,
        mut bars: HashMap<Timeframe, Vec<Bar>>,
        initial_primary: Decimal,
        mode: FillMode,
        seed: u64,
        start: i64,
    ) -> Result<Self, DataError> {
        bars.retain(|_, series| !series.is_empty());
        for series in bars.values_mut() {
            series.sort_by_key(|b| b.timestamp);
            series.dedup_by_key(|b| b.timestamp);
        }
        let reference = bars
            .keys()
            .copied()
            .min_by_key(|tf| tf.as_millis())
            .ok_or(DataError::NoDataAvailable)?;

        info!(
            %pair,
            timeframes = bars.len(),
            %reference,
            %mode,
            %initial_primary,
            "simulated exchange ready"
        );

        Ok(Self {
            pair,
            bars,
            reference,
            mode,
            inner: Mutex::new(Inner {
                cursor: start,
                balances: Balances {
                    primary: initial_primary,
                    secondary: Decimal::ZERO,
                },
                orders: HashMap::new(),
                stops: BTreeMap::new(),
                ids: IdGenerator::new(),
                rng: StdRng::seed_from_u64(seed),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current replay time (Unix ms).
    pub fn now(&self) -> i64 {
        self.lock().cursor
    }

    /// Finest timeframe, used for fills and stop checks.
    pub fn reference_timeframe(&self) -> Timeframe {
        self.reference
    }

    pub fn balances(&self) -> Balances {
        self.lock().balances
    }

    /// Close of the latest finest bar, the rate used to value holdings.
    pub fn mark_price(&self) -> Option<Decimal> {
        let cursor = self.now();
        self.last_closed(self.reference, cursor)
            .and_then(|bar| to_rate(bar.close))
    }

    /// Timestamp of the latest bar across all timeframes.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.bars
            .iter()
            .filter_map(|(tf, series)| series.last().map(|b| b.timestamp + tf.as_millis()))
            .max()
    }

    /// Move the clock forward to `now`, filling stop orders whose trigger is
    /// reached by a finest bar closing in between.
    pub fn advance_to(&self, now: i64) {
        let mut inner = self.lock();
        if now <= inner.cursor {
            return;
        }

        let step = self.reference.as_millis();
        let from = inner.cursor;
        let crossed = self
            .series(self.reference)
            .iter()
            .filter(|b| b.timestamp + step > from && b.timestamp + step <= now);

        for bar in crossed {
            if inner.stops.is_empty() {
                break;
            }
            trigger_stops(&mut inner, bar);
        }
        inner.cursor = now;
    }

    fn series(&self, timeframe: Timeframe) -> &[Bar] {
        self.bars.get(&timeframe).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bars of `timeframe` that have closed by `cursor`.
    fn closed(&self, timeframe: Timeframe, cursor: i64) -> &[Bar] {
        let series = self.series(timeframe);
        let step = timeframe.as_millis();
        let end = series.partition_point(|b| b.timestamp + step <= cursor);
        &series[..end]
    }

    fn last_closed(&self, timeframe: Timeframe, cursor: i64) -> Option<&Bar> {
        self.closed(timeframe, cursor).last()
    }

    fn check_pair(&self, pair: &TradingPair) -> Result<(), BrokerError> {
        if pair != &self.pair {
            return Err(BrokerError::OrderRejected(format!(
                "unsupported pair {pair}, exchange trades {}",
                self.pair
            )));
        }
        Ok(())
    }
}

fn to_rate(price: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(price).map(|d| d.round_dp(PRECISION))
}

fn trigger_stops(inner: &mut Inner, bar: &Bar) {
    let Some(low) = to_rate(bar.low) else {
        return;
    };
    let open = to_rate(bar.open).unwrap_or(low);

    let hit: Vec<OrderHandle> = inner
        .stops
        .iter()
        .filter(|(_, stop)| low <= stop.trigger)
        .map(|(handle, _)| handle.clone())
        .collect();

    for handle in hit {
        let Some(stop) = inner.stops.remove(&handle) else {
            continue;
        };
        let rate = stop.trigger.min(open);
        let filled = inner.balances.secondary >= stop.amount;

        if filled {
            inner.balances.secondary -= stop.amount;
            inner.balances.primary += stop.amount * rate;
        }
        if let Some(order) = inner.orders.get_mut(&handle) {
            if filled {
                order.status = OrderStatus::Filled;
                order.rate = rate;
                order.total = stop.amount * rate;
            } else {
                order.status = OrderStatus::Rejected;
            }
        }
        debug!(%handle, %rate, filled, timestamp = bar.timestamp, "stop-loss triggered");
    }
}

#[async_trait]
impl MarketData for SimulatedExchange {
    async fn latest_bar(
        &self,
        _pair: &TradingPair,
        timeframe: Timeframe,
    ) -> Result<Option<Bar>, DataError> {
        let cursor = self.now();
        Ok(self.last_closed(timeframe, cursor).copied())
    }

    async fn history(
        &self,
        _pair: &TradingPair,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError> {
        let visible = self.now().min(end.timestamp_millis());
        let start = start.timestamp_millis();
        Ok(self
            .closed(timeframe, visible)
            .iter()
            .filter(|b| b.timestamp >= start)
            .copied()
            .collect())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[async_trait]
impl OrderGateway for SimulatedExchange {
    async fn balance(&self, asset: &str) -> Result<Decimal, BrokerError> {
        let balances = self.balances();
        if asset.eq_ignore_ascii_case(&self.pair.primary) {
            Ok(balances.primary)
        } else if asset.eq_ignore_ascii_case(&self.pair.secondary) {
            Ok(balances.secondary)
        } else {
            Ok(Decimal::ZERO)
        }
    }

    async fn place_market_order(&self, order: MarketOrder) -> Result<OrderResult, BrokerError> {
        self.check_pair(&order.pair)?;
        if order.quantity <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected("quantity must be positive".into()));
        }

        let mut inner = self.lock();
        let bar = *self
            .last_closed(self.reference, inner.cursor)
            .ok_or_else(|| BrokerError::OrderRejected("no market data at replay time".into()))?;
        let price = self.mode.price(&bar, &mut inner.rng);
        let rate = to_rate(price)
            .filter(|r| *r > Decimal::ZERO)
            .ok_or_else(|| BrokerError::OrderRejected(format!("invalid fill price {price}")))?;

        let in_primary = order.quantity_asset.eq_ignore_ascii_case(&self.pair.primary);
        // Truncate so the cost never exceeds the quantity offered
        let amount = if in_primary {
            (order.quantity / rate).round_dp_with_strategy(PRECISION, RoundingStrategy::ToZero)
        } else {
            order.quantity
        };
        let total = amount * rate;

        match order.side {
            Side::Buy => {
                if total > inner.balances.primary {
                    return Err(BrokerError::InsufficientFunds {
                        required: total,
                        available: inner.balances.primary,
                    });
                }
                inner.balances.primary -= total;
                inner.balances.secondary += amount;
            }
            Side::Sell => {
                if amount > inner.balances.secondary {
                    return Err(BrokerError::InsufficientFunds {
                        required: amount,
                        available: inner.balances.secondary,
                    });
                }
                inner.balances.secondary -= amount;
                inner.balances.primary += total;
            }
        }

        let result = OrderResult {
            handle: OrderHandle(inner.ids.next_id()),
            side: order.side,
            order_type: OrderType::Market,
            status: OrderStatus::Filled,
            rate,
            amount,
            total,
        };
        inner.orders.insert(result.handle.clone(), result.clone());
        debug!(
            handle = %result.handle,
            side = %result.side,
            %rate,
            %amount,
            %total,
            timestamp = bar.timestamp,
            "market order filled"
        );
        Ok(result)
    }

    async fn place_stop_loss(
        &self,
        pair: &TradingPair,
        amount: Decimal,
        trigger_price: Decimal,
    ) -> Result<OrderHandle, BrokerError> {
        self.check_pair(pair)?;
        if amount <= Decimal::ZERO || trigger_price <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected(
                "stop-loss amount and trigger must be positive".into(),
            ));
        }

        let mut inner = self.lock();
        let handle = OrderHandle(inner.ids.next_id());
        inner.orders.insert(
            handle.clone(),
            OrderResult {
                handle: handle.clone(),
                side: Side::Sell,
                order_type: OrderType::StopLoss,
                status: OrderStatus::Pending,
                rate: trigger_price,
                amount,
                total: Decimal::ZERO,
            },
        );
        inner.stops.insert(
            handle.clone(),
            StopOrder {
                amount,
                trigger: trigger_price,
            },
        );
        debug!(%handle, %amount, trigger = %trigger_price, "stop-loss placed");
        Ok(handle)
    }

    async fn order_status(&self, handle: &OrderHandle) -> Result<OrderResult, BrokerError> {
        self.lock()
            .orders
            .get(handle)
            .cloned()
            .ok_or_else(|| BrokerError::OrderNotFound(handle.to_string()))
    }

    async fn cancel_order(&self, handle: &OrderHandle) -> Result<(), BrokerError> {
        let mut inner = self.lock();
        let order = inner
            .orders
            .get_mut(handle)
            .ok_or_else(|| BrokerError::OrderNotFound(handle.to_string()))?;

        if order.status.is_terminal() {
            return Err(BrokerError::OrderRejected(format!(
                "order {handle} is already {}",
                order.status
            )));
        }
        order.status = OrderStatus::Canceled;
        inner.stops.remove(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MIN: i64 = 60_000;

    fn pair() -> TradingPair {
        TradingPair::new("AUD", "BTC")
    }

    /// Ten 1m bars closing at 10, 11, ..., 19 with a 1.0 range.
    fn minute_bars() -> Vec<Bar> {
        (0..10)
            .map(|i| {
                let close = 10.0 + i as f64;
                Bar::new(i * MIN, close - 0.5, close + 0.5, close - 0.5, close, 1.0)
            })
            .collect()
    }

    fn exchange(mode: FillMode) -> SimulatedExchange {
        let mut bars = HashMap::new();
        bars.insert(Timeframe::Minute1, minute_bars());
        bars.insert(
            Timeframe::Minute5,
            vec![
                Bar::new(0, 9.5, 14.5, 9.5, 14.0, 5.0),
                Bar::new(5 * MIN, 14.5, 19.5, 14.5, 19.0, 5.0),
            ],
        );
        SimulatedExchange::new(pair(), bars, dec!(1000), mode, 42, 3 * MIN).unwrap()
    }

    #[test]
    fn test_requires_bars() {
        let empty = HashMap::from([(Timeframe::Minute1, Vec::new())]);
        assert!(SimulatedExchange::new(pair(), empty, dec!(1), FillMode::Close, 0, 0).is_err());
    }

    #[tokio::test]
    async fn test_latest_bar_respects_cursor() {
        let ex = exchange(FillMode::Close);
        let bar = ex.latest_bar(&pair(), Timeframe::Minute1).await.unwrap().unwrap();
        assert_eq!(bar.timestamp, 2 * MIN);
        assert!(ex.latest_bar(&pair(), Timeframe::Minute5).await.unwrap().is_none());

        ex.advance_to(5 * MIN);
        let bar = ex.latest_bar(&pair(), Timeframe::Minute5).await.unwrap().unwrap();
        assert_eq!(bar.timestamp, 0);
    }

    #[tokio::test]
    async fn test_history_is_closed_bars_in_range() {
        let ex = exchange(FillMode::Close);
        ex.advance_to(8 * MIN);
        let start = DateTime::from_timestamp_millis(2 * MIN).unwrap();
        let end = DateTime::from_timestamp_millis(6 * MIN).unwrap();

        let bars = ex.history(&pair(), Timeframe::Minute1, start, end).await.unwrap();
        let stamps: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();
        assert_eq!(stamps, vec![2 * MIN, 3 * MIN, 4 * MIN, 5 * MIN]);

        let far = DateTime::from_timestamp_millis(60 * MIN).unwrap();
        let visible = ex.history(&pair(), Timeframe::Minute1, start, far).await.unwrap();
        assert_eq!(visible.last().map(|b| b.timestamp), Some(7 * MIN));
    }

    #[tokio::test]
    async fn test_buy_conserves_value() {
        let ex = exchange(FillMode::Close);
        let before = ex.balances();

        let result = ex
            .place_market_order(MarketOrder::buy_with_primary(&pair(), dec!(300)))
            .await
            .unwrap();
        assert!(result.is_filled());
        assert_eq!(result.handle.as_str(), "000000000001");
        assert_eq!(result.rate, dec!(12));

        let after = ex.balances();
        assert_eq!(after.secondary, result.amount);
        assert_eq!(before.primary, after.primary + result.amount * result.rate);
    }

    #[tokio::test]
    async fn test_sell_conserves_value() {
        let ex = exchange(FillMode::Mid);
        ex.place_market_order(MarketOrder::buy_with_primary(&pair(), dec!(500)))
            .await
            .unwrap();
        ex.advance_to(6 * MIN);

        let before = ex.balances();
        let result = ex
            .place_market_order(MarketOrder::sell_secondary(&pair(), before.secondary))
            .await
            .unwrap();
        let after = ex.balances();

        assert_eq!(result.handle.as_str(), "000000000002");
        assert_eq!(after.secondary, Decimal::ZERO);
        assert_eq!(after.primary, before.primary + result.amount * result.rate);
    }

    #[tokio::test]
    async fn test_full_balance_buy_at_uneven_rate() {
        let mut bars = HashMap::new();
        bars.insert(Timeframe::Minute1, vec![Bar::new(0, 11.0, 11.0, 11.0, 11.0, 1.0)]);
        let ex = SimulatedExchange::new(pair(), bars, dec!(1000), FillMode::Close, 0, MIN).unwrap();

        let result = ex
            .place_market_order(MarketOrder::buy_with_primary(&pair(), dec!(1000)))
            .await
            .unwrap();
        assert_eq!(result.amount, dec!(90.90909090));
        assert!(result.total <= dec!(1000));
        assert_eq!(ex.balances().primary, dec!(1000) - result.total);
    }

    #[tokio::test]
    async fn test_insufficient_funds() {
        let ex = exchange(FillMode::Close);
        let err = ex
            .place_market_order(MarketOrder::buy_with_primary(&pair(), dec!(2000)))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InsufficientFunds { .. }));

        let err = ex
            .place_market_order(MarketOrder::sell_secondary(&pair(), dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InsufficientFunds { .. }));
        assert_eq!(ex.balances().primary, dec!(1000));
    }

    #[tokio::test]
    async fn test_random_mode_is_reproducible() {
        let a = exchange(FillMode::Random);
        let b = exchange(FillMode::Random);
        let order = MarketOrder::buy_with_primary(&pair(), dec!(100));

        let ra = a.place_market_order(order.clone()).await.unwrap();
        let rb = b.place_market_order(order).await.unwrap();
        assert_eq!(ra.rate, rb.rate);
        assert!(ra.rate >= dec!(11.5) && ra.rate <= dec!(12.5));
    }

    #[tokio::test]
    async fn test_stop_loss_fills_when_low_reaches_trigger() {
        let mut bars = HashMap::new();
        bars.insert(
            Timeframe::Minute1,
            vec![
                Bar::new(0, 10.0, 10.5, 9.8, 10.2, 1.0),
                Bar::new(MIN, 10.2, 10.4, 9.9, 10.0, 1.0),
                Bar::new(2 * MIN, 9.6, 9.7, 9.0, 9.2, 1.0),
            ],
        );
        let ex = SimulatedExchange::new(pair(), bars, dec!(2000), FillMode::Close, 1, MIN).unwrap();
        ex.place_market_order(MarketOrder::buy_with_primary(&pair(), dec!(1020)))
            .await
            .unwrap();
        let held = ex.balances().secondary;
        assert_eq!(held, dec!(100));

        let handle = ex.place_stop_loss(&pair(), held, dec!(9.8)).await.unwrap();
        assert_eq!(ex.order_status(&handle).await.unwrap().status, OrderStatus::Pending);

        // Low 9.9 stays above the trigger
        ex.advance_to(2 * MIN);
        assert_eq!(ex.order_status(&handle).await.unwrap().status, OrderStatus::Pending);

        // Gaps below the trigger: fills at the open
        ex.advance_to(3 * MIN);
        let stop = ex.order_status(&handle).await.unwrap();
        assert_eq!(stop.status, OrderStatus::Filled);
        assert_eq!(stop.rate, dec!(9.6));
        assert_eq!(ex.balances().secondary, Decimal::ZERO);
        assert_eq!(ex.balances().primary, dec!(1940));

        assert!(ex.cancel_order(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_stop_loss() {
        let ex = exchange(FillMode::Close);
        let handle = ex.place_stop_loss(&pair(), dec!(1), dec!(15)).await.unwrap();
        ex.cancel_order(&handle).await.unwrap();
        assert_eq!(ex.order_status(&handle).await.unwrap().status, OrderStatus::Canceled);

        ex.advance_to(10 * MIN);
        assert_eq!(ex.order_status(&handle).await.unwrap().status, OrderStatus::Canceled);
        assert!(ex
            .order_status(&OrderHandle("999".into()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_balance_by_asset() {
        let ex = exchange(FillMode::Close);
        assert_eq!(ex.balance("aud").await.unwrap(), dec!(1000));
        assert_eq!(ex.balance("BTC").await.unwrap(), Decimal::ZERO);
        assert_eq!(ex.balance("ETH").await.unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_mark_price_and_end() {
        let ex = exchange(FillMode::Close);
        assert_eq!(ex.mark_price(), Some(dec!(12)));
        assert_eq!(ex.last_timestamp(), Some(10 * MIN));
        assert_eq!(ex.reference_timeframe(), Timeframe::Minute1);
    }
}
