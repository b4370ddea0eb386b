//! Order execution trait definitions.

use crate::error::BrokerError;
use crate::traits::MarketData;
use crate::types::{MarketOrder, OrderHandle, OrderResult, TradingPair};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for exchange order execution.
///
/// Implementations report outcomes as they are; callers must treat any
/// status other than `Filled` as "not executed".
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Available balance of an asset.
    async fn balance(&self, asset: &str) -> Result<Decimal, BrokerError>;

    /// Submit a market order and report its outcome.
    async fn place_market_order(&self, order: MarketOrder) -> Result<OrderResult, BrokerError>;

    /// Place a stop-loss that sells `amount` of the secondary asset once the
    /// market trades at or below `trigger_price`.
    async fn place_stop_loss(
        &self,
        pair: &TradingPair,
        amount: Decimal,
        trigger_price: Decimal,
    ) -> Result<OrderHandle, BrokerError>;

    /// Current state of an order.
    async fn order_status(&self, handle: &OrderHandle) -> Result<OrderResult, BrokerError>;

    /// Cancel an open order.
    async fn cancel_order(&self, handle: &OrderHandle) -> Result<(), BrokerError>;
}

/// Everything the strategy needs from an exchange.
pub trait Exchange: MarketData + OrderGateway {}

impl<T: MarketData + OrderGateway + ?Sized> Exchange for T {}
