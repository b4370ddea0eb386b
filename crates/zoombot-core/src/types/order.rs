//! Order types and structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Timeframe, TradingPair};
use crate::error::BrokerError;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Execute immediately at the best available price
    Market,
    /// Sell once the market trades at or below the trigger price
    StopLoss,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::StopLoss => write!(f, "STOP_LOSS"),
        }
    }
}

impl FromStr for OrderType {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "stop_loss" | "stop-loss" | "stoploss" => Ok(OrderType::StopLoss),
            _ => Err(BrokerError::InvalidOrderType(s.to_string())),
        }
    }
}

/// Order status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted but not (yet) executed
    Pending,
    /// Completely filled
    Filled,
    /// Refused by the exchange
    Rejected,
    /// Canceled before it could fill
    Canceled,
}

impl OrderStatus {
    /// Check if the order can no longer change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Filled => "filled",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Opaque exchange-issued order identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderHandle(pub String);

impl OrderHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Market order request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOrder {
    /// Pair to trade
    pub pair: TradingPair,
    /// Buy or sell the secondary asset
    pub side: Side,
    /// Quantity, denominated in `quantity_asset`
    pub quantity: Decimal,
    /// Asset the quantity is expressed in (primary or secondary)
    pub quantity_asset: String,
}

impl MarketOrder {
    /// Spend `quantity` of the primary asset on the secondary asset.
    pub fn buy_with_primary(pair: &TradingPair, quantity: Decimal) -> Self {
        Self {
            quantity_asset: pair.primary.clone(),
            pair: pair.clone(),
            side: Side::Buy,
            quantity,
        }
    }

    /// Sell `quantity` of the secondary asset.
    pub fn sell_secondary(pair: &TradingPair, quantity: Decimal) -> Self {
        Self {
            quantity_asset: pair.secondary.clone(),
            pair: pair.clone(),
            side: Side::Sell,
            quantity,
        }
    }
}

/// Outcome of an order as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub handle: OrderHandle,
    pub side: Side,
    pub order_type: OrderType,
    pub status: OrderStatus,
    /// Fill price in primary per secondary
    pub rate: Decimal,
    /// Secondary asset filled
    pub amount: Decimal,
    /// Primary asset exchanged
    pub total: Decimal,
}

impl OrderResult {
    /// Check if the order is completely filled.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

/// What an executed order did to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Buy,
    Sell,
    StopLoss,
}

impl TradeKind {
    /// Whether this trade closes a position.
    pub fn is_exit(&self) -> bool {
        !matches!(self, TradeKind::Buy)
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "buy"),
            TradeKind::Sell => write!(f, "sell"),
            TradeKind::StopLoss => write!(f, "stop_loss"),
        }
    }
}

/// An executed order, kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub handle: OrderHandle,
    pub kind: TradeKind,
    /// Timeframe active when the order executed
    pub timeframe: Timeframe,
    /// Timestamp of the bar that triggered the order (Unix ms)
    pub timestamp: i64,
    pub rate: Decimal,
    pub amount: Decimal,
    pub total: Decimal,
}

impl TradeRecord {
    pub fn from_result(result: &OrderResult, kind: TradeKind, timeframe: Timeframe, timestamp: i64) -> Self {
        Self {
            handle: result.handle.clone(),
            kind,
            timeframe,
            timestamp,
            rate: result.rate,
            amount: result.amount,
            total: result.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_type_parse() {
        assert_eq!("market".parse::<OrderType>().unwrap(), OrderType::Market);
        assert_eq!("STOP_LOSS".parse::<OrderType>().unwrap(), OrderType::StopLoss);
        assert!(matches!(
            "limit".parse::<OrderType>(),
            Err(BrokerError::InvalidOrderType(_))
        ));
    }

    #[test]
    fn test_market_order_builders() {
        let pair = TradingPair::new("AUD", "BTC");
        let buy = MarketOrder::buy_with_primary(&pair, dec!(250));
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.quantity_asset, "AUD");

        let sell = MarketOrder::sell_secondary(&pair, dec!(0.01));
        assert_eq!(sell.side, Side::Sell);
        assert_eq!(sell.quantity_asset, "BTC");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_trade_record_from_result() {
        let result = OrderResult {
            handle: OrderHandle("000000000001".to_string()),
            side: Side::Buy,
            order_type: OrderType::Market,
            status: OrderStatus::Filled,
            rate: dec!(50000),
            amount: dec!(0.002),
            total: dec!(100),
        };
        assert!(result.is_filled());

        let record = TradeRecord::from_result(&result, TradeKind::Buy, Timeframe::Minute5, 42);
        assert_eq!(record.total, dec!(100));
        assert!(!record.kind.is_exit());
        assert!(TradeKind::StopLoss.is_exit());
    }
}
