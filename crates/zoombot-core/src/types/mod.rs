//! Core data types for the trading system.

mod hierarchy;
mod ohlcv;
mod order;
mod pair;
mod timeframe;

pub use hierarchy::TimeframeHierarchy;
pub use ohlcv::{Bar, BarStore};
pub use order::{
    MarketOrder, OrderHandle, OrderResult, OrderStatus, OrderType, Side, TradeKind, TradeRecord,
};
pub use pair::TradingPair;
pub use timeframe::Timeframe;
