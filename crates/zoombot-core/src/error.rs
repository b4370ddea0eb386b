//! Error types for the trading system.

use thiserror::Error;

use crate::types::{OrderStatus, Side, Timeframe};

/// Top-level trading system error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Timeframe error: {0}")]
    Timeframe(#[from] HierarchyError),

    #[error("{side} order was not filled (status: {status})")]
    OrderNotFilled { side: Side, status: OrderStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Whether the failed tick can simply be retried on the next bar.
    ///
    /// Sequencing faults, hierarchy bounds and bad configuration are not
    /// retryable and should halt the strategy.
    pub fn is_retryable(&self) -> bool {
        match self {
            TradingError::Data(e) => matches!(
                e,
                DataError::DataUnavailable { .. }
                    | DataError::NoDataAvailable
                    | DataError::ConnectionError(_)
            ),
            TradingError::Broker(e) => matches!(
                e,
                BrokerError::NetworkError(_)
                    | BrokerError::ApiError(_)
                    | BrokerError::OrderRejected(_)
                    | BrokerError::InsufficientFunds { .. }
            ),
            TradingError::OrderNotFilled { .. } => true,
            _ => false,
        }
    }
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy is not running")]
    NotRunning,
}

/// Order execution errors.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Invalid fill mode '{0}': expected one of close, open, mid, random")]
    InvalidMode(String),

    #[error("Invalid order type '{0}': expected market or stop_loss")]
    InvalidOrderType(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Market data errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No completed {timeframe} bar for {pair} after {attempts} attempts")]
    DataUnavailable {
        pair: String,
        timeframe: Timeframe,
        attempts: u32,
    },

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Invalid bar at {timestamp}: {reason}")]
    InvalidBar { timestamp: i64, reason: String },

    #[error("Bar at {got} is not newer than the last stored bar at {last}")]
    OutOfOrder { last: i64, got: i64 },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Indicators for {0} were updated before being bootstrapped")]
    Uninitialized(Timeframe),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Timeframe hierarchy errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("No finer timeframe below {0}")]
    NoFinerTimeframe(Timeframe),

    #[error("No coarser timeframe above {0}")]
    NoCoarserTimeframe(Timeframe),

    #[error("Timeframe {0} is not part of the hierarchy")]
    UnknownTimeframe(Timeframe),

    #[error("Invalid hierarchy: {0}")]
    Invalid(String),
}

/// Result type alias for trading operations.
pub type TradingResult<T> = Result<T, TradingError>;
