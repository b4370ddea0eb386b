//! Core types and traits for the zoom trading bot.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarStore) and the timeframe hierarchy
//! - Order requests, results and executed trade records
//! - Collaborator traits for market data, order execution and tick scheduling
//! - A bounded retry helper for fetching the most recently completed bar

pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{TradingError, TradingResult};
pub use retry::{fetch_completed_bar, RetryPolicy};
pub use traits::*;
pub use types::*;
