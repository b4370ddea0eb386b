//! Core traits for the trading system.

mod broker;
mod data_source;
mod indicator;
mod scheduler;
mod strategy;

pub use broker::{Exchange, OrderGateway};
pub use data_source::MarketData;
pub use indicator::Indicator;
pub use scheduler::TickScheduler;
pub use strategy::StrategyConfig;
