//! Order execution for backtests.
//!
//! [`SimulatedExchange`] replays stored bars behind the same
//! `MarketData`/`OrderGateway` traits a live exchange client implements, so
//! the strategy runs unchanged against history.

mod fill;
mod ids;
mod simulated;

pub use fill::FillMode;
pub use ids::IdGenerator;
pub use simulated::{Balances, SimulatedExchange};
