//! Backtesting engine.
//!
//! Replays historical bars through the same `ZoomStrategy` used live, with a
//! `SimulatedExchange` standing in for the exchange and a replay scheduler
//! standing in for the wall-clock timer.

mod engine;
mod report;
mod scheduler;
mod statistics;

pub use engine::{BacktestConfig, BacktestEngine};
pub use report::BacktestReport;
pub use scheduler::ReplayScheduler;
pub use statistics::{BacktestStats, RoundTrip};
