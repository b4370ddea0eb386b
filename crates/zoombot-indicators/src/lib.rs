//! Incremental momentum indicators.
//!
//! This crate provides:
//! - The EMA recursion used for every smoothed series
//! - `IndicatorSet`: fast/slow/long EMA, MACD and MACD-signal for one timeframe
//! - `IndicatorEngine`: the indicator sets keyed by timeframe
//!
//! Seeding over history and incremental updates share the same recursion,
//! so a bootstrapped set and one grown bar by bar agree exactly.

pub mod engine;
pub mod macd;
pub mod moving_average;

pub use engine::IndicatorEngine;
pub use macd::{IndicatorPoint, IndicatorSet, MacdParams};
pub use moving_average::Ema;
