//! The zoom trading strategy.
//!
//! A [`ZoomStrategy`] watches one timeframe at a time. A macro buy signal on
//! the active timeframe zooms in to the next finer one; a second signal there
//! opens a position protected by a stop-loss at the swing low. Fading
//! momentum or a stop-loss fill closes the position and zooms back out.
//!
//! Live trading drives `tick()` from a [`BoundaryTimer`] through a
//! [`LiveRunner`]; the backtest crate drives the same state machine from a
//! replay loop.

pub mod config;
pub mod machine;
pub mod runner;
pub mod signals;
pub mod state;
pub mod timer;

pub use config::ZoomConfig;
pub use machine::{TickAction, TickReport, ZoomStrategy};
pub use runner::LiveRunner;
pub use state::{PendingStop, Phase, TradingState};
pub use timer::{BoundaryTimer, Tick};
