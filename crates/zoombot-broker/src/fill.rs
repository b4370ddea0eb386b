//! Fill pricing for simulated market orders.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zoombot_core::error::BrokerError;
use zoombot_core::types::Bar;

/// Where inside the reference bar a market order fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    #[default]
    Close,
    Open,
    /// Average of open and close
    Mid,
    /// Uniform within [low, high]
    Random,
}

impl FillMode {
    /// Fill price for `bar`.
    pub fn price<R: Rng + ?Sized>(&self, bar: &Bar, rng: &mut R) -> f64 {
        match self {
            FillMode::Close => bar.close,
            FillMode::Open => bar.open,
            FillMode::Mid => bar.mid(),
            FillMode::Random if bar.low < bar.high => rng.gen_range(bar.low..=bar.high),
            FillMode::Random => bar.low,
        }
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillMode::Close => write!(f, "close"),
            FillMode::Open => write!(f, "open"),
            FillMode::Mid => write!(f, "mid"),
            FillMode::Random => write!(f, "random"),
        }
    }
}

impl FromStr for FillMode {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "close" => Ok(FillMode::Close),
            "open" => Ok(FillMode::Open),
            "mid" => Ok(FillMode::Mid),
            "random" => Ok(FillMode::Random),
            _ => Err(BrokerError::InvalidMode(s.to_string())),
        }
    }
}
