//! Trading pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A market between a primary (quote) asset and a secondary (traded) asset.
///
/// Buying spends the primary asset to acquire the secondary one,
/// e.g. primary `AUD`, secondary `BTC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    pub primary: String,
    pub secondary: String,
}

impl TradingPair {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into().to_uppercase(),
            secondary: secondary.into().to_uppercase(),
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.secondary, self.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_display() {
        let pair = TradingPair::new("aud", "btc");
        assert_eq!(pair.primary, "AUD");
        assert_eq!(pair.to_string(), "BTC/AUD");
    }
}
