//! Strategy configuration trait.

use crate::error::StrategyError;

/// Configuration trait for strategies.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), StrategyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Periods {
        fast: usize,
        slow: usize,
    }

    impl StrategyConfig for Periods {
        fn validate(&self) -> Result<(), StrategyError> {
            if self.fast >= self.slow {
                return Err(StrategyError::InvalidConfig(
                    "fast period must be less than slow period".into(),
                ));
            }
            Ok(())
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(Periods { fast: 12, slow: 26 }.validate().is_ok());
        assert!(Periods { fast: 26, slow: 12 }.validate().is_err());
    }
}
