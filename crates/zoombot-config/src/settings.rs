//! Configuration structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use zoombot_broker::FillMode;
use zoombot_core::error::StrategyError;
use zoombot_core::traits::StrategyConfig;
use zoombot_core::types::{Timeframe, TimeframeHierarchy, TradingPair};
use zoombot_core::RetryPolicy;
use zoombot_indicators::MacdParams;
use zoombot_strategy::ZoomConfig;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub strategy: StrategySettings,
    #[serde(default)]
    pub hierarchy: HierarchySettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

impl AppConfig {
    /// Build the validated strategy configuration.
    pub fn strategy_config(&self) -> Result<ZoomConfig, StrategyError> {
        let s = &self.strategy;
        let hierarchy = TimeframeHierarchy::new(self.hierarchy.levels.clone())
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;

        let config = ZoomConfig {
            pair: TradingPair::new(s.primary.as_str(), s.secondary.as_str()),
            start_timeframe: s.start_timeframe,
            hierarchy,
            params: s.indicators,
            buy_rate: s.buy_rate,
            tolerance: s.tolerance,
            history_bars: s.history_bars,
            bar_capacity: s.bar_capacity,
            retry: self.retry.policy(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. to show the effective configuration.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "zoombot".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Asset held while flat, e.g. `AUD`
    pub primary: String,
    /// Asset bought, e.g. `BTC`
    pub secondary: String,
    pub start_timeframe: Timeframe,
    pub buy_rate: Decimal,
    pub tolerance: u32,
    pub history_bars: usize,
    pub bar_capacity: usize,
    pub indicators: MacdParams,
}

impl Default for StrategySettings {
    fn default() -> Self {
        let defaults = ZoomConfig::new(TradingPair::new("AUD", "BTC"), Timeframe::Hour1);
        Self {
            primary: defaults.pair.primary,
            secondary: defaults.pair.secondary,
            start_timeframe: defaults.start_timeframe,
            buy_rate: defaults.buy_rate,
            tolerance: defaults.tolerance,
            history_bars: defaults.history_bars,
            bar_capacity: defaults.bar_capacity,
            indicators: defaults.params,
        }
    }
}

/// Timeframes the strategy may zoom through, finest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchySettings {
    pub levels: Vec<Timeframe>,
}

impl Default for HierarchySettings {
    fn default() -> Self {
        Self {
            levels: TimeframeHierarchy::default().levels().to_vec(),
        }
    }
}

/// Polling budget for completed bars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Live boundary timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Wait after a boundary before polling, giving the exchange time to
    /// publish the bar
    pub publish_delay_ms: u64,
    /// Capacity of the tick channel
    pub buffer: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            publish_delay_ms: 2_000,
            buffer: 16,
        }
    }
}

impl SchedulerSettings {
    pub fn publish_delay(&self) -> Duration {
        Duration::from_millis(self.publish_delay_ms)
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: Decimal,
    pub fill_mode: FillMode,
    pub seed: u64,
    /// Directory holding `<SECONDARY>-<PRIMARY>_<timeframe>.csv` files
    pub data_dir: PathBuf,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(1000),
            fill_mode: FillMode::Close,
            seed: 0,
            data_dir: PathBuf::from("data"),
        }
    }
}
