//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, BacktestSettings, HierarchySettings, LoggingConfig, RetrySettings,
    SchedulerSettings, StrategySettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// Variables such as `ZOOMBOT__STRATEGY__TOLERANCE=3` override the file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("ZOOMBOT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
