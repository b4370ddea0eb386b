//! Validate configuration command.

use anyhow::{Context, Result};
use std::path::Path;
use zoombot_config::load_config;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    let strategy = match config.strategy_config() {
        Ok(strategy) => strategy,
        Err(e) => {
            println!("Strategy error: {}", e);
            return Err(e.into());
        }
    };

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Pair: {}", strategy.pair);
    println!("Start timeframe: {}", strategy.start_timeframe);
    println!(
        "Hierarchy: {}",
        strategy
            .hierarchy
            .levels()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" > ")
    );
    println!(
        "MACD: fast {} / slow {} / signal {}, long EMA {}",
        strategy.params.fast, strategy.params.slow, strategy.params.signal, strategy.params.long
    );
    println!("Buy rate: {}", strategy.buy_rate);
    println!("Tolerance: {}", strategy.tolerance);
    println!("Fill mode: {}", config.backtest.fill_mode);
    println!();
    println!("Effective configuration:");
    println!("{}", config.to_toml().context("Failed to render configuration")?);

    Ok(())
}
