//! Backtest command implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::info;
use zoombot_backtest::{BacktestConfig, BacktestEngine};
use zoombot_config::load_config;
use zoombot_data::load_timeframes;

use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config_path: &Path) -> Result<()> {
    let app = load_config(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let mut strategy = app
        .strategy_config()
        .context("Invalid strategy configuration")?;
    if let Some(timeframe) = args.timeframe {
        strategy.start_timeframe = timeframe;
    }

    let mut backtest = BacktestConfig {
        initial_capital: app.backtest.initial_capital,
        fill_mode: args.fill_mode.unwrap_or(app.backtest.fill_mode),
        seed: args.seed.unwrap_or(app.backtest.seed),
    };
    if let Some(capital) = args.capital {
        backtest.initial_capital = Decimal::try_from(capital).context("Invalid capital")?;
    }

    let start = parse_date(&args.start)?;
    let end = args.end.as_deref().map(parse_date).transpose()?;
    if end.is_some_and(|end| end <= start) {
        anyhow::bail!("--end must be after --start");
    }

    let data_dir = args.data.unwrap_or(app.backtest.data_dir);
    if !data_dir.is_dir() {
        anyhow::bail!(
            "Data directory '{}' does not exist (set backtest.data_dir or pass --data)",
            data_dir.display()
        );
    }
    let data = load_timeframes(&data_dir, &strategy.pair, &strategy.hierarchy)
        .with_context(|| format!("Failed to load bars from {}", data_dir.display()))?;

    info!(
        pair = %strategy.pair,
        timeframe = %strategy.start_timeframe,
        start = %args.start,
        capital = %backtest.initial_capital,
        "starting backtest"
    );

    let engine = BacktestEngine::new(backtest, strategy);
    let report = engine.run(data, start, end).await.context("Backtest failed")?;

    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)
            .with_context(|| format!("Failed to write {}", save_path.display()))?;
        info!(path = %save_path.display(), "report saved");
    }
    if let Some(csv_path) = &args.equity_csv {
        std::fs::write(csv_path, report.equity_to_csv())
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        info!(path = %csv_path.display(), "equity curve saved");
    }

    Ok(())
}

/// Unix milliseconds for `YYYY-MM-DD` (midnight UTC) or an RFC 3339 time.
fn parse_date(s: &str) -> Result<i64> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        return Ok(midnight.and_utc().timestamp_millis());
    }
    let dt = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD or RFC 3339"))?;
    Ok(dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-15").unwrap(), 1_705_276_800_000);
        assert_eq!(parse_date("2024-01-15T10:00:00+00:00").unwrap(), 1_705_312_800_000);
        assert!(parse_date("15/01/2024").is_err());
    }
}
