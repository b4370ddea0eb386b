//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use zoombot_broker::FillMode;
use zoombot_core::types::Timeframe;

#[derive(Parser)]
#[command(name = "zoombot")]
#[command(author, version, about = "Multi-timeframe MACD zoom trading bot")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (overrides the configuration file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay historical bars through the strategy
    Backtest(BacktestArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Replay start (YYYY-MM-DD or RFC 3339); earlier bars bootstrap the indicators
    #[arg(long)]
    pub start: String,

    /// Replay end (defaults to the last loaded bar)
    #[arg(long)]
    pub end: Option<String>,

    /// Directory with <SECONDARY>-<PRIMARY>_<timeframe>.csv files
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Starting balance in the primary asset
    #[arg(long)]
    pub capital: Option<f64>,

    /// Timeframe watched while flat
    #[arg(short, long, value_parser = parse_timeframe)]
    pub timeframe: Option<Timeframe>,

    /// Market order fill price: close, open, mid or random
    #[arg(long, value_parser = parse_fill_mode)]
    pub fill_mode: Option<FillMode>,

    /// Seed for the random fill mode
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save the JSON report to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Save the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

fn parse_timeframe(s: &str) -> Result<Timeframe, String> {
    s.parse().map_err(|e: zoombot_core::error::DataError| e.to_string())
}

fn parse_fill_mode(s: &str) -> Result<FillMode, String> {
    s.parse().map_err(|e: zoombot_core::error::BrokerError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_backtest_args() {
        let cli = Cli::try_parse_from([
            "zoombot",
            "--log-level",
            "debug",
            "backtest",
            "--start",
            "2024-01-01",
            "--timeframe",
            "5m",
            "--fill-mode",
            "random",
            "--output",
            "json",
        ])
        .unwrap();

        assert!(matches!(cli.log_level, Some(LogLevel::Debug)));
        let Commands::Backtest(args) = cli.command else {
            panic!("expected backtest");
        };
        assert_eq!(args.timeframe, Some(Timeframe::Minute5));
        assert_eq!(args.fill_mode, Some(FillMode::Random));
        assert!(matches!(args.output, OutputFormat::Json));
    }

    #[test]
    fn test_rejects_unknown_fill_mode() {
        let result = Cli::try_parse_from([
            "zoombot", "backtest", "--start", "2024-01-01", "--fill-mode", "vwap",
        ]);
        assert!(result.is_err());
    }
}
