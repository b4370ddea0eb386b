//! zoombot CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use zoombot_config::{load_config, LoggingConfig};
use zoombot_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes from the file when it loads; the command reports load errors
    let logging = load_config(&cli.config)
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    let level = cli
        .log_level
        .map_or(logging.level.as_str(), |level| level.as_str());
    let _guard = setup_logging(
        level,
        cli.json_logs || logging.json(),
        logging.file.as_deref().map(Path::new),
    );

    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &cli.config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
    }
}
