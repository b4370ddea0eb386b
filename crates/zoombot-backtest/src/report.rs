//! Backtest report generation.

use serde::{Deserialize, Serialize};
use zoombot_broker::Balances;
use zoombot_core::types::TradeRecord;
use zoombot_strategy::TradingState;

use crate::{BacktestConfig, BacktestStats};

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Configuration used
    pub config: BacktestConfig,
    /// Statistics
    pub stats: BacktestStats,
    /// Executed orders, oldest first
    pub trades: Vec<TradeRecord>,
    /// Holdings when the replay ended
    pub final_balances: Balances,
    /// Strategy state when the replay ended
    pub final_state: TradingState,
    /// Whether the strategy stopped at a hierarchy bound
    pub halted: bool,
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Initial Capital:     {:.2}\n", self.stats.initial_capital));
        s.push_str(&format!("  Final Equity:        {:.2}\n", self.stats.final_equity));
        s.push_str(&format!("  Total Return:        {:.2}%\n", self.stats.total_return_pct));
        s.push_str(&format!("  Max Drawdown:        {:.2}%\n", self.stats.max_drawdown_pct));
        s.push_str(&format!(
            "  Final Balances:      {} primary / {} secondary\n",
            self.final_balances.primary, self.final_balances.secondary
        ));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Round Trips:         {}\n", self.stats.round_trips));
        s.push_str(&format!("  Winning Trades:      {}\n", self.stats.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", self.stats.losing_trades));
        s.push_str(&format!("  Stopped Out:         {}\n", self.stats.stopped_out));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", self.stats.win_rate_pct));
        s.push_str(&format!("  Avg Win:             {:.2}\n", self.stats.avg_win));
        s.push_str(&format!("  Avg Loss:            {:.2}\n", self.stats.avg_loss));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", self.stats.profit_factor));
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Fill Mode:           {}\n", self.config.fill_mode));
        s.push_str(&format!("  Ticks Processed:     {}\n", self.stats.bars_processed));
        s.push_str(&format!("  Ticks Skipped:       {}\n", self.stats.ticks_skipped));
        s.push_str(&format!(
            "  Final State:         {} on {}{}\n",
            self.final_state.phase,
            self.final_state.timeframe,
            if self.halted { " (halted)" } else { "" }
        ));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV (equity curve only).
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity\n");
        for (ts, equity) in &self.stats.equity_curve {
            csv.push_str(&format!("{},{}\n", ts, equity));
        }
        csv
    }
}
