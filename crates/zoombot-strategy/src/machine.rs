//! The zoom state machine.
//!
//! One `tick()` ingests the next completed bar of the active timeframe,
//! updates its indicators and evaluates the transition table:
//!
//! | Phase  | Condition                          | Next   |
//! |--------|------------------------------------|--------|
//! | FLAT   | macro buy signal                   | ZOOMED (finer timeframe) |
//! | ZOOMED | macro buy signal                   | BOUGHT (market buy + stop-loss) |
//! | BOUGHT | low touches the stop and it filled | FLAT (coarser timeframe) |
//! | BOUGHT | MACD gradient <= 0, tolerance spent | FLAT (market sell, coarser timeframe) |
//! | BOUGHT | MACD gradient > 0                  | BOUGHT (tolerance reset) |
//!
//! A tick either commits completely or leaves the state untouched. Every
//! fallible read a transition needs happens before its order is placed; once
//! an order has filled the transition commits and follow-up failures are
//! logged instead of returned. Bars left out by a rolled-back tick are
//! fetched and ingested in order by the next one, which then evaluates the
//! transition on the newest bar.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use zoombot_core::error::{
    BrokerError, DataError, IndicatorError, StrategyError, TradingError, TradingResult,
};
use zoombot_core::retry::fetch_completed_bar;
use zoombot_core::traits::{Exchange, StrategyConfig, TickScheduler};
use zoombot_core::types::{
    Bar, BarStore, MarketOrder, OrderResult, Timeframe, TradeKind, TradeRecord,
};
use zoombot_indicators::{IndicatorEngine, IndicatorPoint, IndicatorSet};

use crate::config::ZoomConfig;
use crate::signals::{macro_buy_signal, momentum_fading};
use crate::state::{PendingStop, Phase, TradingState};

/// What a committed tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickAction {
    /// Nothing changed besides the ingested bar
    Hold,
    ZoomedIn { from: Timeframe, to: Timeframe },
    Bought(TradeRecord),
    Sold(TradeRecord),
    StoppedOut(TradeRecord),
    /// Non-positive gradient absorbed by the tolerance budget
    ToleranceSpent { remaining: i32 },
    ToleranceReset,
}

/// Result of a committed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Bar ingested by the tick
    pub bar: Bar,
    /// Timeframe of `bar`
    pub timeframe: Timeframe,
    pub action: TickAction,
    /// Phase after the tick
    pub phase: Phase,
}

/// Transition decided during a tick, applied on commit.
struct Decision {
    action: TickAction,
    switch: Option<(Timeframe, Vec<Bar>)>,
    /// Reset the swing low from the new window after switching
    reset_swing_low: bool,
}

impl Decision {
    fn stay(action: TickAction) -> Self {
        Self {
            action,
            switch: None,
            reset_swing_low: false,
        }
    }
}

/// Evicted bar and indicator point of one ingested bar.
type Undo = (Option<Bar>, Option<IndicatorPoint>);

/// Multi-timeframe zoom strategy.
pub struct ZoomStrategy<E: Exchange + ?Sized, S: TickScheduler> {
    config: ZoomConfig,
    exchange: Arc<E>,
    scheduler: S,
    state: TradingState,
    bars: BarStore,
    indicators: IndicatorEngine,
    history: Vec<TradeRecord>,
    /// A tick rolled back while bought, so the stop may have filled unseen
    recheck_stop: bool,
}

impl<E: Exchange + ?Sized, S: TickScheduler> ZoomStrategy<E, S> {
    /// Create a stopped strategy.
    pub fn new(config: ZoomConfig, exchange: Arc<E>, scheduler: S) -> TradingResult<Self> {
        config.validate()?;
        let indicators = IndicatorEngine::new(config.params, config.bar_capacity)?;

        Ok(Self {
            state: TradingState::flat(config.start_timeframe, f64::INFINITY, config.tolerance),
            bars: BarStore::with_capacity(config.start_timeframe, config.bar_capacity),
            indicators,
            config,
            exchange,
            scheduler,
            history: Vec::new(),
            recheck_stop: false,
        })
    }

    /// Bootstrap the start timeframe from history closed by `as_of` (Unix ms)
    /// and start the scheduler.
    ///
    /// Restarting resets the state to FLAT on the start timeframe.
    pub async fn start(&mut self, as_of: i64) -> TradingResult<()> {
        let timeframe = self.config.start_timeframe;
        let history = self.load_history(timeframe, as_of).await?;

        self.scheduler.stop().await;
        self.reseed(timeframe, history);

        let swing_low = self.bars.lowest_low().unwrap_or(f64::INFINITY);
        self.state = TradingState::flat(timeframe, swing_low, self.config.tolerance);
        self.state.running = true;
        self.scheduler.start(timeframe).await;

        info!(
            pair = %self.config.pair,
            %timeframe,
            bars = self.bars.len(),
            swing_low,
            "strategy started"
        );
        Ok(())
    }

    /// Stop the scheduler and mark the strategy as not running.
    pub async fn shutdown(&mut self) {
        self.scheduler.stop().await;
        self.state.running = false;
        info!(pair = %self.config.pair, phase = %self.state.phase, "strategy stopped");
    }

    /// Advance by one completed bar of the active timeframe.
    pub async fn tick(&mut self) -> TradingResult<TickReport> {
        if !self.state.running {
            return Err(StrategyError::NotRunning.into());
        }

        let timeframe = self.state.timeframe;
        let after = self.bars.last().map(|b| b.timestamp);
        let bar = fetch_completed_bar(
            self.exchange.as_ref(),
            &self.config.pair,
            timeframe,
            after,
            &self.config.retry,
        )
        .await?;

        let mut ingest = match after {
            Some(last) if bar.timestamp - last > timeframe.as_millis() => {
                self.missed_bars(timeframe, last, bar.timestamp).await?
            }
            _ => Vec::new(),
        };
        if !ingest.is_empty() {
            info!(%timeframe, missed = ingest.len(), "catching up on bars left out by earlier ticks");
        }
        ingest.push(bar);

        let mut undo = Vec::with_capacity(ingest.len());
        for b in &ingest {
            match self.ingest(timeframe, b) {
                Ok(step) => undo.push(step),
                Err(e) => {
                    self.rollback(timeframe, undo);
                    return Err(e);
                }
            }
        }
        let low = ingest.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        let mut draft = self.state.clone();
        let mut fills = Vec::new();
        let decision = match self.decide(&bar, low, &mut draft, &mut fills).await {
            Ok(decision) => decision,
            Err(e @ TradingError::Timeframe(_)) => {
                error!(%timeframe, error = %e, "hierarchy bound reached, halting");
                draft.running = false;
                self.state = draft;
                self.recheck_stop = false;
                self.scheduler.stop().await;
                return Err(e);
            }
            Err(e) => {
                self.rollback(timeframe, undo);
                self.recheck_stop = self.state.bought();
                debug!(%timeframe, timestamp = bar.timestamp, error = %e, "tick rolled back");
                return Err(e);
            }
        };

        self.state = draft;
        self.recheck_stop = false;
        self.history.extend(fills);
        if let Some((to, window)) = decision.switch {
            self.switch_timeframe(to, window, decision.reset_swing_low).await;
        }

        let report = TickReport {
            bar,
            timeframe,
            action: decision.action,
            phase: self.state.phase,
        };
        debug!(
            %timeframe,
            timestamp = bar.timestamp,
            close = bar.close,
            phase = %report.phase,
            action = ?report.action,
            "tick committed"
        );
        Ok(report)
    }

    /// Snapshot of the trading state.
    pub fn current_state(&self) -> TradingState {
        self.state.clone()
    }

    /// Executed orders, oldest first.
    pub fn history(&self) -> &[TradeRecord] {
        &self.history
    }

    /// Bars of the active timeframe.
    pub fn bars(&self) -> &BarStore {
        &self.bars
    }

    /// Indicators of the active timeframe.
    pub fn indicators(&self) -> Option<&IndicatorSet> {
        self.indicators.get(self.state.timeframe)
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    async fn decide(
        &self,
        bar: &Bar,
        low: f64,
        draft: &mut TradingState,
        fills: &mut Vec<TradeRecord>,
    ) -> TradingResult<Decision> {
        let trigger = draft
            .pending_stop_loss
            .as_ref()
            .and_then(|stop| stop.trigger.to_f64())
            .unwrap_or(f64::NEG_INFINITY);
        let touched = draft.bought() && (self.recheck_stop || draft.stop_touched(low, trigger));
        draft.observe_low(low);

        let timeframe = draft.timeframe;
        let indicators = self
            .indicators
            .get(timeframe)
            .ok_or(IndicatorError::Uninitialized(timeframe))?;

        match draft.phase {
            Phase::Flat => {
                if !macro_buy_signal(indicators, bar) {
                    return Ok(Decision::stay(TickAction::Hold));
                }
                let to = self.config.hierarchy.finer(timeframe)?;
                let window = self
                    .load_history(to, bar.timestamp + timeframe.as_millis())
                    .await?;

                draft.zoom_in(to);
                info!(from = %timeframe, %to, timestamp = bar.timestamp, "macro buy signal, zooming in");
                Ok(Decision {
                    action: TickAction::ZoomedIn { from: timeframe, to },
                    switch: Some((to, window)),
                    reset_swing_low: false,
                })
            }
            Phase::Zoomed => {
                if !macro_buy_signal(indicators, bar) {
                    return Ok(Decision::stay(TickAction::Hold));
                }
                self.buy(bar, draft, fills).await
            }
            Phase::Bought => {
                if touched {
                    if let Some(fill) = self.stop_fill(draft).await? {
                        return self.stopped_out(bar, fill, draft, fills).await;
                    }
                }

                let decision = match momentum_fading(indicators) {
                    Some(true) => {
                        draft.tolerance_remaining -= 1;
                        if draft.tolerance_remaining < 0 {
                            if !touched {
                                if let Some(fill) = self.stop_fill(draft).await? {
                                    return self.stopped_out(bar, fill, draft, fills).await;
                                }
                            }
                            return self.sell(bar, draft, fills).await;
                        }
                        Decision::stay(TickAction::ToleranceSpent {
                            remaining: draft.tolerance_remaining,
                        })
                    }
                    Some(false) => {
                        draft.reset_tolerance(self.config.tolerance);
                        Decision::stay(TickAction::ToleranceReset)
                    }
                    None => Decision::stay(TickAction::Hold),
                };

                if draft.pending_stop_loss.is_none() {
                    draft.pending_stop_loss = self.protect(draft.position_size, draft.swing_low).await;
                }
                Ok(decision)
            }
        }
    }

    async fn buy(
        &self,
        bar: &Bar,
        draft: &mut TradingState,
        fills: &mut Vec<TradeRecord>,
    ) -> TradingResult<Decision> {
        let pair = &self.config.pair;
        let available = self.exchange.balance(&pair.primary).await?;
        let spend = (available * self.config.buy_rate).normalize();
        if spend <= Decimal::ZERO {
            return Err(BrokerError::InsufficientFunds {
                required: spend,
                available,
            }
            .into());
        }

        let result = self
            .exchange
            .place_market_order(MarketOrder::buy_with_primary(pair, spend))
            .await?;
        ensure_filled(&result)?;

        let record = TradeRecord::from_result(&result, TradeKind::Buy, draft.timeframe, bar.timestamp);
        info!(
            %pair,
            timeframe = %draft.timeframe,
            rate = %result.rate,
            amount = %result.amount,
            total = %result.total,
            "bought"
        );

        let stop = self.protect(result.amount, draft.swing_low).await;
        draft.enter(result.amount, stop, self.config.tolerance);
        fills.push(record.clone());
        Ok(Decision::stay(TickAction::Bought(record)))
    }

    async fn sell(
        &self,
        bar: &Bar,
        draft: &mut TradingState,
        fills: &mut Vec<TradeRecord>,
    ) -> TradingResult<Decision> {
        let pair = &self.config.pair;
        let from = draft.timeframe;
        let to = self.config.hierarchy.coarser(from)?;
        let holding = self.exchange.balance(&pair.secondary).await?;
        if holding <= Decimal::ZERO {
            return Err(BrokerError::InsufficientFunds {
                required: draft.position_size,
                available: holding,
            }
            .into());
        }
        let window = self.load_history(to, bar.timestamp + from.as_millis()).await?;

        let result = self
            .exchange
            .place_market_order(MarketOrder::sell_secondary(pair, holding))
            .await?;
        ensure_filled(&result)?;

        if let Some(stop) = draft.pending_stop_loss.take() {
            if let Err(e) = self.exchange.cancel_order(&stop.handle).await {
                warn!(handle = %stop.handle, error = %e, "failed to cancel stop-loss after sell");
            }
        }

        let record = TradeRecord::from_result(&result, TradeKind::Sell, from, bar.timestamp);
        info!(
            %pair,
            %from,
            %to,
            rate = %result.rate,
            amount = %result.amount,
            total = %result.total,
            "momentum faded, sold"
        );

        draft.exit(to, self.config.tolerance);
        fills.push(record.clone());
        Ok(Decision {
            action: TickAction::Sold(record),
            switch: Some((to, window)),
            reset_swing_low: false,
        })
    }

    async fn stopped_out(
        &self,
        bar: &Bar,
        fill: OrderResult,
        draft: &mut TradingState,
        fills: &mut Vec<TradeRecord>,
    ) -> TradingResult<Decision> {
        let from = draft.timeframe;
        let to = self.config.hierarchy.coarser(from)?;
        let window = self.load_history(to, bar.timestamp + from.as_millis()).await?;

        let record = TradeRecord::from_result(&fill, TradeKind::StopLoss, from, bar.timestamp);
        info!(
            pair = %self.config.pair,
            %from,
            %to,
            rate = %fill.rate,
            amount = %fill.amount,
            "stop-loss filled"
        );

        draft.exit(to, self.config.tolerance);
        fills.push(record.clone());
        Ok(Decision {
            action: TickAction::StoppedOut(record),
            switch: Some((to, window)),
            reset_swing_low: true,
        })
    }

    /// The pending stop-loss, if the exchange reports it filled.
    async fn stop_fill(&self, draft: &TradingState) -> TradingResult<Option<OrderResult>> {
        let Some(stop) = draft.pending_stop_loss.as_ref() else {
            return Ok(None);
        };
        let result = self.exchange.order_status(&stop.handle).await?;
        debug!(handle = %stop.handle, status = %result.status, "stop-loss status");
        Ok(result.is_filled().then_some(result))
    }

    /// Place a stop-loss at `swing_low`. Failures are logged and retried on
    /// the next tick.
    async fn protect(&self, amount: Decimal, swing_low: f64) -> Option<PendingStop> {
        let Some(trigger) = Decimal::from_f64_retain(swing_low).map(|d| d.round_dp(8)) else {
            warn!(swing_low, "swing low is not a valid stop-loss trigger");
            return None;
        };
        if amount <= Decimal::ZERO {
            return None;
        }

        match self
            .exchange
            .place_stop_loss(&self.config.pair, amount, trigger)
            .await
        {
            Ok(handle) => {
                debug!(%handle, %trigger, %amount, "stop-loss placed");
                Some(PendingStop {
                    handle,
                    trigger,
                    amount,
                })
            }
            Err(e) => {
                warn!(%trigger, %amount, error = %e, "failed to place stop-loss, will retry next tick");
                None
            }
        }
    }

    /// Completed bars of `timeframe` closed by `as_of`, oldest first.
    async fn load_history(&self, timeframe: Timeframe, as_of: i64) -> TradingResult<Vec<Bar>> {
        let span = i64::try_from(self.config.history_bars)
            .ok()
            .and_then(|n| n.checked_mul(timeframe.as_millis()))
            .ok_or_else(|| TradingError::Internal("history window out of range".into()))?;
        let start = millis_to_datetime(as_of.saturating_sub(span))?;
        let end = millis_to_datetime(as_of)?;

        let mut bars = self
            .exchange
            .history(&self.config.pair, timeframe, start, end)
            .await?;
        for bar in &bars {
            bar.validate()?;
        }
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable.into());
        }
        Ok(bars)
    }

    /// Completed bars of `timeframe` strictly between `last` and `next`.
    async fn missed_bars(&self, timeframe: Timeframe, last: i64, next: i64) -> TradingResult<Vec<Bar>> {
        let start = millis_to_datetime(last + timeframe.as_millis())?;
        let end = millis_to_datetime(next)?;

        let mut bars = self
            .exchange
            .history(&self.config.pair, timeframe, start, end)
            .await?;
        bars.retain(|b| b.timestamp > last && b.timestamp < next);
        for bar in &bars {
            bar.validate()?;
        }
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Ok(bars)
    }

    /// Append one bar and its indicator point, returning what undoes it.
    fn ingest(&mut self, timeframe: Timeframe, bar: &Bar) -> TradingResult<Undo> {
        let evicted_bar = self.bars.push(*bar)?;
        match self.indicators.update(timeframe, bar.close) {
            Ok(evicted_point) => Ok((evicted_bar, evicted_point)),
            Err(e) => {
                self.bars.undo_push(evicted_bar);
                Err(e.into())
            }
        }
    }

    fn rollback(&mut self, timeframe: Timeframe, undo: Vec<Undo>) {
        for (evicted_bar, evicted_point) in undo.into_iter().rev() {
            self.indicators.undo_update(timeframe, evicted_point);
            self.bars.undo_push(evicted_bar);
        }
    }

    fn reseed(&mut self, timeframe: Timeframe, window: Vec<Bar>) {
        let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
        self.indicators.bootstrap(timeframe, &closes);
        self.bars.replace(timeframe, window);
    }

    /// Stop the old timer, replace bars and indicators, start the new timer.
    async fn switch_timeframe(&mut self, to: Timeframe, window: Vec<Bar>, reset_swing_low: bool) {
        self.scheduler.stop().await;
        self.reseed(to, window);
        if reset_swing_low {
            if let Some(low) = self.bars.lowest_low() {
                self.state.swing_low = low;
            }
        }
        self.scheduler.start(to).await;
        debug!(timeframe = %to, bars = self.bars.len(), "timeframe switched");
    }
}

fn ensure_filled(result: &OrderResult) -> TradingResult<()> {
    if result.is_filled() {
        Ok(())
    } else {
        Err(TradingError::OrderNotFilled {
            side: result.side,
            status: result.status,
        })
    }
}

fn millis_to_datetime(ms: i64) -> TradingResult<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| TradingError::Internal(format!("timestamp {ms} out of range")))
}
