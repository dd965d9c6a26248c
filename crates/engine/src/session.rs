//! The session loop: one fixed-cadence tick — data refresh, bookkeeping,
//! position management, ordered entry evaluation — plus startup and the
//! guaranteed end-of-session summary.

use crate::diagnostics::DiagnosticsRecorder;
use crate::exits::{apply_dynamic_target, check_drawdown, check_hard_exit, check_scalp_timeout};
use crate::manager::PositionManager;
use crate::momentum::MomentumTracker;
use crate::position::{ExitReason, Position};
use crate::resolver::SymbolResolver;
use crate::risk::RiskGate;
use crate::summary::SessionSummary;
use crate::trailing::{apply_stop_ratchets, StopAdjustment};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use orbit_core::{
    Candle, Clock, Config, EventKind, EventSink, MarketData, OptionSide, Resolution, TradeEvent,
};
use orbit_indicators::{opening_range, post_open, rsi_from_1m};
use orbit_strategy::{
    classify, route, BbScalp, OrbBreakout, SecondaryKind, Strategy, StrategyContext,
    SupertrendTrend, VwapReversion,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// What a single tick decided about the loop's future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Normal tick; sleep and go again.
    Continue,
    /// Index quote failed; nothing ran, retry after the pause.
    Skipped,
    /// Square-off boundary reached; the session is over.
    SessionOver,
}

/// Single-threaded, tick-driven session orchestrator. All engine state is
/// owned here and mutated only inside `tick`.
pub struct SessionLoop {
    cfg: Arc<Config>,
    market: Arc<dyn MarketData>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    orb: OrbBreakout,
    bb: BbScalp,
    trend: SupertrendTrend,
    vwap: VwapReversion,
    manager: PositionManager,
    risk: RiskGate,
    diagnostics: DiagnosticsRecorder,
    resolver: SymbolResolver,
    momentum: MomentumTracker,
    rsi: Option<f64>,
    last_snapshot: Option<DateTime<Utc>>,
    last_rsi_refresh_minute: Option<i64>,
    summary_emitted: bool,
}

impl SessionLoop {
    #[must_use]
    pub fn new(
        cfg: Config,
        market: Arc<dyn MarketData>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cfg = Arc::new(cfg);
        let index = cfg.instrument.index_symbol.clone();

        let orb = OrbBreakout::new(
            cfg.strategies.orb.clone(),
            cfg.rsi.clone(),
            cfg.core_position.rearm_on_pullback,
        );
        let bb = BbScalp::new(
            market.clone(),
            index.clone(),
            cfg.strategies.bb.clone(),
            cfg.session.clone(),
        );
        let trend = SupertrendTrend::new(
            market.clone(),
            index.clone(),
            cfg.strategies.supertrend.clone(),
            cfg.rsi.clone(),
            cfg.session.clone(),
        );
        let vwap = VwapReversion::new(
            market.clone(),
            index,
            cfg.strategies.vwap.clone(),
            cfg.session.clone(),
        );

        Self {
            manager: PositionManager::new(cfg.clone()),
            risk: RiskGate::new(cfg.clone()),
            diagnostics: DiagnosticsRecorder::new(cfg.clone()),
            resolver: SymbolResolver::new(market.clone(), cfg.instrument.clone()),
            momentum: MomentumTracker::new(cfg.rsi.clone()),
            orb,
            bb,
            trend,
            vwap,
            cfg,
            market,
            sink,
            clock,
            rsi: None,
            last_snapshot: None,
            last_rsi_refresh_minute: None,
            summary_emitted: false,
        }
    }

    /// Read access for tests and the snapshot command.
    #[must_use]
    pub fn manager(&self) -> &PositionManager {
        &self.manager
    }

    #[must_use]
    pub fn current_rsi(&self) -> Option<f64> {
        self.rsi
    }

    /// Runs the session to completion. The end-of-session summary is
    /// emitted exactly once on every exit path, normal or failed.
    pub async fn run(&mut self) -> Result<()> {
        let outcome = self.drive().await;
        self.finalize().await;
        outcome
    }

    async fn drive(&mut self) -> Result<()> {
        self.prepare().await?;
        loop {
            match self.tick().await? {
                TickOutcome::SessionOver => return Ok(()),
                TickOutcome::Continue | TickOutcome::Skipped => {
                    tokio::time::sleep(std::time::Duration::from_millis(
                        self.cfg.session.tick_interval_ms,
                    ))
                    .await;
                }
            }
        }
    }

    /// Session startup: gateway check, session header, opening-range
    /// levels, initial RSI. Missing opening-range history is fatal.
    pub async fn prepare(&mut self) -> Result<()> {
        let now = self.clock.now();
        let index = self.cfg.instrument.index_symbol.clone();

        self.market
            .quote(&index)
            .await
            .context("startup index quote failed")?;

        let today = self.cfg.session.local_date(now);
        let header = match prev_trading_close(
            self.market.as_ref(),
            &index,
            today,
            self.cfg.session.offset(),
        )
        .await
        {
            Ok(Some((date, close))) => {
                format!("Today={today} PrevCloseDate={date} PrevClose={close:.2}")
            }
            _ => format!("Today={today} PrevCloseDate=NA PrevClose=NA"),
        };
        self.emit(
            TradeEvent::new(now, EventKind::SessionStart)
                .with_reason(header)
                .with_day_pnl(self.manager.realized_pnl()),
        )
        .await;

        if !self.cfg.session.start_immediately {
            while self.cfg.session.local_time(self.clock.now()) < self.cfg.session.or_end {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }

        let candles = self.startup_candles().await?;
        let range = opening_range(
            &candles,
            self.cfg.session.open,
            self.cfg.session.or_end,
            self.cfg.session.offset(),
        )
        .ok_or_else(|| anyhow!("no candles inside the opening-range window"))?;
        self.orb.set_levels(range);

        if self.cfg.rsi.enabled {
            let post = post_open(&candles, self.cfg.session.open, self.cfg.session.offset());
            self.rsi = rsi_from_1m(&post, self.cfg.rsi.period, self.cfg.rsi.timeframe_min);
        }

        let rsi_text = self
            .rsi
            .map_or_else(|| "NA".to_string(), |v| format!("{v:.2}"));
        self.emit(
            TradeEvent::new(self.clock.now(), EventKind::OrbLevels)
                .with_reason(format!(
                    "ORH={} ORL={} RSI={rsi_text}",
                    fmt_price(self.orb.or_high()),
                    fmt_price(self.orb.or_low()),
                ))
                .with_day_pnl(self.manager.realized_pnl()),
        )
        .await;

        Ok(())
    }

    /// Today's 1-minute candles, falling back to the most recent trading
    /// day when enabled. Empty everywhere is fatal.
    async fn startup_candles(&self) -> Result<Vec<Candle>> {
        let index = &self.cfg.instrument.index_symbol;
        let today = self.cfg.session.local_date(self.clock.now());

        let candles = self
            .market
            .history(index, Resolution::Minute, today, today)
            .await
            .unwrap_or_default();
        if !candles.is_empty() {
            return Ok(candles);
        }

        if self.cfg.session.use_prev_day_when_empty {
            for days_back in 1..=7 {
                let day = today - Duration::days(days_back);
                let candles = self
                    .market
                    .history(index, Resolution::Minute, day, day)
                    .await
                    .unwrap_or_default();
                if !candles.is_empty() {
                    self.emit(
                        TradeEvent::new(self.clock.now(), EventKind::Info)
                            .with_reason(format!("No 1m data for today yet; using {day}")),
                    )
                    .await;
                    return Ok(candles);
                }
            }
        }

        Err(anyhow!(
            "no 1-minute history available to compute the opening range"
        ))
    }

    /// One tick of the decision loop, in the fixed order the session
    /// contract specifies. Public so tests can drive the loop with a
    /// manual clock.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let now = self.clock.now();

        if self.cfg.session.local_time(now) >= self.cfg.session.square_off {
            self.square_off_all(now).await;
            self.emit(
                TradeEvent::new(now, EventKind::SessionEnd)
                    .with_reason("Square-off reached")
                    .with_day_pnl(self.manager.realized_pnl()),
            )
            .await;
            return Ok(TickOutcome::SessionOver);
        }

        let index_price = match self.market.quote(&self.cfg.instrument.index_symbol).await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(error = %e, "index quote failed, skipping tick");
                return Ok(TickOutcome::Skipped);
            }
        };

        self.observe_momentum(now, index_price).await;

        if self.snapshot_due(now) {
            self.snapshot(now, index_price).await;
        }

        self.refresh_rsi(now).await;
        self.timed_rearm(now).await;
        self.manage_positions(now).await;

        if self.manager.daily_loss_hit() {
            return Ok(TickOutcome::Continue);
        }

        let entered = self.evaluate_entries(now, index_price).await?;
        if !entered {
            let events = self
                .diagnostics
                .maybe_emit(
                    now,
                    index_price,
                    self.rsi,
                    &self.orb,
                    &self.manager,
                    &self.risk,
                    &mut self.resolver,
                    false,
                )
                .await;
            for event in events {
                self.emit(event).await;
            }
        }

        Ok(TickOutcome::Continue)
    }

    /// Emits the end-of-session summary exactly once.
    pub async fn finalize(&mut self) {
        if self.summary_emitted {
            return;
        }
        self.summary_emitted = true;

        let now = self.clock.now();
        let summary = SessionSummary::from_trades(self.manager.trades());
        for (name, value) in summary.rows() {
            self.emit(
                TradeEvent::new(now, EventKind::Summary)
                    .with_reason(name)
                    .with_pnl(value.parse().unwrap_or(Decimal::ZERO))
                    .with_extra(value)
                    .with_day_pnl(self.manager.realized_pnl()),
            )
            .await;
        }
        self.emit(
            TradeEvent::new(now, EventKind::Summary)
                .with_reason("max_drawdown")
                .with_pnl(self.manager.max_drawdown())
                .with_extra(self.manager.max_drawdown().to_string())
                .with_day_pnl(self.manager.realized_pnl()),
        )
        .await;

        tracing::info!(
            trades = summary.total,
            wins = summary.wins,
            losses = summary.losses,
            total_pnl = %summary.total_pnl,
            max_drawdown = %self.manager.max_drawdown(),
            "session summary"
        );
    }

    // ---- tick stages ----

    async fn observe_momentum(&mut self, now: DateTime<Utc>, index_price: Decimal) {
        let update = self.momentum.observe(
            index_price,
            self.rsi,
            self.orb.hi_band(),
            self.orb.lo_band(),
        );

        if self.cfg.observability.momentum_logs {
            if let Some((from, to)) = update.regime_change {
                self.emit(
                    TradeEvent::new(now, EventKind::MomentumShift)
                        .with_price(index_price)
                        .with_reason(format!(
                            "RSI regime {} -> {}",
                            from.map_or("NA", |r| r.as_str()),
                            to.as_str()
                        ))
                        .with_day_pnl(self.manager.realized_pnl()),
                )
                .await;
            }
            if let Some((from, to)) = update.zone_change {
                self.emit(
                    TradeEvent::new(now, EventKind::PriceState)
                        .with_price(index_price)
                        .with_reason(format!(
                            "Zone {} -> {} (IDX={index_price:.2})",
                            from.map_or("NA", |z| z.as_str()),
                            to.as_str()
                        ))
                        .with_day_pnl(self.manager.realized_pnl()),
                )
                .await;
            }
        }

        if update.pulled_back_inside && self.cfg.core_position.rearm_on_pullback {
            for side in OptionSide::both() {
                if !self.orb.is_armed(side) {
                    self.orb.arm(side);
                    self.emit(
                        TradeEvent::new(now, EventKind::Rearm)
                            .with_side(side)
                            .with_reason(format!(
                                "{side} re-armed on pullback inside the opening range"
                            ))
                            .with_day_pnl(self.manager.realized_pnl()),
                    )
                    .await;
                }
            }
        }
    }

    fn snapshot_due(&self, now: DateTime<Utc>) -> bool {
        self.last_snapshot.map_or(true, |last| {
            (now - last).num_seconds() >= self.cfg.observability.snapshot_interval_secs as i64
        })
    }

    async fn snapshot(&mut self, now: DateTime<Utc>, index_price: Decimal) {
        let cooldown_remaining = self
            .manager
            .cooldown_until()
            .map_or(0, |until| (until - now).num_seconds().max(0));
        let rsi_text = self
            .rsi
            .map_or_else(|| "NA".to_string(), |v| format!("{v:.2}"));

        self.emit(
            TradeEvent::new(now, EventKind::Snapshot)
                .with_price(index_price)
                .with_reason(format!(
                    "IDX={index_price:.2} ORH={} ORL={} HI_BUF={} LO_BUF={} RSI={rsi_text} \
                     Armed(L/S)={}/{} CD={cooldown_remaining}s OpenPos={}",
                    fmt_price(self.orb.or_high()),
                    fmt_price(self.orb.or_low()),
                    fmt_price(self.orb.hi_band()),
                    fmt_price(self.orb.lo_band()),
                    self.orb.is_armed(OptionSide::Call),
                    self.orb.is_armed(OptionSide::Put),
                    self.manager.open_positions().len(),
                ))
                .with_day_pnl(self.manager.realized_pnl()),
        )
        .await;

        if self.manager.open_positions().is_empty() {
            self.emit(
                TradeEvent::new(now, EventKind::SnapshotPosition)
                    .with_reason("None")
                    .with_day_pnl(self.manager.realized_pnl()),
            )
            .await;
        } else {
            for id in self.manager.open_ids() {
                let pos = match self.manager.position(id) {
                    Some(pos) => pos.clone(),
                    None => continue,
                };
                let price_text = match self.market.quote(&pos.symbol).await {
                    Ok(p) => format!("{p:.2}"),
                    Err(_) => "NA".to_string(),
                };
                self.emit(
                    TradeEvent::new(now, EventKind::SnapshotPosition)
                        .with_symbol(pos.symbol.as_str())
                        .with_side(pos.side)
                        .with_reason(format!(
                            "{} {} [{}] EP={:.2} CP={price_text} SL={:.2} TP={:.2}",
                            if pos.is_core { "CORE" } else { "SCALP" },
                            pos.side,
                            pos.symbol,
                            pos.entry_price,
                            pos.stop_price,
                            pos.target_price,
                        ))
                        .with_day_pnl(self.manager.realized_pnl()),
                )
                .await;
            }
        }

        self.last_snapshot = Some(now);
    }

    /// Refreshes the RSI from freshly aggregated candles once per minute
    /// boundary; failures retain the previous value.
    async fn refresh_rsi(&mut self, now: DateTime<Utc>) {
        if !self.cfg.rsi.enabled {
            return;
        }
        let minute = now.timestamp().div_euclid(60);
        if self.last_rsi_refresh_minute == Some(minute) {
            return;
        }
        self.last_rsi_refresh_minute = Some(minute);

        let today = self.cfg.session.local_date(now);
        match self
            .market
            .history(
                &self.cfg.instrument.index_symbol,
                Resolution::Minute,
                today,
                today,
            )
            .await
        {
            Ok(candles) if !candles.is_empty() => {
                let post =
                    post_open(&candles, self.cfg.session.open, self.cfg.session.offset());
                if let Some(value) =
                    rsi_from_1m(&post, self.cfg.rsi.period, self.cfg.rsi.timeframe_min)
                {
                    self.rsi = Some(value);
                }
            }
            _ => {} // keep the previous value
        }
    }

    async fn timed_rearm(&mut self, now: DateTime<Utc>) {
        let floor = Duration::seconds(self.cfg.core_position.rearm_secs as i64);
        for side in OptionSide::both() {
            if self.orb.is_armed(side) {
                continue;
            }
            let Some(last_entry) = self.manager.last_core_entry_on(side) else {
                continue;
            };
            if now - last_entry >= floor {
                self.orb.arm(side);
                self.emit(
                    TradeEvent::new(now, EventKind::Rearm)
                        .with_side(side)
                        .with_reason(format!(
                            "{side} timed re-arm after {}s",
                            self.cfg.core_position.rearm_secs
                        ))
                        .with_day_pnl(self.manager.realized_pnl()),
                )
                .await;
            }
        }
    }

    /// Per-position update in the lifecycle order; a quote failure skips
    /// only that position this tick.
    async fn manage_positions(&mut self, now: DateTime<Utc>) {
        for id in self.manager.open_ids() {
            let symbol = match self.manager.position(id) {
                Some(pos) => pos.symbol.clone(),
                None => continue,
            };
            let price = match self.market.quote(&symbol).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::debug!(symbol, error = %e, "position quote failed, skipped this tick");
                    continue;
                }
            };

            let adjustments = {
                let pos = match self.manager.position_mut(id) {
                    Some(pos) => pos,
                    None => continue,
                };
                pos.record(now, price);
                apply_stop_ratchets(pos, price, &self.cfg.core_position)
            };
            for adjustment in &adjustments {
                self.emit_stop_update(id, price, adjustment, now).await;
            }

            let drawdown = self
                .manager
                .position(id)
                .and_then(|pos| check_drawdown(pos, price, &self.cfg.core_position, &self.cfg.scalp));
            if let Some(reason) = drawdown {
                self.exit_position(id, price, reason, now).await;
                continue;
            }

            let target_adjustment = self
                .manager
                .position_mut(id)
                .and_then(|pos| apply_dynamic_target(pos, price, now, &self.cfg.timing));
            if let Some(adj) = target_adjustment {
                let pos = match self.manager.position(id) {
                    Some(pos) => pos.clone(),
                    None => continue,
                };
                self.emit(
                    self.pos_state_event(
                        EventKind::TargetUpdate,
                        &pos,
                        price,
                        now,
                        &format!(
                            "TP {:.2} -> {:.2} (held {:.1}m, profit {:.1}%)",
                            adj.from, adj.to, adj.held_min, adj.profit_pct
                        ),
                    ),
                )
                .await;
            }

            let hard = self
                .manager
                .position(id)
                .and_then(|pos| check_hard_exit(pos, price));
            if let Some(reason) = hard {
                self.exit_position(id, price, reason, now).await;
                continue;
            }

            let timeout = self
                .manager
                .position(id)
                .and_then(|pos| check_scalp_timeout(pos, now, self.cfg.scalp.max_hold_min));
            if let Some(reason) = timeout {
                self.exit_position(id, price, reason, now).await;
            }
        }
    }

    /// Strict-priority entry evaluation; at most one position opens per
    /// tick.
    async fn evaluate_entries(&mut self, now: DateTime<Utc>, index_price: Decimal) -> Result<bool> {
        let ctx = StrategyContext {
            now,
            index_price,
            rsi: self.rsi,
        };

        // (a) core breakout, with duplicate prevention and the
        // opposite-hedge substitution
        if let Some(natural) = self.orb.signal(&ctx).await? {
            let duplicate = self.cfg.core_position.prevent_duplicate_side
                && self.manager.has_open_core_side(natural);
            if !duplicate {
                if self.try_enter(natural, true, "CORE", now).await {
                    return Ok(true);
                }
            } else if self.cfg.risk.allow_opposite_if_safe
                && self.manager.any_loss_proof()
                && self.manager.open_positions().len() < self.cfg.risk.max_concurrent
            {
                let opposite = natural.opposite();
                if self.try_enter(opposite, false, "SCALP opposite-hedge", now).await {
                    return Ok(true);
                }
            }
        }

        // (b) band scalper, under its stacking guard
        if self.cfg.scalp.enabled
            && !self.manager.in_scalp_cooldown(now)
            && !self.manager.daily_loss_hit()
            && self.manager.open_positions().len() < self.cfg.risk.max_concurrent
        {
            if let Some(side) = self.bb.signal(&ctx).await? {
                if self.risk.can_open_scalp(&self.manager, now, side)
                    && self.try_enter(side, false, "SCALP", now).await
                {
                    return Ok(true);
                }
            }
        }

        // (c) regime-routed secondary, opened as a scalp
        let regime = classify(
            index_price,
            self.rsi,
            self.orb.hi_band(),
            self.orb.lo_band(),
            self.cfg.rsi.long_min,
            self.cfg.rsi.short_max,
        );
        for kind in route(regime) {
            let signal = match kind {
                SecondaryKind::TrendFollow => self.trend.signal(&ctx).await?,
                SecondaryKind::Reversion => self.vwap.signal(&ctx).await?,
            };
            if let Some(side) = signal {
                // explain the surrounding gate state at signal time
                let events = self
                    .diagnostics
                    .maybe_emit(
                        now,
                        index_price,
                        self.rsi,
                        &self.orb,
                        &self.manager,
                        &self.risk,
                        &mut self.resolver,
                        true,
                    )
                    .await;
                for event in events {
                    self.emit(event).await;
                }
                return Ok(self.try_enter(side, false, "SCALP", now).await);
            }
        }

        Ok(false)
    }

    /// One entry attempt: resolve + estimate, pass the risk gate, open.
    /// Resolution or estimate failure abandons only this attempt.
    async fn try_enter(
        &mut self,
        side: OptionSide,
        is_core: bool,
        note: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let (symbol, premium) = match self.resolver.estimate_entry(side).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(side = %side, error = %e, "entry estimate failed, attempt abandoned");
                return false;
            }
        };

        let sl_pct = if is_core {
            self.cfg.core_position.initial_sl_pct
        } else {
            self.cfg.scalp.sl_pct
        };
        if !self.risk.can_enter(&self.manager, now, Some(premium), sl_pct) {
            return false;
        }

        let position = self
            .manager
            .open_position(symbol, side, is_core, premium, now, note)
            .clone();

        self.emit(
            TradeEvent::new(now, EventKind::Enter)
                .with_symbol(position.symbol.as_str())
                .with_side(side)
                .with_price(premium)
                .with_qty(position.qty)
                .with_reason(format!("New {}", if is_core { "CORE" } else { "SCALP" }))
                .with_day_pnl(self.manager.realized_pnl()),
        )
        .await;
        self.emit(self.pos_state_event(EventKind::EnterState, &position, premium, now, note))
            .await;

        true
    }

    async fn exit_position(
        &mut self,
        id: u64,
        exit_price: Decimal,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) {
        let pos = match self.manager.position(id) {
            Some(pos) => pos.clone(),
            None => return,
        };
        self.emit(self.pos_state_event(
            EventKind::ExitState,
            &pos,
            exit_price,
            now,
            &format!("reason={reason}"),
        ))
        .await;

        if let Some(trade) = self.manager.close_position(id, exit_price, &reason, now) {
            self.emit(
                TradeEvent::new(now, EventKind::Exit)
                    .with_symbol(trade.symbol.as_str())
                    .with_side(trade.side)
                    .with_price(exit_price)
                    .with_qty(pos.qty)
                    .with_reason(reason.to_string())
                    .with_pnl(trade.pnl)
                    .with_day_pnl(self.manager.realized_pnl()),
            )
            .await;
        }
    }

    /// Forced exit of every open position at the session boundary. A
    /// quote failure falls back to the last observed price so square-off
    /// can never strand a position.
    async fn square_off_all(&mut self, now: DateTime<Utc>) {
        for id in self.manager.open_ids() {
            let pos = match self.manager.position(id) {
                Some(pos) => pos.clone(),
                None => continue,
            };
            let price = match self.market.quote(&pos.symbol).await {
                Ok(price) => price,
                Err(e) => {
                    let fallback = pos
                        .history
                        .last()
                        .map_or(pos.entry_price, |(_, price)| *price);
                    tracing::warn!(
                        symbol = pos.symbol,
                        error = %e,
                        fallback = %fallback,
                        "square-off quote failed, using last observed price"
                    );
                    fallback
                }
            };
            self.exit_position(id, price, ExitReason::SquareOff, now).await;
        }
    }

    // ---- helpers ----

    async fn emit_stop_update(
        &mut self,
        id: u64,
        price: Decimal,
        adjustment: &StopAdjustment,
        now: DateTime<Utc>,
    ) {
        let pos = match self.manager.position(id) {
            Some(pos) => pos.clone(),
            None => return,
        };
        let extra = match adjustment {
            StopAdjustment::Breakeven { from, to } => {
                format!("breakeven SL {from:.2} -> {to:.2}")
            }
            StopAdjustment::Trail {
                level_pct,
                from,
                to,
            } => format!("level={level_pct} SL {from:.2} -> {to:.2}"),
        };
        self.emit(self.pos_state_event(EventKind::StopUpdate, &pos, price, now, &extra))
            .await;
    }

    fn pos_state_event(
        &self,
        kind: EventKind,
        pos: &Position,
        price: Decimal,
        now: DateTime<Utc>,
        extra: &str,
    ) -> TradeEvent {
        let mut snap = format!(
            "EP={:.2} CP={price:.2} SL={:.2} TP={:.2}",
            pos.entry_price, pos.stop_price, pos.target_price
        );
        if !extra.is_empty() {
            snap.push_str(" | ");
            snap.push_str(extra);
        }
        TradeEvent::new(now, kind)
            .with_symbol(pos.symbol.as_str())
            .with_side(pos.side)
            .with_price(price)
            .with_qty(pos.qty)
            .with_reason(snap)
            .with_day_pnl(self.manager.realized_pnl())
    }

    /// Mirrors every event to tracing and appends it to the sink; a sink
    /// failure is logged, never fatal.
    async fn emit(&self, event: TradeEvent) {
        tracing::info!(
            kind = %event.kind,
            symbol = %event.symbol,
            side = ?event.side,
            price = %event.price,
            reason = %event.reason,
            pnl = %event.pnl,
            day_pnl = %event.day_pnl,
            "trade event"
        );
        if let Err(e) = self.sink.record(&event).await {
            tracing::warn!(error = %e, "event sink append failed");
        }
    }
}

/// Most recent daily close strictly before `today`, scanning back over
/// the broker's daily history.
pub async fn prev_trading_close(
    market: &dyn MarketData,
    symbol: &str,
    today: NaiveDate,
    offset: FixedOffset,
) -> Result<Option<(NaiveDate, Decimal)>> {
    let from = today - Duration::days(15);
    let to = today - Duration::days(1);
    let daily = market.history(symbol, Resolution::Day, from, to).await?;
    Ok(daily
        .last()
        .map(|candle| (candle.timestamp.with_timezone(&offset).date_naive(), candle.close)))
}

fn fmt_price(value: Option<Decimal>) -> String {
    value.map_or_else(|| "NA".to_string(), |v| format!("{v:.2}"))
}
