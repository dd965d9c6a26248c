//! Position manager — the sole mutator of the open-position set and the
//! session's P&L accounting.

use crate::position::{ExitReason, Position};
use crate::summary::ClosedTrade;
use chrono::{DateTime, Duration, Utc};
use orbit_core::{Config, OptionSide, PerSide};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Owns open positions, realized P&L, equity statistics, cooldowns, and
/// the entry timestamps the re-arm and stacking policies read.
pub struct PositionManager {
    cfg: Arc<Config>,
    next_id: u64,
    open: Vec<Position>,
    realized_pnl: Decimal,
    equity: Decimal,
    equity_peak: Decimal,
    max_drawdown: Decimal,
    trades: Vec<ClosedTrade>,
    cooldown_until: Option<DateTime<Utc>>,
    scalp_cooldown_until: Option<DateTime<Utc>>,
    last_scalp_entry: Option<DateTime<Utc>>,
    last_scalp_entry_by_side: PerSide<Option<DateTime<Utc>>>,
    last_core_entry_by_side: PerSide<Option<DateTime<Utc>>>,
    /// Latched once realized P&L breaches the daily cap; a later recovery
    /// by still-open positions must not re-open the entry gate.
    loss_lockout: bool,
}

impl PositionManager {
    #[must_use]
    pub fn new(cfg: Arc<Config>) -> Self {
        Self {
            cfg,
            next_id: 1,
            open: Vec::new(),
            realized_pnl: Decimal::ZERO,
            equity: Decimal::ZERO,
            equity_peak: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            trades: Vec::new(),
            cooldown_until: None,
            scalp_cooldown_until: None,
            last_scalp_entry: None,
            last_scalp_entry_by_side: PerSide::default(),
            last_core_entry_by_side: PerSide::default(),
            loss_lockout: false,
        }
    }

    // ---- read access ----

    #[must_use]
    pub fn open_positions(&self) -> &[Position] {
        &self.open
    }

    #[must_use]
    pub fn open_ids(&self) -> Vec<u64> {
        self.open.iter().map(|p| p.id).collect()
    }

    #[must_use]
    pub fn position(&self, id: u64) -> Option<&Position> {
        self.open.iter().find(|p| p.id == id)
    }

    pub fn position_mut(&mut self, id: u64) -> Option<&mut Position> {
        self.open.iter_mut().find(|p| p.id == id)
    }

    #[must_use]
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    #[must_use]
    pub fn max_drawdown(&self) -> Decimal {
        self.max_drawdown
    }

    #[must_use]
    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    #[must_use]
    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown_until
    }

    #[must_use]
    pub fn scalp_cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.scalp_cooldown_until
    }

    #[must_use]
    pub fn last_scalp_entry(&self) -> Option<DateTime<Utc>> {
        self.last_scalp_entry
    }

    #[must_use]
    pub fn last_scalp_entry_on(&self, side: OptionSide) -> Option<DateTime<Utc>> {
        *self.last_scalp_entry_by_side.get(side)
    }

    #[must_use]
    pub fn last_core_entry_on(&self, side: OptionSide) -> Option<DateTime<Utc>> {
        *self.last_core_entry_by_side.get(side)
    }

    /// True while the exit cooldown blocks new entries.
    #[must_use]
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// True while the scalp-specific cooldown is active.
    #[must_use]
    pub fn in_scalp_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.scalp_cooldown_until.is_some_and(|until| now < until)
    }

    #[must_use]
    pub fn has_open_core_side(&self, side: OptionSide) -> bool {
        self.open.iter().any(|p| p.side == side && p.is_core)
    }

    #[must_use]
    pub fn has_open_scalp_side(&self, side: OptionSide) -> bool {
        self.open.iter().any(|p| p.side == side && !p.is_core)
    }

    #[must_use]
    pub fn open_scalp_count(&self) -> usize {
        self.open.iter().filter(|p| !p.is_core).count()
    }

    /// Any open position whose stop has been ratcheted to or above entry.
    #[must_use]
    pub fn any_loss_proof(&self) -> bool {
        self.open.iter().any(Position::is_loss_proof)
    }

    /// Daily loss cap breached at any point this session — the lockout is
    /// monotonic for the rest of the session.
    #[must_use]
    pub fn daily_loss_hit(&self) -> bool {
        self.loss_lockout
    }

    // ---- mutation ----

    /// Creates an open position at the given entry price. Initial stop
    /// and target derive from the core or scalp percentages.
    pub fn open_position(
        &mut self,
        symbol: impl Into<String>,
        side: OptionSide,
        is_core: bool,
        entry_price: Decimal,
        now: DateTime<Utc>,
        note: impl Into<String>,
    ) -> &Position {
        let hundred = Decimal::from(100);
        let (sl_pct, tp_pct) = if is_core {
            (
                self.cfg.core_position.initial_sl_pct,
                self.cfg.core_position.initial_tp_pct,
            )
        } else {
            (self.cfg.scalp.sl_pct, self.cfg.scalp.tp_pct)
        };

        let position = Position {
            id: self.next_id,
            symbol: symbol.into(),
            side,
            is_core,
            note: note.into(),
            entry_time: now,
            entry_price,
            qty: self.cfg.risk.lot_size,
            stop_price: entry_price * (Decimal::ONE - sl_pct / hundred),
            target_price: entry_price * (Decimal::ONE + tp_pct / hundred),
            peak_price: entry_price,
            last_trail_level: Decimal::ZERO,
            history: Vec::new(),
        };
        self.next_id += 1;

        if is_core {
            self.last_core_entry_by_side.set(side, Some(now));
        } else {
            self.last_scalp_entry = Some(now);
            self.last_scalp_entry_by_side.set(side, Some(now));
        }

        self.open.push(position);
        self.open.last().expect("just pushed")
    }

    /// Finalizes an exit: realizes P&L net of both sides' costs, updates
    /// equity statistics, removes the position, and starts the cooldowns.
    pub fn close_position(
        &mut self,
        id: u64,
        exit_price: Decimal,
        reason: &ExitReason,
        now: DateTime<Utc>,
    ) -> Option<ClosedTrade> {
        let idx = self.open.iter().position(|p| p.id == id)?;
        let pos = self.open.remove(idx);

        let pnl = (exit_price - pos.entry_price) * Decimal::from(pos.qty)
            - Decimal::from(2) * self.cfg.risk.cost_per_side;
        self.realized_pnl += pnl;
        if self.realized_pnl <= -self.cfg.risk.daily_loss_cap {
            self.loss_lockout = true;
        }

        self.cooldown_until = Some(now + Duration::seconds(self.cfg.risk.cooldown_secs as i64));
        if !pos.is_core {
            self.scalp_cooldown_until =
                Some(now + Duration::seconds(self.cfg.scalp.cooldown_secs as i64));
        }

        self.equity += pnl;
        if self.equity > self.equity_peak {
            self.equity_peak = self.equity;
        }
        let drawdown = self.equity_peak - self.equity;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }

        let trade = ClosedTrade {
            symbol: pos.symbol,
            side: pos.side,
            is_core: pos.is_core,
            reason: reason.to_string(),
            pnl,
            hold_min: (now - pos.entry_time).num_seconds() as f64 / 60.0,
            entry_time: pos.entry_time,
            exit_time: now,
        };
        self.trades.push(trade.clone());
        Some(trade)
    }
}
