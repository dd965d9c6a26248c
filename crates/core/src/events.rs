//! Structured trade-log events.
//!
//! Every significant engine action produces one `TradeEvent`, appended to
//! the `EventSink` collaborator and mirrored to `tracing`.

use crate::types::OptionSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of a structured trade-log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    OrbLevels,
    Enter,
    EnterState,
    Exit,
    ExitState,
    StopUpdate,
    TargetUpdate,
    Rearm,
    Snapshot,
    SnapshotPosition,
    MomentumShift,
    PriceState,
    StrategySignal,
    SymbolResolved,
    Diagnostic,
    Summary,
    Info,
}

impl EventKind {
    /// Stable wire name used in the CSV log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "SESSION_START",
            Self::SessionEnd => "SESSION_END",
            Self::OrbLevels => "ORB_LEVELS",
            Self::Enter => "ENTER",
            Self::EnterState => "ENTER_STATE",
            Self::Exit => "EXIT",
            Self::ExitState => "EXIT_STATE",
            Self::StopUpdate => "SL_UPDATE",
            Self::TargetUpdate => "TP_UPDATE",
            Self::Rearm => "REARM",
            Self::Snapshot => "SNAPSHOT",
            Self::SnapshotPosition => "SNAPSHOT_POS",
            Self::MomentumShift => "MOMENTUM_SHIFT",
            Self::PriceState => "PRICE_STATE",
            Self::StrategySignal => "STRAT_SIG",
            Self::SymbolResolved => "SYMBOL_OK",
            Self::Diagnostic => "DIAG_NO_ENTRY",
            Self::Summary => "SUMMARY",
            Self::Info => "INFO",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured trade-log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub symbol: String,
    pub side: Option<OptionSide>,
    pub price: Decimal,
    pub qty: u32,
    pub reason: String,
    pub pnl: Decimal,
    pub day_pnl: Decimal,
    pub extra: String,
}

impl TradeEvent {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            timestamp,
            kind,
            symbol: String::new(),
            side: None,
            price: Decimal::ZERO,
            qty: 0,
            reason: String::new(),
            pnl: Decimal::ZERO,
            day_pnl: Decimal::ZERO,
            extra: String::new(),
        }
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    #[must_use]
    pub fn with_side(mut self, side: OptionSide) -> Self {
        self.side = Some(side);
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    #[must_use]
    pub fn with_qty(mut self, qty: u32) -> Self {
        self.qty = qty;
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    #[must_use]
    pub fn with_pnl(mut self, pnl: Decimal) -> Self {
        self.pnl = pnl;
        self
    }

    #[must_use]
    pub fn with_day_pnl(mut self, day_pnl: Decimal) -> Self {
        self.day_pnl = day_pnl;
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }
}
