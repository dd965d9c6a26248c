//! Throttled, change-triggered explanation of why no entry occurred.

use crate::manager::PositionManager;
use crate::resolver::SymbolResolver;
use crate::risk::RiskGate;
use chrono::{DateTime, Duration, Utc};
use orbit_core::{Config, EventKind, OptionSide, PerSide, TradeEvent};
use orbit_strategy::OrbBreakout;
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct DiagnosticsRecorder {
    cfg: Arc<Config>,
    last_emit: Option<DateTime<Utc>>,
    last_reasons: PerSide<Option<String>>,
}

impl DiagnosticsRecorder {
    #[must_use]
    pub fn new(cfg: Arc<Config>) -> Self {
        Self {
            cfg,
            last_emit: None,
            last_reasons: PerSide::default(),
        }
    }

    /// Builds the per-side reason lists by probing every entry gate in
    /// evaluation order, and emits one diagnostic line per side — only
    /// when forced, or when the throttle interval elapsed and the reason
    /// set changed.
    #[allow(clippy::too_many_arguments)]
    pub async fn maybe_emit(
        &mut self,
        now: DateTime<Utc>,
        index_price: Decimal,
        rsi: Option<f64>,
        orb: &OrbBreakout,
        state: &PositionManager,
        gate: &RiskGate,
        resolver: &mut SymbolResolver,
        force: bool,
    ) -> Vec<TradeEvent> {
        if !self.cfg.observability.diagnostics {
            return Vec::new();
        }

        if !force {
            if let Some(last) = self.last_emit {
                let interval =
                    Duration::seconds(self.cfg.observability.diag_interval_secs as i64);
                if now - last < interval {
                    return Vec::new();
                }
            }
        }

        let mut reasons: PerSide<String> = PerSide {
            call: String::new(),
            put: String::new(),
        };
        for side in OptionSide::both() {
            reasons.set(
                side,
                self.build_reasons(side, now, index_price, rsi, orb, state, gate, resolver)
                    .await,
            );
        }

        if self.cfg.observability.diag_only_on_change && !force {
            let unchanged = OptionSide::both().iter().all(|side| {
                self.last_reasons.get(*side).as_deref() == Some(reasons.get(*side).as_str())
            });
            if unchanged {
                return Vec::new();
            }
        }

        let rsi_text = rsi.map_or_else(|| "NA".to_string(), |v| format!("{v:.2}"));
        let events: Vec<TradeEvent> = OptionSide::both()
            .iter()
            .map(|side| {
                TradeEvent::new(now, EventKind::Diagnostic)
                    .with_side(*side)
                    .with_price(index_price)
                    .with_reason(format!(
                        "{} blocked: {} | IDX={index_price:.2} RSI={rsi_text}",
                        side.code(),
                        reasons.get(*side),
                    ))
                    .with_day_pnl(state.realized_pnl())
            })
            .collect();

        self.last_emit = Some(now);
        for side in OptionSide::both() {
            self.last_reasons.set(side, Some(reasons.get(side).clone()));
        }
        events
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_reasons(
        &self,
        side: OptionSide,
        now: DateTime<Utc>,
        index_price: Decimal,
        rsi: Option<f64>,
        orb: &OrbBreakout,
        state: &PositionManager,
        gate: &RiskGate,
        resolver: &mut SymbolResolver,
    ) -> String {
        let mut reasons: Vec<String> = Vec::new();

        let raw = match side {
            OptionSide::Call => orb.breakout_up(index_price),
            OptionSide::Put => orb.breakout_down(index_price),
        };
        if !raw {
            reasons.push(
                match side {
                    OptionSide::Call => "no_breakout_above_buffer",
                    OptionSide::Put => "no_breakdown_below_buffer",
                }
                .to_string(),
            );
        }
        if raw && !orb.rsi_allows(side, rsi) {
            reasons.push("rsi_block".to_string());
        }
        if self.cfg.core_position.prevent_duplicate_side && state.has_open_core_side(side) {
            reasons.push("duplicate_core".to_string());
        }
        if self.cfg.core_position.rearm_on_pullback && !orb.is_armed(side) {
            reasons.push("not_armed".to_string());
        }
        if state.daily_loss_hit() {
            reasons.push("daily_loss_hit".to_string());
        }
        if state.in_cooldown(now) {
            reasons.push("cooldown".to_string());
        }
        if state.open_positions().len() >= self.cfg.risk.max_concurrent {
            reasons.push("max_concurrent".to_string());
        }

        if raw {
            match resolver.estimate_entry(side).await {
                Ok((_, premium)) => {
                    if self.cfg.risk.use_projected_risk_block {
                        let risk = gate
                            .worst_case_loss(premium, self.cfg.core_position.initial_sl_pct);
                        if state.realized_pnl() - risk <= -self.cfg.risk.daily_loss_cap {
                            reasons.push("projected_risk_breach".to_string());
                        }
                    }
                }
                Err(e) => {
                    let mut text = e.to_string();
                    text.truncate(80);
                    reasons.push(format!("est_entry_failed:{text}"));
                }
            }
        }

        if reasons.is_empty() {
            "ok".to_string()
        } else {
            reasons.join(", ")
        }
    }
}
