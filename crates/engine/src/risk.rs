//! Admission control for new positions.

use crate::manager::PositionManager;
use chrono::{DateTime, Utc};
use orbit_core::{Config, OptionSide};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Pure predicate over the session state — never mutates, never errors.
/// Rejections surface through diagnostics only.
pub struct RiskGate {
    cfg: Arc<Config>,
}

impl RiskGate {
    #[must_use]
    pub fn new(cfg: Arc<Config>) -> Self {
        Self { cfg }
    }

    /// Admission check shared by core and scalp entries; callers pass the
    /// stop-loss percentage matching the entry kind.
    ///
    /// Rejects on the daily-loss lockout, the concurrency cap, an active
    /// cooldown, or (when enabled and an estimate is available) a
    /// projected worst-case loss that would breach the daily cap.
    #[must_use]
    pub fn can_enter(
        &self,
        state: &PositionManager,
        now: DateTime<Utc>,
        est_entry: Option<Decimal>,
        sl_pct: Decimal,
    ) -> bool {
        if state.daily_loss_hit() {
            return false;
        }
        if state.open_positions().len() >= self.cfg.risk.max_concurrent {
            return false;
        }
        if state.in_cooldown(now) {
            return false;
        }

        if self.cfg.risk.use_projected_risk_block {
            if let Some(entry) = est_entry {
                let risk = self.worst_case_loss(entry, sl_pct);
                let projected = state.realized_pnl() - risk;
                if projected <= -self.cfg.risk.daily_loss_cap {
                    return false;
                }
            }
        }

        true
    }

    /// Hypothetical loss if the position went straight to its stop, costs
    /// included.
    #[must_use]
    pub fn worst_case_loss(&self, entry: Decimal, sl_pct: Decimal) -> Decimal {
        let stop = entry * (Decimal::ONE - sl_pct / Decimal::from(100));
        (entry - stop) * Decimal::from(self.cfg.risk.lot_size)
            + Decimal::from(2) * self.cfg.risk.cost_per_side
    }

    /// Scalp stacking guard: total-open cap, per-side cap, and the
    /// minimum gap since the previous scalp entry (global and per side).
    #[must_use]
    pub fn can_open_scalp(
        &self,
        state: &PositionManager,
        now: DateTime<Utc>,
        side: OptionSide,
    ) -> bool {
        if state.open_scalp_count() >= self.cfg.scalp.max_open {
            return false;
        }
        if self.cfg.scalp.max_per_side > 0 && state.has_open_scalp_side(side) {
            return false;
        }

        let min_gap = chrono::Duration::seconds(self.cfg.scalp.entry_min_gap_secs as i64);
        if let Some(last) = state.last_scalp_entry() {
            if now - last < min_gap {
                return false;
            }
        }
        if let Some(last) = state.last_scalp_entry_on(side) {
            if now - last < min_gap {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::ExitReason;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn setup() -> (Arc<Config>, PositionManager, RiskGate) {
        let cfg = Arc::new(Config::default());
        let mgr = PositionManager::new(cfg.clone());
        let gate = RiskGate::new(cfg.clone());
        (cfg, mgr, gate)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 25, 5, 0, 0).unwrap()
    }

    #[test]
    fn clean_state_admits_an_entry() {
        let (_, mgr, gate) = setup();
        assert!(gate.can_enter(&mgr, t0(), Some(dec!(150)), dec!(25)));
    }

    #[test]
    fn concurrency_cap_rejects() {
        let (_, mut mgr, gate) = setup();
        mgr.open_position("A", OptionSide::Call, true, dec!(100), t0(), "");
        mgr.open_position("B", OptionSide::Put, true, dec!(100), t0(), "");
        assert!(!gate.can_enter(&mgr, t0(), Some(dec!(100)), dec!(25)));
    }

    #[test]
    fn cooldown_rejects_until_elapsed() {
        let (_, mut mgr, gate) = setup();
        let id = mgr
            .open_position("A", OptionSide::Call, true, dec!(100), t0(), "")
            .id;
        mgr.close_position(id, dec!(101), &ExitReason::TakeProfit, t0());

        assert!(!gate.can_enter(&mgr, t0() + Duration::seconds(30), Some(dec!(100)), dec!(25)));
        assert!(gate.can_enter(&mgr, t0() + Duration::seconds(61), Some(dec!(100)), dec!(25)));
    }

    #[test]
    fn exact_cap_loss_locks_out_entries_for_good() {
        // lot 50 so the -2000 books exactly: (60.8-100)*50 - 40 = -2000
        let mut cfg = Config::default();
        cfg.risk.lot_size = 50;
        let cfg = Arc::new(cfg);
        let mut mgr = PositionManager::new(cfg.clone());
        let gate = RiskGate::new(cfg);

        let id = mgr
            .open_position("A", OptionSide::Call, true, dec!(100), t0(), "")
            .id;
        let trade = mgr
            .close_position(id, dec!(60.8), &ExitReason::StopLoss, t0())
            .unwrap();
        assert_eq!(trade.pnl, dec!(-2000));

        // rejected no matter how favorable the later estimate
        assert!(!gate.can_enter(
            &mgr,
            t0() + Duration::hours(1),
            Some(dec!(500)),
            dec!(25)
        ));
    }

    #[test]
    fn projected_risk_block_rejects_near_the_cap() {
        let (_, mut mgr, gate) = setup();
        // book a -1780 loss: (76.8-100)*75 - 40
        let id = mgr
            .open_position("A", OptionSide::Call, true, dec!(100), t0(), "")
            .id;
        mgr.close_position(id, dec!(76.8), &ExitReason::StopLoss, t0());
        assert_eq!(mgr.realized_pnl(), dec!(-1780));

        let now = t0() + Duration::seconds(120); // past the cooldown
        // worst case for a 100-premium core entry: 25*75 + 40 = 1915 ⇒
        // projected -3695 breaches the cap
        assert!(!gate.can_enter(&mgr, now, Some(dec!(100)), dec!(25)));
        // a 5-premium entry risks 1.25*75 + 40 = 133.75 ⇒ -1913.75, admitted
        assert!(gate.can_enter(&mgr, now, Some(dec!(5)), dec!(25)));
        // with no estimate available the projection is skipped
        assert!(gate.can_enter(&mgr, now, None, dec!(25)));
    }

    #[test]
    fn scalp_stacking_guard() {
        let (_, mut mgr, gate) = setup();
        let now = t0();
        assert!(gate.can_open_scalp(&mgr, now, OptionSide::Call));

        mgr.open_position("S", OptionSide::Call, false, dec!(100), now, "SCALP");
        // max_open = 1: everything rejected while it stays open
        assert!(!gate.can_open_scalp(&mgr, now, OptionSide::Call));
        assert!(!gate.can_open_scalp(&mgr, now, OptionSide::Put));

        let id = mgr.open_positions()[0].id;
        mgr.close_position(id, dec!(101), &ExitReason::TakeProfit, now);

        // closed, but the 180s entry gap still blocks
        assert!(!gate.can_open_scalp(
            &mgr,
            now + Duration::seconds(100),
            OptionSide::Put
        ));
        assert!(gate.can_open_scalp(
            &mgr,
            now + Duration::seconds(181),
            OptionSide::Put
        ));
    }
}
