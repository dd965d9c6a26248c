//! Exit rules evaluated per tick, after the stop ratchets.

use crate::position::{ExitReason, Position};
use chrono::{DateTime, Utc};
use orbit_core::{CorePositionConfig, ScalpConfig, TimingConfig};
use rust_decimal::Decimal;

/// Drawdown exit: only armed once the peak has cleared entry by the
/// configured minimum gain (core and scalp carry separate thresholds);
/// fires when the retracement from peak reaches the hard-drop limit.
#[must_use]
pub fn check_drawdown(
    pos: &Position,
    price: Decimal,
    core_cfg: &CorePositionConfig,
    scalp_cfg: &ScalpConfig,
) -> Option<ExitReason> {
    let (min_gain, dd_limit) = if pos.is_core {
        (core_cfg.min_peak_gain_pct, core_cfg.dd_hard_drop_pct)
    } else {
        (scalp_cfg.min_peak_gain_pct, scalp_cfg.dd_hard_drop_pct)
    };

    let hundred = Decimal::from(100);
    let arming_floor = pos.entry_price * (Decimal::ONE + min_gain / hundred);
    if pos.peak_price < arming_floor {
        return None;
    }

    let dd_pct = (pos.peak_price - price) * hundred / pos.peak_price;
    if dd_pct >= dd_limit {
        return Some(ExitReason::HardDrawdown(dd_pct));
    }
    None
}

/// A dynamic-target tighten applied this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAdjustment {
    pub from: Decimal,
    pub to: Decimal,
    pub held_min: f64,
    pub profit_pct: Decimal,
}

/// Tightens the target for positions grinding slowly: past the minimum
/// holding time, a position over the slow-profit threshold that has been
/// held past the time-exit threshold gets its target reduced — never
/// loosened.
pub fn apply_dynamic_target(
    pos: &mut Position,
    price: Decimal,
    now: DateTime<Utc>,
    cfg: &TimingConfig,
) -> Option<TargetAdjustment> {
    let held_min = pos.held_minutes(now);
    if held_min <= cfg.min_hold_min as f64 {
        return None;
    }

    let profit_pct = pos.profit_pct(price);
    if profit_pct >= cfg.slow_profit_pct && held_min >= cfg.time_exit_min as f64 {
        let reduced = pos.entry_price
            * (Decimal::ONE + cfg.reduced_tp_pct / Decimal::from(100));
        if reduced < pos.target_price {
            let from = pos.target_price;
            pos.target_price = reduced;
            return Some(TargetAdjustment {
                from,
                to: reduced,
                held_min,
                profit_pct,
            });
        }
    }
    None
}

/// Hard stop / target checks, stop first.
#[must_use]
pub fn check_hard_exit(pos: &Position, price: Decimal) -> Option<ExitReason> {
    if price <= pos.stop_price {
        return Some(ExitReason::StopLoss);
    }
    if price >= pos.target_price {
        return Some(ExitReason::TakeProfit);
    }
    None
}

/// Scalp maximum-hold exit; core positions are exempt.
#[must_use]
pub fn check_scalp_timeout(
    pos: &Position,
    now: DateTime<Utc>,
    max_hold_min: i64,
) -> Option<ExitReason> {
    if pos.is_core {
        return None;
    }
    let held_min = pos.held_minutes(now);
    if held_min >= max_hold_min as f64 {
        return Some(ExitReason::ScalpTimeLimit(held_min));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use orbit_core::OptionSide;
    use rust_decimal_macros::dec;

    fn position(is_core: bool, entry: Decimal, peak: Decimal) -> Position {
        Position {
            id: 1,
            symbol: "NSE:NIFTY25AUG24700CE".to_string(),
            side: OptionSide::Call,
            is_core,
            note: String::new(),
            entry_time: Utc.with_ymd_and_hms(2025, 8, 25, 4, 30, 0).unwrap(),
            entry_price: entry,
            qty: 75,
            stop_price: entry * dec!(0.75),
            target_price: entry * dec!(1.4),
            peak_price: peak,
            last_trail_level: Decimal::ZERO,
            history: Vec::new(),
        }
    }

    #[test]
    fn drawdown_never_fires_before_arming_gain() {
        let core = CorePositionConfig::default(); // min peak gain 12%
        let scalp = ScalpConfig::default();
        // peak only +5% over entry, price collapsed — still no DD exit
        let pos = position(true, dec!(100), dec!(105));
        assert_eq!(check_drawdown(&pos, dec!(80), &core, &scalp), None);
    }

    #[test]
    fn drawdown_fires_after_arming_gain() {
        let core = CorePositionConfig::default(); // hard drop 10%
        let scalp = ScalpConfig::default();
        let pos = position(true, dec!(100), dec!(120)); // +20% peak, armed
        // retracement (120-105)/120 = 12.5% >= 10%
        match check_drawdown(&pos, dec!(105), &core, &scalp) {
            Some(ExitReason::HardDrawdown(dd)) => assert_eq!(dd, dec!(12.5)),
            other => panic!("expected Hard DD, got {other:?}"),
        }
    }

    #[test]
    fn scalp_uses_its_own_thresholds() {
        let core = CorePositionConfig::default();
        let scalp = ScalpConfig::default(); // min gain 6%, drop 8%
        let pos = position(false, dec!(100), dec!(107)); // +7% peak arms a scalp
        // (107-98)/107 = 8.41% >= 8%
        assert!(check_drawdown(&pos, dec!(98), &core, &scalp).is_some());
        // the same peak would not arm a core position (needs +12%)
        let pos = position(true, dec!(100), dec!(107));
        assert_eq!(check_drawdown(&pos, dec!(98), &core, &scalp), None);
    }

    #[test]
    fn dynamic_target_only_tightens() {
        let cfg = TimingConfig::default(); // slow 15%, exit 30m, reduced 25%
        let now = Utc.with_ymd_and_hms(2025, 8, 25, 5, 10, 0).unwrap(); // held 40m
        let mut pos = position(true, dec!(100), dec!(120));

        let adj = apply_dynamic_target(&mut pos, dec!(118), now, &cfg).unwrap();
        assert_eq!(adj.to, dec!(125));
        assert_eq!(pos.target_price, dec!(125));

        // applying again cannot loosen or re-tighten
        assert_eq!(apply_dynamic_target(&mut pos, dec!(118), now, &cfg), None);
    }

    #[test]
    fn dynamic_target_respects_grace_period() {
        let cfg = TimingConfig::default();
        let now = Utc.with_ymd_and_hms(2025, 8, 25, 4, 33, 0).unwrap(); // held 3m
        let mut pos = position(true, dec!(100), dec!(120));
        assert_eq!(apply_dynamic_target(&mut pos, dec!(118), now, &cfg), None);
    }

    #[test]
    fn hard_exits_prefer_the_stop() {
        let pos = position(true, dec!(100), dec!(100));
        assert_eq!(check_hard_exit(&pos, dec!(75)), Some(ExitReason::StopLoss));
        assert_eq!(
            check_hard_exit(&pos, dec!(140)),
            Some(ExitReason::TakeProfit)
        );
        assert_eq!(check_hard_exit(&pos, dec!(100)), None);
    }

    #[test]
    fn scalp_timeout_exempts_core() {
        let now = Utc.with_ymd_and_hms(2025, 8, 25, 4, 45, 0).unwrap(); // held 15m
        let scalp = position(false, dec!(100), dec!(100));
        assert!(matches!(
            check_scalp_timeout(&scalp, now, 12),
            Some(ExitReason::ScalpTimeLimit(_))
        ));

        let core = position(true, dec!(100), dec!(100));
        assert_eq!(check_scalp_timeout(&core, now, 12), None);

        // under the limit
        let early = Utc.with_ymd_and_hms(2025, 8, 25, 4, 40, 0).unwrap();
        assert_eq!(check_scalp_timeout(&scalp, early, 12), None);
    }
}
