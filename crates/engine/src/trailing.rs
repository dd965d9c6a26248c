//! Stop ratchets: breakeven move and staged trailing.

use crate::position::Position;
use orbit_core::CorePositionConfig;
use rust_decimal::Decimal;

/// One upward stop move applied this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum StopAdjustment {
    /// Stop lifted to (near) breakeven after the cushion threshold.
    Breakeven { from: Decimal, to: Decimal },
    /// A trailing level consumed, stop lifted to its offset.
    Trail {
        level_pct: Decimal,
        from: Decimal,
        to: Decimal,
    },
}

/// Applies the breakeven ratchet and then every eligible trailing step in
/// ascending order. The stop only ever moves up; each trailing level is
/// consumed at most once.
pub fn apply_stop_ratchets(
    pos: &mut Position,
    price: Decimal,
    cfg: &CorePositionConfig,
) -> Vec<StopAdjustment> {
    let hundred = Decimal::from(100);
    let profit_pct = pos.profit_pct(price);
    let mut adjustments = Vec::new();

    if profit_pct >= cfg.breakeven_at_profit_pct {
        let breakeven = pos.entry_price * (Decimal::ONE + cfg.breakeven_offset_pct / hundred);
        if pos.stop_price < breakeven {
            let from = pos.stop_price;
            pos.stop_price = breakeven;
            adjustments.push(StopAdjustment::Breakeven {
                from,
                to: breakeven,
            });
        }
    }

    for step in &cfg.trail_steps {
        if profit_pct >= step.level_pct && pos.last_trail_level < step.level_pct {
            let new_stop = pos.entry_price * (Decimal::ONE + step.stop_offset_pct / hundred);
            if new_stop > pos.stop_price {
                let from = pos.stop_price;
                pos.stop_price = new_stop;
                pos.last_trail_level = step.level_pct;
                adjustments.push(StopAdjustment::Trail {
                    level_pct: step.level_pct,
                    from,
                    to: new_stop,
                });
            }
        }
    }

    adjustments
}
