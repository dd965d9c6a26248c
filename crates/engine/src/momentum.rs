//! RSI-regime and price-zone transition tracking.
//!
//! Logged only on change; the zone transition back inside the opening
//! range also drives the pullback re-arm policy.

use orbit_strategy::{rsi_regime, RsiRegime};
use orbit_core::RsiConfig;
use rust_decimal::Decimal;

/// Where the index sits relative to the opening-range entry bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceZone {
    AboveHigh,
    Inside,
    BelowLow,
}

impl PriceZone {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AboveHigh => "above_hi",
            Self::Inside => "inside_or",
            Self::BelowLow => "below_lo",
        }
    }
}

/// Transitions observed this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumUpdate {
    pub regime_change: Option<(Option<RsiRegime>, RsiRegime)>,
    pub zone_change: Option<(Option<PriceZone>, PriceZone)>,
    /// The index moved from outside the opening-range band back inside.
    pub pulled_back_inside: bool,
}

/// Remembers the last observed regime and zone, reporting only changes.
pub struct MomentumTracker {
    rsi_cfg: RsiConfig,
    last_regime: Option<RsiRegime>,
    last_zone: Option<PriceZone>,
}

impl MomentumTracker {
    #[must_use]
    pub fn new(rsi_cfg: RsiConfig) -> Self {
        Self {
            rsi_cfg,
            last_regime: None,
            last_zone: None,
        }
    }

    #[must_use]
    pub fn zone(
        price: Decimal,
        hi_band: Option<Decimal>,
        lo_band: Option<Decimal>,
    ) -> PriceZone {
        if let Some(hi) = hi_band {
            if price > hi {
                return PriceZone::AboveHigh;
            }
        }
        if let Some(lo) = lo_band {
            if price < lo {
                return PriceZone::BelowLow;
            }
        }
        PriceZone::Inside
    }

    pub fn observe(
        &mut self,
        price: Decimal,
        rsi: Option<f64>,
        hi_band: Option<Decimal>,
        lo_band: Option<Decimal>,
    ) -> MomentumUpdate {
        let regime = rsi_regime(
            rsi,
            self.last_regime.unwrap_or(RsiRegime::Unknown),
            self.rsi_cfg.long_min,
            self.rsi_cfg.short_max,
            self.rsi_cfg.hysteresis,
        );
        let regime_change = if self.last_regime != Some(regime) {
            let change = Some((self.last_regime, regime));
            self.last_regime = Some(regime);
            change
        } else {
            None
        };

        let zone = Self::zone(price, hi_band, lo_band);
        let mut pulled_back_inside = false;
        let zone_change = if self.last_zone != Some(zone) {
            pulled_back_inside = zone == PriceZone::Inside
                && matches!(
                    self.last_zone,
                    Some(PriceZone::AboveHigh | PriceZone::BelowLow)
                );
            let change = Some((self.last_zone, zone));
            self.last_zone = Some(zone);
            change
        } else {
            None
        };

        MomentumUpdate {
            regime_change,
            zone_change,
            pulled_back_inside,
        }
    }
}
