//! Opening-range breakout.

use crate::regime::{rsi_regime, RsiRegime};
use crate::{Strategy, StrategyContext};
use anyhow::Result;
use async_trait::async_trait;
use orbit_core::{OptionSide, OrbConfig, RsiConfig};
use orbit_indicators::OpeningRange;
use rust_decimal::Decimal;

/// Breakout over the opening range, buffered by a percentage band, gated
/// by an RSI regime with hysteresis and per-side armed flags.
///
/// Firing disarms the signalled side; re-arming is a loop policy
/// (pullback inside the range, or elapsed time since the last entry).
pub struct OrbBreakout {
    orb_cfg: OrbConfig,
    rsi_cfg: RsiConfig,
    /// Gate signals on the armed flags (pullback re-entry guard).
    require_armed: bool,
    or_high: Option<Decimal>,
    or_low: Option<Decimal>,
    hi_band: Option<Decimal>,
    lo_band: Option<Decimal>,
    long_armed: bool,
    short_armed: bool,
    last_regime: RsiRegime,
}

impl OrbBreakout {
    #[must_use]
    pub fn new(orb_cfg: OrbConfig, rsi_cfg: RsiConfig, require_armed: bool) -> Self {
        Self {
            orb_cfg,
            rsi_cfg,
            require_armed,
            or_high: None,
            or_low: None,
            hi_band: None,
            lo_band: None,
            long_armed: true,
            short_armed: true,
            last_regime: RsiRegime::Unknown,
        }
    }

    /// Installs the session's opening range and derives the entry bands.
    pub fn set_levels(&mut self, range: OpeningRange) {
        let hundred = Decimal::from(100);
        let buffer = self.orb_cfg.entry_buffer_pct / hundred;
        self.or_high = Some(range.high);
        self.or_low = Some(range.low);
        self.hi_band = Some(range.high * (Decimal::ONE + buffer));
        self.lo_band = Some(range.low * (Decimal::ONE - buffer));
    }

    #[must_use]
    pub fn or_high(&self) -> Option<Decimal> {
        self.or_high
    }

    #[must_use]
    pub fn or_low(&self) -> Option<Decimal> {
        self.or_low
    }

    /// Upper entry band (OR high extended by the buffer).
    #[must_use]
    pub fn hi_band(&self) -> Option<Decimal> {
        self.hi_band
    }

    /// Lower entry band (OR low extended by the buffer).
    #[must_use]
    pub fn lo_band(&self) -> Option<Decimal> {
        self.lo_band
    }

    #[must_use]
    pub fn is_armed(&self, side: OptionSide) -> bool {
        match side {
            OptionSide::Call => self.long_armed,
            OptionSide::Put => self.short_armed,
        }
    }

    pub fn arm(&mut self, side: OptionSide) {
        match side {
            OptionSide::Call => self.long_armed = true,
            OptionSide::Put => self.short_armed = true,
        }
    }

    pub fn disarm(&mut self, side: OptionSide) {
        match side {
            OptionSide::Call => self.long_armed = false,
            OptionSide::Put => self.short_armed = false,
        }
    }

    /// True when the index has broken above the upper entry band.
    #[must_use]
    pub fn breakout_up(&self, price: Decimal) -> bool {
        self.hi_band.is_some_and(|band| price > band)
    }

    /// True when the index has broken below the lower entry band.
    #[must_use]
    pub fn breakout_down(&self, price: Decimal) -> bool {
        self.lo_band.is_some_and(|band| price < band)
    }

    /// Classifies the RSI regime with hysteresis and remembers it for the
    /// next evaluation.
    fn observe_rsi(&mut self, rsi: Option<f64>) -> RsiRegime {
        let regime = rsi_regime(
            rsi,
            self.last_regime,
            self.rsi_cfg.long_min,
            self.rsi_cfg.short_max,
            self.rsi_cfg.hysteresis,
        );
        self.last_regime = regime;
        regime
    }

    /// Directional RSI gate. Blocks while the RSI has not formed; passes
    /// unconditionally when RSI gating is disabled.
    #[must_use]
    pub fn rsi_allows(&self, side: OptionSide, rsi: Option<f64>) -> bool {
        if !self.rsi_cfg.enabled {
            return true;
        }
        let regime = rsi_regime(
            rsi,
            self.last_regime,
            self.rsi_cfg.long_min,
            self.rsi_cfg.short_max,
            self.rsi_cfg.hysteresis,
        );
        match side {
            OptionSide::Call => regime == RsiRegime::Bull,
            OptionSide::Put => regime == RsiRegime::Bear,
        }
    }
}

#[async_trait]
impl Strategy for OrbBreakout {
    fn name(&self) -> &'static str {
        "orb_breakout"
    }

    async fn signal(&mut self, ctx: &StrategyContext) -> Result<Option<OptionSide>> {
        if self.hi_band.is_none() || self.lo_band.is_none() {
            return Ok(None);
        }

        let regime = if self.rsi_cfg.enabled {
            self.observe_rsi(ctx.rsi)
        } else {
            RsiRegime::Unknown
        };
        let rsi_long_ok = !self.rsi_cfg.enabled || regime == RsiRegime::Bull;
        let rsi_short_ok = !self.rsi_cfg.enabled || regime == RsiRegime::Bear;

        let try_long = self.breakout_up(ctx.index_price)
            && rsi_long_ok
            && (!self.require_armed || self.long_armed);
        let try_short = self.breakout_down(ctx.index_price)
            && rsi_short_ok
            && (!self.require_armed || self.short_armed);

        if try_long {
            self.long_armed = false;
            tracing::debug!(price = %ctx.index_price, "ORB breakout long");
            return Ok(Some(OptionSide::Call));
        }
        if try_short {
            self.short_armed = false;
            tracing::debug!(price = %ctx.index_price, "ORB breakout short");
            return Ok(Some(OptionSide::Put));
        }
        Ok(None)
    }
}
