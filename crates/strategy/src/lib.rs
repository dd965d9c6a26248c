//! Signal strategies for the intraday options engine.
//!
//! Four modules behind one trait — opening-range breakout, Bollinger
//! scalp, supertrend trend-follow, VWAP reversion — plus the regime
//! classifier that orders the secondary strategies.

pub mod bb_scalp;
pub mod orb;
pub mod regime;
pub mod reversion;
pub mod supertrend_trend;
pub mod vwap_reversion;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orbit_core::OptionSide;
use rust_decimal::Decimal;

pub use bb_scalp::BbScalp;
pub use orb::OrbBreakout;
pub use regime::{classify, route, rsi_regime, Regime, RsiRegime, SecondaryKind};
pub use supertrend_trend::SupertrendTrend;
pub use vwap_reversion::VwapReversion;

/// Per-tick inputs shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext {
    pub now: DateTime<Utc>,
    /// Live index price fetched at the top of the tick.
    pub index_price: Decimal,
    /// Current RSI, when formed.
    pub rsi: Option<f64>,
}

/// A signal source: maps the current tick to a directional opinion.
///
/// Returning `Ok(None)` means "no opinion" — including when the module's
/// indicator has not accumulated enough samples yet.
#[async_trait]
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    async fn signal(&mut self, ctx: &StrategyContext) -> Result<Option<OptionSide>>;
}
