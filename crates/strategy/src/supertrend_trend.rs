//! Supertrend trend-following on aggregated index candles.

use crate::{Strategy, StrategyContext};
use anyhow::Result;
use async_trait::async_trait;
use orbit_core::{MarketData, OptionSide, Resolution, RsiConfig, SessionConfig, SupertrendConfig};
use orbit_indicators::{aggregate, post_open, supertrend};
use std::sync::Arc;

/// Rides the trend: a call while the latest close holds above the
/// supertrend line with bullish RSI, a put below it with bearish RSI.
pub struct SupertrendTrend {
    market: Arc<dyn MarketData>,
    symbol: String,
    cfg: SupertrendConfig,
    rsi_cfg: RsiConfig,
    session: SessionConfig,
}

impl SupertrendTrend {
    #[must_use]
    pub fn new(
        market: Arc<dyn MarketData>,
        symbol: impl Into<String>,
        cfg: SupertrendConfig,
        rsi_cfg: RsiConfig,
        session: SessionConfig,
    ) -> Self {
        Self {
            market,
            symbol: symbol.into(),
            cfg,
            rsi_cfg,
            session,
        }
    }
}

#[async_trait]
impl Strategy for SupertrendTrend {
    fn name(&self) -> &'static str {
        "supertrend_trend"
    }

    async fn signal(&mut self, ctx: &StrategyContext) -> Result<Option<OptionSide>> {
        let Some(rsi_val) = ctx.rsi else {
            return Ok(None);
        };

        let today = self.session.local_date(ctx.now);
        let candles = match self
            .market
            .history(&self.symbol, Resolution::Minute, today, today)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                tracing::debug!(error = %e, "supertrend history fetch failed, no opinion");
                return Ok(None);
            }
        };

        let candles = post_open(&candles, self.session.open, self.session.offset());
        let agg = aggregate(&candles, self.cfg.timeframe_min);
        if agg.len() < std::cmp::max(14, self.cfg.period + 5) {
            return Ok(None);
        }

        let Some(point) = supertrend(&agg, self.cfg.period, self.cfg.multiplier) else {
            return Ok(None);
        };
        let last_close = agg.last().expect("non-empty after length check").close;

        if last_close > point.line && rsi_val > self.rsi_cfg.long_min {
            tracing::info!(line = %point.line, close = %last_close, rsi = rsi_val, "supertrend up");
            return Ok(Some(OptionSide::Call));
        }
        if last_close < point.line && rsi_val < self.rsi_cfg.short_max {
            tracing::info!(line = %point.line, close = %last_close, rsi = rsi_val, "supertrend down");
            return Ok(Some(OptionSide::Put));
        }
        Ok(None)
    }
}
