//! Mean reversion against session VWAP bands.

use crate::reversion::{rsi_in_range, tag_and_reject};
use crate::{Strategy, StrategyContext};
use anyhow::Result;
use async_trait::async_trait;
use orbit_core::{MarketData, OptionSide, Resolution, SessionConfig, VwapConfig};
use orbit_indicators::{post_open, vwap_bands, within_lookback};
use std::sync::Arc;

/// Minimum 1-minute candles before the bands are trusted.
const MIN_SAMPLES: usize = 40;

/// Neutral-RSI window for VWAP reversion entries. Applied only when the
/// RSI has formed; an unformed RSI does not block this module.
const RSI_NEUTRAL_MIN: f64 = 40.0;
const RSI_NEUTRAL_MAX: f64 = 60.0;

/// Same tag-and-reject pattern as the Bollinger scalper, applied to
/// session-cumulative VWAP bands.
pub struct VwapReversion {
    market: Arc<dyn MarketData>,
    symbol: String,
    cfg: VwapConfig,
    session: SessionConfig,
}

impl VwapReversion {
    #[must_use]
    pub fn new(
        market: Arc<dyn MarketData>,
        symbol: impl Into<String>,
        cfg: VwapConfig,
        session: SessionConfig,
    ) -> Self {
        Self {
            market,
            symbol: symbol.into(),
            cfg,
            session,
        }
    }
}

#[async_trait]
impl Strategy for VwapReversion {
    fn name(&self) -> &'static str {
        "vwap_reversion"
    }

    async fn signal(&mut self, ctx: &StrategyContext) -> Result<Option<OptionSide>> {
        if let Some(rsi_val) = ctx.rsi {
            if !rsi_in_range(rsi_val, RSI_NEUTRAL_MIN, RSI_NEUTRAL_MAX) {
                return Ok(None);
            }
        }

        let today = self.session.local_date(ctx.now);
        let candles = match self
            .market
            .history(&self.symbol, Resolution::Minute, today, today)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                tracing::debug!(error = %e, "vwap history fetch failed, no opinion");
                return Ok(None);
            }
        };

        let candles = post_open(&candles, self.session.open, self.session.offset());
        let candles = within_lookback(&candles, ctx.now, self.cfg.lookback_min);
        if candles.len() < MIN_SAMPLES {
            return Ok(None);
        }

        let Some(bands) = vwap_bands(&candles, self.cfg.dev_window, self.cfg.band_k) else {
            return Ok(None);
        };
        let prev_close = candles[candles.len() - 2].close;

        let signal = tag_and_reject(prev_close, ctx.index_price, bands.upper, bands.lower);
        if let Some(side) = signal {
            tracing::info!(
                side = %side,
                prev_close = %prev_close,
                live = %ctx.index_price,
                vwap = %bands.vwap,
                "VWAP reversion tag-and-reject"
            );
        }
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{NaiveDate, TimeZone, Utc};
    use orbit_core::Candle;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct ScriptedMarket {
        candles: Vec<Candle>,
    }

    #[async_trait]
    impl MarketData for ScriptedMarket {
        async fn quote(&self, _symbol: &str) -> Result<Decimal> {
            Err(anyhow!("not used"))
        }

        async fn history(
            &self,
            _symbol: &str,
            _resolution: Resolution,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<Candle>> {
            Ok(self.candles.clone())
        }
    }

    fn candle(minute: u32, close: Decimal, volume: Decimal) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2025, 8, 25, 4, minute, 0).unwrap(),
            open: close,
            high: close + dec!(0.5),
            low: close - dec!(0.5),
            close,
            volume,
        }
    }

    /// Choppy session around 100 ending with a spike below the lower band.
    fn dip_series() -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..43)
            .map(|m| {
                let close = if m % 2 == 0 { dec!(100) } else { dec!(101) };
                candle(m, close, dec!(100))
            })
            .collect();
        candles.push(candle(43, dec!(92), dec!(100))); // tag
        candles.push(candle(44, dec!(99), dec!(100))); // last closed bar
        candles
    }

    fn strategy(candles: Vec<Candle>) -> VwapReversion {
        VwapReversion::new(
            Arc::new(ScriptedMarket { candles }),
            "NSE:NIFTY50-INDEX",
            VwapConfig::default(),
            SessionConfig::default(),
        )
    }

    fn ctx(price: Decimal, rsi: Option<f64>) -> StrategyContext {
        StrategyContext {
            now: Utc.with_ymd_and_hms(2025, 8, 25, 4, 45, 0).unwrap(),
            index_price: price,
            rsi,
        }
    }

    #[tokio::test]
    async fn lower_band_rejection_signals_call() {
        let mut vr = strategy(dip_series());
        let signal = vr.signal(&ctx(dec!(100.5), Some(50.0))).await.unwrap();
        assert_eq!(signal, Some(OptionSide::Call));
    }

    #[tokio::test]
    async fn trending_rsi_blocks_reversion() {
        let mut vr = strategy(dip_series());
        assert_eq!(vr.signal(&ctx(dec!(100.5), Some(70.0))).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unformed_rsi_does_not_block() {
        let mut vr = strategy(dip_series());
        let signal = vr.signal(&ctx(dec!(100.5), None)).await.unwrap();
        assert_eq!(signal, Some(OptionSide::Call));
    }

    #[tokio::test]
    async fn zero_volume_session_is_silent() {
        let candles: Vec<Candle> = (0..45)
            .map(|m| candle(m, dec!(100), dec!(0)))
            .collect();
        let mut vr = strategy(candles);
        assert_eq!(vr.signal(&ctx(dec!(100.5), Some(50.0))).await.unwrap(), None);
    }

    #[tokio::test]
    async fn thin_session_is_silent() {
        let mut vr = strategy(dip_series().into_iter().take(20).collect());
        assert_eq!(vr.signal(&ctx(dec!(100.5), Some(50.0))).await.unwrap(), None);
    }
}
