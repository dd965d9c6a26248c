//! Bollinger-band mean-reversion scalper on index 1-minute data.

use crate::reversion::{rsi_in_range, tag_and_reject};
use crate::{Strategy, StrategyContext};
use anyhow::Result;
use async_trait::async_trait;
use orbit_core::{BbConfig, MarketData, OptionSide, Resolution, SessionConfig};
use orbit_indicators::{bollinger, post_open, rsi, within_lookback};
use rust_decimal::Decimal;
use std::sync::Arc;

/// RSI period on raw 1-minute closes — kept short-fuse, no aggregation,
/// for responsiveness at scalp horizons.
const SCALP_RSI_PERIOD: usize = 14;

/// Buys a call when price rejects the lower band, a put when it rejects
/// the upper band, only while the RSI sits in the neutral range window.
pub struct BbScalp {
    market: Arc<dyn MarketData>,
    symbol: String,
    cfg: BbConfig,
    session: SessionConfig,
}

impl BbScalp {
    #[must_use]
    pub fn new(
        market: Arc<dyn MarketData>,
        symbol: impl Into<String>,
        cfg: BbConfig,
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
impl Strategy for BbScalp {
    fn name(&self) -> &'static str {
        "bb_scalp"
    }

    async fn signal(&mut self, ctx: &StrategyContext) -> Result<Option<OptionSide>> {
        let today = self.session.local_date(ctx.now);
        let candles = match self
            .market
            .history(&self.symbol, Resolution::Minute, today, today)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                tracing::debug!(error = %e, "bb_scalp history fetch failed, no opinion");
                return Ok(None);
            }
        };

        let candles = post_open(&candles, self.session.open, self.session.offset());
        let candles = within_lookback(&candles, ctx.now, self.cfg.lookback_min);
        if candles.len() < self.cfg.period + 5 {
            return Ok(None);
        }

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let Some(rsi_val) = rsi(&closes, SCALP_RSI_PERIOD) else {
            return Ok(None);
        };
        if !rsi_in_range(rsi_val, self.cfg.rsi_min, self.cfg.rsi_max) {
            // trending conditions — leave reversion alone
            return Ok(None);
        }

        let Some(bands) = bollinger(&closes, self.cfg.period, self.cfg.std_k) else {
            return Ok(None);
        };
        let prev_close = closes[closes.len() - 2];

        let signal = tag_and_reject(prev_close, ctx.index_price, bands.upper, bands.lower);
        if let Some(side) = signal {
            tracing::info!(
                side = %side,
                prev_close = %prev_close,
                live = %ctx.index_price,
                upper = %bands.upper,
                lower = %bands.lower,
                rsi = rsi_val,
                "BB scalp tag-and-reject"
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
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct ScriptedMarket {
        candles: Mutex<Vec<Candle>>,
        fail: bool,
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
            if self.fail {
                return Err(anyhow!("gateway down"));
            }
            Ok(self.candles.lock().unwrap().clone())
        }
    }

    fn candle(minute: u32, close: Decimal) -> Candle {
        // 04:xx UTC = 09:(30+xx) IST, inside the session
        Candle {
            timestamp: Utc.with_ymd_and_hms(2025, 8, 25, 4, minute, 0).unwrap(),
            open: close,
            high: close + dec!(0.5),
            low: close - dec!(0.5),
            close,
            volume: dec!(100),
        }
    }

    /// Mildly choppy closes ending with a dip through the lower band.
    fn dip_series() -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..28)
            .map(|m| {
                let close = if m % 2 == 0 { dec!(100) } else { dec!(101) };
                candle(m, close)
            })
            .collect();
        candles.push(candle(28, dec!(95))); // tag the lower band
        candles.push(candle(29, dec!(99))); // last closed bar
        candles
    }

    fn scalper(market: Arc<dyn MarketData>, rsi_min: f64, rsi_max: f64) -> BbScalp {
        let cfg = BbConfig {
            rsi_min,
            rsi_max,
            ..BbConfig::default()
        };
        BbScalp::new(market, "NSE:NIFTY50-INDEX", cfg, SessionConfig::default())
    }

    fn ctx(price: Decimal) -> StrategyContext {
        StrategyContext {
            now: Utc.with_ymd_and_hms(2025, 8, 25, 4, 30, 0).unwrap(),
            index_price: price,
            rsi: None,
        }
    }

    #[tokio::test]
    async fn lower_band_rejection_signals_long() {
        let market = Arc::new(ScriptedMarket {
            candles: Mutex::new(dip_series()),
            fail: false,
        });
        // wide-open RSI window isolates the band logic
        let mut scalp = scalper(market, 0.0, 100.0);

        let signal = scalp.signal(&ctx(dec!(100.5))).await.unwrap();
        assert_eq!(signal, Some(OptionSide::Call));
    }

    #[tokio::test]
    async fn trending_rsi_blocks_the_scalp() {
        let market = Arc::new(ScriptedMarket {
            candles: Mutex::new(dip_series()),
            fail: false,
        });
        // an impossible neutral window rejects any formed RSI
        let mut scalp = scalper(market, 99.0, 100.0);

        let signal = scalp.signal(&ctx(dec!(100.5))).await.unwrap();
        assert_eq!(signal, None);
    }

    #[tokio::test]
    async fn thin_history_has_no_opinion() {
        let market = Arc::new(ScriptedMarket {
            candles: Mutex::new(dip_series().into_iter().take(10).collect()),
            fail: false,
        });
        let mut scalp = scalper(market, 0.0, 100.0);
        assert_eq!(scalp.signal(&ctx(dec!(100.5))).await.unwrap(), None);
    }

    #[tokio::test]
    async fn gateway_failure_is_tolerated() {
        let market = Arc::new(ScriptedMarket {
            candles: Mutex::new(Vec::new()),
            fail: true,
        });
        let mut scalp = scalper(market, 0.0, 100.0);
        assert_eq!(scalp.signal(&ctx(dec!(100.5))).await.unwrap(), None);
    }
}
