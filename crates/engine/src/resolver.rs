//! Tradable option-symbol resolution.
//!
//! Picks the at-the-money strike from the live index price, probes
//! quotability across exchange segments with a nearby-strike fallback
//! ladder, and caches by (expiry, strike, side).

use anyhow::{bail, Context, Result};
use orbit_core::{InstrumentConfig, MarketData, OptionSide};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Strike-step multiples tried around the exact ATM strike.
const STRIKE_OFFSETS: [i64; 7] = [0, -1, 1, -2, 2, -3, 3];

pub struct SymbolResolver {
    market: Arc<dyn MarketData>,
    cfg: InstrumentConfig,
    cache: HashMap<(String, i64, OptionSide), String>,
}

impl SymbolResolver {
    #[must_use]
    pub fn new(market: Arc<dyn MarketData>, cfg: InstrumentConfig) -> Self {
        Self {
            market,
            cfg,
            cache: HashMap::new(),
        }
    }

    /// Nearest strike-grid multiple to the spot price.
    #[must_use]
    pub fn nearest_strike(&self, spot: Decimal) -> i64 {
        let step = Decimal::from(self.cfg.strike_step);
        ((spot / step).round() * step)
            .to_i64()
            .unwrap_or_default()
    }

    fn format_symbol(&self, segment: &str, strike: i64, side: OptionSide) -> String {
        format!(
            "{segment}:{root}{expiry}{strike}{side}",
            root = self.cfg.option_root,
            expiry = self.cfg.expiry_code,
            side = side.code()
        )
    }

    /// Resolves a quotable option symbol for the strike, walking the
    /// fallback ladder when the exact strike is not quotable. The result
    /// is cached under the requested strike.
    pub async fn resolve(&mut self, strike: i64, side: OptionSide) -> Result<String> {
        let key = (self.cfg.expiry_code.clone(), strike, side);
        if let Some(symbol) = self.cache.get(&key) {
            return Ok(symbol.clone());
        }

        let step = i64::from(self.cfg.strike_step);
        for offset in STRIKE_OFFSETS {
            let candidate_strike = strike + offset * step;
            for segment in &self.cfg.segments {
                let symbol = self.format_symbol(segment, candidate_strike, side);
                if self.market.quote(&symbol).await.is_ok() {
                    if offset != 0 {
                        tracing::warn!(
                            symbol,
                            offset = offset * step,
                            from_strike = strike,
                            "ATM strike not quotable, using fallback"
                        );
                    } else {
                        tracing::debug!(symbol, "resolved option symbol");
                    }
                    self.cache.insert(key, symbol.clone());
                    return Ok(symbol);
                }
            }
        }

        bail!(
            "could not resolve option symbol: {} {} {}",
            self.cfg.expiry_code,
            strike,
            side
        );
    }

    /// Resolves the at-the-money symbol for a side from the live index.
    pub async fn pick_atm(&mut self, side: OptionSide) -> Result<String> {
        let spot = self
            .market
            .quote(&self.cfg.index_symbol)
            .await
            .context("index quote for ATM strike selection failed")?;
        let strike = self.nearest_strike(spot);
        self.resolve(strike, side).await
    }

    /// Resolves the ATM symbol and fetches its live premium — the entry
    /// estimate fed to the risk gate.
    pub async fn estimate_entry(&mut self, side: OptionSide) -> Result<(String, Decimal)> {
        let symbol = self.pick_atm(side).await?;
        let premium = self
            .market
            .quote(&symbol)
            .await
            .with_context(|| format!("entry estimate quote failed for {symbol}"))?;
        Ok((symbol, premium))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use orbit_core::{Candle, Resolution};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Quotes only the symbols in `quotable`; counts probes.
    struct ProbeMarket {
        index: Decimal,
        quotable: Vec<(String, Decimal)>,
        probes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MarketData for ProbeMarket {
        async fn quote(&self, symbol: &str) -> Result<Decimal> {
            self.probes.lock().unwrap().push(symbol.to_string());
            if symbol == "NSE:NIFTY50-INDEX" {
                return Ok(self.index);
            }
            self.quotable
                .iter()
                .find(|(s, _)| s == symbol)
                .map(|(_, p)| *p)
                .ok_or_else(|| anyhow!("no quote for {symbol}"))
        }

        async fn history(
            &self,
            _symbol: &str,
            _resolution: Resolution,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<Candle>> {
            Ok(Vec::new())
        }
    }

    fn resolver(market: ProbeMarket) -> SymbolResolver {
        SymbolResolver::new(Arc::new(market), InstrumentConfig::default())
    }

    #[test]
    fn strikes_round_to_the_grid() {
        let market = ProbeMarket {
            index: dec!(0),
            quotable: vec![],
            probes: Mutex::new(vec![]),
        };
        let r = resolver(market);
        assert_eq!(r.nearest_strike(dec!(24712)), 24700);
        assert_eq!(r.nearest_strike(dec!(24730)), 24750);
        assert_eq!(r.nearest_strike(dec!(24700)), 24700);
    }

    #[tokio::test]
    async fn exact_atm_resolves_first() {
        let market = ProbeMarket {
            index: dec!(24712),
            quotable: vec![("NSE:NIFTY25AUG24700CE".to_string(), dec!(182))],
            probes: Mutex::new(vec![]),
        };
        let mut r = resolver(market);
        let (symbol, premium) = r.estimate_entry(OptionSide::Call).await.unwrap();
        assert_eq!(symbol, "NSE:NIFTY25AUG24700CE");
        assert_eq!(premium, dec!(182));
    }

    #[tokio::test]
    async fn fallback_ladder_finds_a_nearby_strike() {
        let market = ProbeMarket {
            index: dec!(24712),
            // only the +50 strike on the second segment is live
            quotable: vec![("NFO:NIFTY25AUG24750CE".to_string(), dec!(150))],
            probes: Mutex::new(vec![]),
        };
        let mut r = resolver(market);
        let symbol = r.resolve(24700, OptionSide::Call).await.unwrap();
        assert_eq!(symbol, "NFO:NIFTY25AUG24750CE");
    }

    #[tokio::test]
    async fn resolution_is_cached_per_strike_and_side() {
        let market = ProbeMarket {
            index: dec!(24700),
            quotable: vec![("NSE:NIFTY25AUG24700CE".to_string(), dec!(182))],
            probes: Mutex::new(vec![]),
        };
        let market = Arc::new(market);
        let mut r = SymbolResolver::new(market.clone(), InstrumentConfig::default());

        let first = r.resolve(24700, OptionSide::Call).await.unwrap();
        let probes_after_first = market.probes.lock().unwrap().len();
        let second = r.resolve(24700, OptionSide::Call).await.unwrap();

        assert_eq!(first, second);
        // the second resolution hit the cache, no further probes
        assert_eq!(market.probes.lock().unwrap().len(), probes_after_first);
    }

    #[tokio::test]
    async fn unresolvable_chain_fails_the_attempt() {
        let market = ProbeMarket {
            index: dec!(24700),
            quotable: vec![],
            probes: Mutex::new(vec![]),
        };
        let mut r = resolver(market);
        assert!(r.resolve(24700, OptionSide::Put).await.is_err());
    }
}
