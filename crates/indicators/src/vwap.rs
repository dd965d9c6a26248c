//! Session-cumulative VWAP with rolling deviation bands.

use orbit_core::Candle;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// VWAP and bands at the most recent candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VwapBands {
    pub vwap: Decimal,
    pub upper: Decimal,
    pub lower: Decimal,
}

/// Cumulative volume-weighted average of the typical price, banded by
/// `k` rolling sample standard deviations of (close − vwap) over
/// `dev_window` candles.
///
/// Returns `None` below `dev_window` samples or when cumulative volume is
/// zero (no traded volume yet — nothing to weight by).
#[must_use]
pub fn vwap_bands(candles: &[Candle], dev_window: usize, k: f64) -> Option<VwapBands> {
    if dev_window < 2 || candles.len() < dev_window {
        return None;
    }

    let mut pv = Decimal::ZERO;
    let mut vv = Decimal::ZERO;
    let mut deviations: Vec<f64> = Vec::with_capacity(candles.len());
    let mut last_vwap = Decimal::ZERO;

    for candle in candles {
        pv += candle.typical_price() * candle.volume;
        vv += candle.volume;
        if vv.is_zero() {
            // no volume yet this session; the series has no defined VWAP
            return None;
        }
        last_vwap = pv / vv;
        deviations.push((candle.close - last_vwap).to_f64()?);
    }

    let window = &deviations[deviations.len() - dev_window..];
    let mean = window.iter().sum::<f64>() / dev_window as f64;
    let var = window.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>()
        / (dev_window as f64 - 1.0);
    let band = Decimal::from_f64(k * var.sqrt())?;

    Some(VwapBands {
        vwap: last_vwap,
        upper: last_vwap + band,
        lower: last_vwap - band,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candle(minute: u32, close: Decimal, volume: Decimal) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2025, 8, 25, 4, minute, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn constant_price_pins_vwap_to_price() {
        let candles: Vec<Candle> = (0..25).map(|m| candle(m, dec!(100), dec!(10))).collect();
        let bands = vwap_bands(&candles, 20, 2.0).unwrap();
        assert_eq!(bands.vwap, dec!(100));
        assert_eq!(bands.upper, dec!(100));
        assert_eq!(bands.lower, dec!(100));
    }

    #[test]
    fn zero_volume_session_has_no_vwap() {
        let candles: Vec<Candle> = (0..25).map(|m| candle(m, dec!(100), dec!(0))).collect();
        assert_eq!(vwap_bands(&candles, 20, 2.0), None);
    }

    #[test]
    fn rising_closes_sit_above_vwap() {
        let candles: Vec<Candle> = (0..30)
            .map(|m| candle(m, Decimal::from(100 + i64::from(m)), dec!(10)))
            .collect();
        let bands = vwap_bands(&candles, 20, 2.0).unwrap();
        let last_close = Decimal::from(129);
        assert!(bands.vwap < last_close);
        assert!(bands.upper > bands.vwap);
        assert!(bands.lower < bands.vwap);
    }

    #[test]
    fn short_series_has_no_opinion() {
        let candles: Vec<Candle> = (0..5).map(|m| candle(m, dec!(100), dec!(10))).collect();
        assert_eq!(vwap_bands(&candles, 20, 2.0), None);
    }
}
