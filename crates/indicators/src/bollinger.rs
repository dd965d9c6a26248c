//! Rolling Bollinger bands at the last closed bar.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Bands for the window ending at the most recent close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub ma: Decimal,
    pub upper: Decimal,
    pub lower: Decimal,
}

/// Moving average ± `k` sample standard deviations over the last `period`
/// closes. Returns `None` below `period` samples or when the values do
/// not fit an f64 intermediate.
#[must_use]
pub fn bollinger(closes: &[Decimal], period: usize, k: f64) -> Option<BollingerBands> {
    if period < 2 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let sum: Decimal = window.iter().copied().sum();
    let ma = sum / Decimal::from(period);

    let ma_f = ma.to_f64()?;
    let var = window
        .iter()
        .map(|c| {
            let d = c.to_f64().unwrap_or(ma_f) - ma_f;
            d * d
        })
        .sum::<f64>()
        / (period as f64 - 1.0);
    let band = Decimal::from_f64(k * var.sqrt())?;

    Some(BollingerBands {
        ma,
        upper: ma + band,
        lower: ma - band,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn flat_series_collapses_bands_onto_ma() {
        let closes = vec![dec!(100); 20];
        let bands = bollinger(&closes, 20, 2.0).unwrap();
        assert_eq!(bands.ma, dec!(100));
        assert_eq!(bands.upper, dec!(100));
        assert_eq!(bands.lower, dec!(100));
    }

    #[test]
    fn bands_straddle_the_mean() {
        let closes: Vec<Decimal> = (0..20).map(|i| Decimal::from(100 + (i % 5))).collect();
        let bands = bollinger(&closes, 20, 2.0).unwrap();
        assert!(bands.lower < bands.ma);
        assert!(bands.upper > bands.ma);
    }

    #[test]
    fn window_uses_only_recent_closes() {
        // large old values outside the window must not widen the bands
        let mut closes = vec![dec!(1000); 10];
        closes.extend(std::iter::repeat(dec!(100)).take(20));
        let bands = bollinger(&closes, 20, 2.0).unwrap();
        assert_eq!(bands.ma, dec!(100));
        assert_eq!(bands.upper, dec!(100));
    }

    #[test]
    fn short_series_has_no_opinion() {
        let closes = vec![dec!(100); 5];
        assert_eq!(bollinger(&closes, 20, 2.0), None);
    }
}
