//! Relative Strength Index over aggregated closes.

use crate::aggregate::aggregate;
use orbit_core::Candle;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Extra samples required beyond the averaging window before the value is
/// considered formed.
const WARMUP_SAMPLES: usize = 5;

/// RSI from a close series using a simple rolling mean of gains/losses.
///
/// Returns `None` below `period + 5` samples — the indicator has not
/// formed an opinion yet. The result is clamped to [0, 100]; an
/// all-gain window yields 100.
#[must_use]
pub fn rsi(closes: &[Decimal], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + WARMUP_SAMPLES {
        return None;
    }

    let deltas: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let window = &deltas[deltas.len() - period..];

    let mut gain = Decimal::ZERO;
    let mut loss = Decimal::ZERO;
    for delta in window {
        if *delta >= Decimal::ZERO {
            gain += *delta;
        } else {
            loss -= *delta;
        }
    }

    let avg_gain = (gain / Decimal::from(period)).to_f64()?;
    let avg_loss = (loss / Decimal::from(period)).to_f64()?;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    let value = 100.0 - 100.0 / (1.0 + rs);
    Some(value.clamp(0.0, 100.0))
}

/// RSI from 1-minute candles aggregated to `tf_min`-minute closes.
#[must_use]
pub fn rsi_from_1m(candles: &[Candle], period: usize, tf_min: u32) -> Option<f64> {
    let agg = aggregate(candles, tf_min);
    let closes: Vec<Decimal> = agg.iter().map(|c| c.close).collect();
    rsi(&closes, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn closes(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn insufficient_samples_is_not_an_error() {
        let series = closes(&[100, 101, 102]);
        assert_eq!(rsi(&series, 14), None);
    }

    #[test]
    fn monotone_rally_saturates_at_100() {
        let series: Vec<Decimal> = (0..25).map(|i| Decimal::from(100 + i)).collect();
        assert_eq!(rsi(&series, 14), Some(100.0));
    }

    #[test]
    fn balanced_chop_sits_near_50() {
        // alternate +1 / -1 over a long series
        let mut series = vec![dec!(100)];
        for i in 0..30 {
            let last = *series.last().unwrap();
            series.push(if i % 2 == 0 { last + dec!(1) } else { last - dec!(1) });
        }
        let value = rsi(&series, 14).unwrap();
        assert!((value - 50.0).abs() < 5.0, "rsi was {value}");
    }

    #[test]
    fn steady_decline_reads_weak() {
        let series: Vec<Decimal> = (0..25).map(|i| Decimal::from(200 - i)).collect();
        let value = rsi(&series, 14).unwrap();
        assert!(value < 10.0, "rsi was {value}");
    }
}
