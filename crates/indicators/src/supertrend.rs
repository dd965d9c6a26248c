//! ATR-scaled supertrend trailing line.

use orbit_core::Candle;
use rust_decimal::Decimal;

/// Latest supertrend line value and trend direction. In an uptrend the
/// line trails below price; in a downtrend, above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupertrendPoint {
    pub line: Decimal,
    pub uptrend: bool,
}

/// Average true range as a rolling mean over `period` candles, defined
/// once `max(2, period / 2)` samples exist.
fn atr_series(candles: &[Candle], period: usize) -> Vec<Option<Decimal>> {
    let min_periods = std::cmp::max(2, period / 2);
    let mut true_ranges: Vec<Decimal> = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        let hl = candle.high - candle.low;
        let tr = if i == 0 {
            hl
        } else {
            let prev_close = candles[i - 1].close;
            let hc = (candle.high - prev_close).abs();
            let lc = (candle.low - prev_close).abs();
            hl.max(hc).max(lc)
        };
        true_ranges.push(tr);
    }

    (0..true_ranges.len())
        .map(|i| {
            let available = i + 1;
            if available < min_periods {
                return None;
            }
            let window = available.min(period);
            let sum: Decimal = true_ranges[i + 1 - window..=i].iter().copied().sum();
            Some(sum / Decimal::from(window))
        })
        .collect()
}

/// Supertrend over the candle series: band-ratcheted `hl2 ± multiplier *
/// ATR`, direction flipping when the close crosses the opposite band.
///
/// Returns `None` until the ATR is formed.
#[must_use]
pub fn supertrend(
    candles: &[Candle],
    period: usize,
    multiplier: Decimal,
) -> Option<SupertrendPoint> {
    let atr = atr_series(candles, period);
    let two = Decimal::from(2);

    let mut prev_upper: Option<Decimal> = None;
    let mut prev_lower: Option<Decimal> = None;
    let mut prev_close: Option<Decimal> = None;
    let mut uptrend = true;
    let mut line: Option<Decimal> = None;

    for (i, candle) in candles.iter().enumerate() {
        let Some(atr_i) = atr[i] else { continue };
        let hl2 = (candle.high + candle.low) / two;
        let basic_upper = hl2 + multiplier * atr_i;
        let basic_lower = hl2 - multiplier * atr_i;

        // bands only tighten while price stays on their inner side
        let final_upper = match (prev_upper, prev_close) {
            (Some(pu), Some(pc)) if pc <= pu => basic_upper.min(pu),
            _ => basic_upper,
        };
        let final_lower = match (prev_lower, prev_close) {
            (Some(pl), Some(pc)) if pc >= pl => basic_lower.max(pl),
            _ => basic_lower,
        };

        uptrend = match (prev_upper, prev_lower) {
            (Some(pu), Some(pl)) => {
                if candle.close > pu {
                    true
                } else if candle.close < pl {
                    false
                } else {
                    uptrend
                }
            }
            _ => candle.close >= hl2,
        };

        line = Some(if uptrend { final_lower } else { final_upper });
        prev_upper = Some(final_upper);
        prev_lower = Some(final_lower);
        prev_close = Some(candle.close);
    }

    line.map(|line| SupertrendPoint { line, uptrend })
}
