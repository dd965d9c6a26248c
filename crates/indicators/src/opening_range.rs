//! Opening-range extraction from 1-minute candles.

use chrono::{FixedOffset, NaiveTime};
use orbit_core::Candle;
use rust_decimal::Decimal;

/// High/low of the index during the opening window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpeningRange {
    pub high: Decimal,
    pub low: Decimal,
}

/// Opening-range high/low over candles whose exchange-local time falls in
/// `[start, end)`. Returns `None` when the window holds no candles —
/// callers treat that as fatal at session start.
#[must_use]
pub fn opening_range(
    candles: &[Candle],
    start: NaiveTime,
    end: NaiveTime,
    offset: FixedOffset,
) -> Option<OpeningRange> {
    let mut high: Option<Decimal> = None;
    let mut low: Option<Decimal> = None;

    for candle in candles {
        let local = candle.timestamp.with_timezone(&offset).time();
        if local < start || local >= end {
            continue;
        }
        high = Some(high.map_or(candle.high, |h| h.max(candle.high)));
        low = Some(low.map_or(candle.low, |l| l.min(candle.low)));
    }

    Some(OpeningRange {
        high: high?,
        low: low?,
    })
}
