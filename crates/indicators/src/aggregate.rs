//! Timeframe aggregation and session filtering for 1-minute candles.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use orbit_core::Candle;

/// Buckets 1-minute candles into `tf_min`-minute candles: first open,
/// max high, min low, last close, summed volume. Input must be ascending
/// by timestamp; partial trailing buckets are kept.
#[must_use]
pub fn aggregate(candles: &[Candle], tf_min: u32) -> Vec<Candle> {
    if candles.is_empty() || tf_min == 0 {
        return Vec::new();
    }
    if tf_min == 1 {
        return candles.to_vec();
    }

    let bucket_secs = i64::from(tf_min) * 60;
    let mut out: Vec<Candle> = Vec::new();
    let mut current_bucket: Option<i64> = None;

    for candle in candles {
        let bucket = candle.timestamp.timestamp().div_euclid(bucket_secs);
        match (current_bucket, out.last_mut()) {
            (Some(open_bucket), Some(agg)) if open_bucket == bucket => {
                agg.high = agg.high.max(candle.high);
                agg.low = agg.low.min(candle.low);
                agg.close = candle.close;
                agg.volume += candle.volume;
            }
            _ => {
                current_bucket = Some(bucket);
                out.push(candle.clone());
            }
        }
    }

    out
}

/// Keeps candles at or after the session open (exchange-local time).
#[must_use]
pub fn post_open(candles: &[Candle], open: NaiveTime, offset: FixedOffset) -> Vec<Candle> {
    candles
        .iter()
        .filter(|c| c.timestamp.with_timezone(&offset).time() >= open)
        .cloned()
        .collect()
}

/// Keeps candles within the trailing lookback window ending at `now`.
#[must_use]
pub fn within_lookback(candles: &[Candle], now: DateTime<Utc>, lookback_min: i64) -> Vec<Candle> {
    let cutoff = now - Duration::minutes(lookback_min);
    candles
        .iter()
        .filter(|c| c.timestamp >= cutoff)
        .cloned()
        .collect()
}
