//! Open-position state and exit reasons.

use chrono::{DateTime, Utc};
use orbit_core::OptionSide;
use rust_decimal::Decimal;

/// One open position. Created on an approved entry, destroyed on exit.
///
/// `peak_price` only ever rises; `stop_price` only ever rises once a
/// ratchet has fired; `qty` is immutable after creation.
#[derive(Debug, Clone)]
pub struct Position {
    pub id: u64,
    pub symbol: String,
    pub side: OptionSide,
    pub is_core: bool,
    pub note: String,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub qty: u32,
    pub stop_price: Decimal,
    pub target_price: Decimal,
    pub peak_price: Decimal,
    /// Highest trailing profit level already consumed.
    pub last_trail_level: Decimal,
    /// Append-only (time, price) observations.
    pub history: Vec<(DateTime<Utc>, Decimal)>,
}

impl Position {
    /// Appends a price observation and lifts the peak if exceeded.
    pub fn record(&mut self, ts: DateTime<Utc>, price: Decimal) {
        self.history.push((ts, price));
        if price > self.peak_price {
            self.peak_price = price;
        }
    }

    /// Profit relative to entry, percent.
    #[must_use]
    pub fn profit_pct(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * Decimal::from(100) / self.entry_price
    }

    /// Minutes held since entry.
    #[must_use]
    pub fn held_minutes(&self, now: DateTime<Utc>) -> f64 {
        (now - self.entry_time).num_seconds() as f64 / 60.0
    }

    /// The stop has been ratcheted to or above entry — a close here
    /// cannot lose more than costs.
    #[must_use]
    pub fn is_loss_proof(&self) -> bool {
        self.stop_price >= self.entry_price
    }
}

/// Terminal reason for a position exit.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Retracement from peak, percent, at the moment of trigger.
    HardDrawdown(Decimal),
    /// Minutes held at the moment of trigger.
    ScalpTimeLimit(f64),
    SquareOff,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopLoss => write!(f, "Stop-Loss"),
            Self::TakeProfit => write!(f, "Take-Profit"),
            Self::HardDrawdown(dd) => write!(f, "Hard DD {dd:.1}% from peak"),
            Self::ScalpTimeLimit(min) => write!(f, "Scalp time exit {min:.1}m"),
            Self::SquareOff => write!(f, "Square-off"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn position() -> Position {
        let entry_time = Utc.with_ymd_and_hms(2025, 8, 25, 4, 30, 0).unwrap();
        Position {
            id: 1,
            symbol: "NSE:NIFTY25AUG24700CE".to_string(),
            side: OptionSide::Call,
            is_core: true,
            note: "CORE".to_string(),
            entry_time,
            entry_price: dec!(100),
            qty: 75,
            stop_price: dec!(75),
            target_price: dec!(140),
            peak_price: dec!(100),
            last_trail_level: Decimal::ZERO,
            history: Vec::new(),
        }
    }

    #[test]
    fn peak_is_monotonic_under_any_price_path() {
        let mut pos = position();
        let prices = [105, 112, 98, 120, 90, 119];
        let mut last_peak = pos.peak_price;
        for (i, price) in prices.iter().enumerate() {
            pos.record(
                pos.entry_time + Duration::seconds(i as i64),
                Decimal::from(*price),
            );
            assert!(pos.peak_price >= last_peak);
            last_peak = pos.peak_price;
        }
        assert_eq!(pos.peak_price, dec!(120));
        assert_eq!(pos.history.len(), prices.len());
    }

    #[test]
    fn profit_pct_is_relative_to_entry() {
        let pos = position();
        assert_eq!(pos.profit_pct(dec!(110)), dec!(10));
        assert_eq!(pos.profit_pct(dec!(85)), dec!(-15));
    }

    #[test]
    fn loss_proof_once_stop_reaches_entry() {
        let mut pos = position();
        assert!(!pos.is_loss_proof());
        pos.stop_price = dec!(100);
        assert!(pos.is_loss_proof());
    }

    #[test]
    fn exit_reasons_render_like_the_trade_log() {
        assert_eq!(ExitReason::StopLoss.to_string(), "Stop-Loss");
        assert_eq!(
            ExitReason::HardDrawdown(dec!(10.26)).to_string(),
            "Hard DD 10.3% from peak"
        );
        assert_eq!(
            ExitReason::ScalpTimeLimit(12.5).to_string(),
            "Scalp time exit 12.5m"
        );
    }
}
