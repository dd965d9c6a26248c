//! End-of-session statistics over the closed-trade list.

use chrono::{DateTime, Utc};
use orbit_core::OptionSide;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// One finalized trade.
#[derive(Debug, Clone)]
pub struct ClosedTrade {
    pub symbol: String,
    pub side: OptionSide,
    pub is_core: bool,
    pub reason: String,
    pub pnl: Decimal,
    pub hold_min: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
}

/// Aggregate session statistics, computed once at session end.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub flats: usize,
    pub win_rate: f64,
    pub total_pnl: Decimal,
    pub avg_pnl: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    /// Gross win over gross loss; infinite when nothing was lost.
    pub profit_factor: f64,
    pub best: Decimal,
    pub worst: Decimal,
    pub avg_hold_min: f64,
}

impl SessionSummary {
    #[must_use]
    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        let total = trades.len();
        let wins: Vec<&ClosedTrade> = trades.iter().filter(|t| t.pnl > Decimal::ZERO).collect();
        let losses: Vec<&ClosedTrade> = trades.iter().filter(|t| t.pnl < Decimal::ZERO).collect();
        let flats = total - wins.len() - losses.len();

        let total_pnl: Decimal = trades.iter().map(|t| t.pnl).sum();
        let gross_win: Decimal = wins.iter().map(|t| t.pnl).sum();
        let gross_loss: Decimal = -losses.iter().map(|t| t.pnl).sum::<Decimal>();

        let win_rate = if total == 0 {
            0.0
        } else {
            wins.len() as f64 / total as f64 * 100.0
        };
        let avg_pnl = if total == 0 {
            Decimal::ZERO
        } else {
            total_pnl / Decimal::from(total)
        };
        let avg_win = if wins.is_empty() {
            Decimal::ZERO
        } else {
            gross_win / Decimal::from(wins.len())
        };
        let avg_loss = if losses.is_empty() {
            Decimal::ZERO
        } else {
            -gross_loss / Decimal::from(losses.len())
        };
        let profit_factor = if gross_loss > Decimal::ZERO {
            (gross_win / gross_loss).to_f64().unwrap_or(f64::INFINITY)
        } else {
            f64::INFINITY
        };

        let best = trades.iter().map(|t| t.pnl).max().unwrap_or(Decimal::ZERO);
        let worst = trades.iter().map(|t| t.pnl).min().unwrap_or(Decimal::ZERO);
        let avg_hold_min = if total == 0 {
            0.0
        } else {
            trades.iter().map(|t| t.hold_min).sum::<f64>() / total as f64
        };

        Self {
            total,
            wins: wins.len(),
            losses: losses.len(),
            flats,
            win_rate,
            total_pnl,
            avg_pnl,
            avg_win,
            avg_loss,
            profit_factor,
            best,
            worst,
            avg_hold_min,
        }
    }

    /// (name, display value) rows in the order they are logged.
    #[must_use]
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total", self.total.to_string()),
            ("wins", self.wins.to_string()),
            ("losses", self.losses.to_string()),
            ("flats", self.flats.to_string()),
            ("win_rate", format!("{:.2}", self.win_rate)),
            ("total_pnl", self.total_pnl.to_string()),
            ("avg_pnl", self.avg_pnl.round_dp(2).to_string()),
            ("avg_win", self.avg_win.round_dp(2).to_string()),
            ("avg_loss", self.avg_loss.round_dp(2).to_string()),
            ("profit_factor", format!("{:.3}", self.profit_factor)),
            ("avg_hold", format!("{:.1}", self.avg_hold_min)),
            ("best", self.best.to_string()),
            ("worst", self.worst.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn trade(pnl: Decimal, hold_min: f64) -> ClosedTrade {
        let entry = Utc.with_ymd_and_hms(2025, 8, 25, 5, 0, 0).unwrap();
        ClosedTrade {
            symbol: "NSE:NIFTY25AUG24700CE".to_string(),
            side: OptionSide::Call,
            is_core: true,
            reason: "Take-Profit".to_string(),
            pnl,
            hold_min,
            entry_time: entry,
            exit_time: entry + chrono::Duration::minutes(hold_min as i64),
        }
    }

    #[test]
    fn mixed_session_statistics() {
        let trades = vec![
            trade(dec!(50), 20.0),
            trade(dec!(-20), 10.0),
            trade(dec!(30), 30.0),
            trade(dec!(-10), 12.0),
        ];
        let summary = SessionSummary::from_trades(&trades);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.wins, 2);
        assert_eq!(summary.losses, 2);
        assert_eq!(summary.flats, 0);
        assert_eq!(summary.win_rate, 50.0);
        assert_eq!(summary.total_pnl, dec!(50));
        assert_eq!(summary.avg_pnl, dec!(12.5));
        assert_eq!(summary.avg_win, dec!(40));
        assert_eq!(summary.avg_loss, dec!(-15));
        assert!((summary.profit_factor - 80.0 / 30.0).abs() < 1e-9);
        assert_eq!(summary.best, dec!(50));
        assert_eq!(summary.worst, dec!(-20));
        assert_eq!(summary.avg_hold_min, 18.0);
    }

    #[test]
    fn lossless_session_has_infinite_profit_factor() {
        let trades = vec![trade(dec!(100), 15.0), trade(dec!(25), 8.0)];
        let summary = SessionSummary::from_trades(&trades);
        assert!(summary.profit_factor.is_infinite());
        assert_eq!(summary.losses, 0);
    }

    #[test]
    fn empty_session_is_all_zeroes() {
        let summary = SessionSummary::from_trades(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.total_pnl, Decimal::ZERO);
        assert!(summary.profit_factor.is_infinite());
    }

    #[test]
    fn flat_trades_counted_separately() {
        let trades = vec![trade(dec!(0), 5.0), trade(dec!(10), 5.0)];
        let summary = SessionSummary::from_trades(&trades);
        assert_eq!(summary.flats, 1);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.win_rate, 50.0);
    }
}
