//! Market regime classification and secondary-strategy routing.

use rust_decimal::Decimal;

/// RSI momentum regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiRegime {
    Bull,
    Bear,
    Neutral,
    Unknown,
}

impl RsiRegime {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bull => "bull",
            Self::Bear => "bear",
            Self::Neutral => "neutral",
            Self::Unknown => "unknown",
        }
    }
}

/// Classifies the RSI regime with hysteresis: once a regime is
/// established, the threshold for flipping to the opposite regime moves
/// away by `hysteresis` points, damping oscillation around the cutoffs.
#[must_use]
pub fn rsi_regime(
    rsi: Option<f64>,
    last: RsiRegime,
    long_min: f64,
    short_max: f64,
    hysteresis: f64,
) -> RsiRegime {
    let Some(rsi) = rsi else {
        return RsiRegime::Unknown;
    };

    let mut up = long_min;
    let mut down = short_max;
    match last {
        RsiRegime::Bull => down = short_max - hysteresis,
        RsiRegime::Bear => up = long_min + hysteresis,
        _ => {}
    }

    if rsi > up {
        RsiRegime::Bull
    } else if rsi < down {
        RsiRegime::Bear
    } else {
        RsiRegime::Neutral
    }
}

/// Market regime from price-vs-band position and RSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    TrendUp,
    TrendDown,
    Range,
    Unknown,
}

/// Classifies the regime: trending when the index sits outside the
/// opening-range entry bands with confirming RSI, ranging otherwise,
/// unknown until the RSI has formed.
#[must_use]
pub fn classify(
    price: Decimal,
    rsi: Option<f64>,
    hi_band: Option<Decimal>,
    lo_band: Option<Decimal>,
    long_min: f64,
    short_max: f64,
) -> Regime {
    let Some(rsi) = rsi else {
        return Regime::Unknown;
    };
    if let Some(hi) = hi_band {
        if price > hi && rsi > long_min {
            return Regime::TrendUp;
        }
    }
    if let Some(lo) = lo_band {
        if price < lo && rsi < short_max {
            return Regime::TrendDown;
        }
    }
    Regime::Range
}

/// The two secondary strategies, in routed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryKind {
    TrendFollow,
    Reversion,
}

/// Evaluation order for the secondary strategies: trend-follow first in a
/// trend, reversion first in range/unknown. Both are always tried; the
/// caller short-circuits at the first signal.
#[must_use]
pub const fn route(regime: Regime) -> [SecondaryKind; 2] {
    match regime {
        Regime::TrendUp | Regime::TrendDown => {
            [SecondaryKind::TrendFollow, SecondaryKind::Reversion]
        }
        Regime::Range | Regime::Unknown => [SecondaryKind::Reversion, SecondaryKind::TrendFollow],
    }
}
