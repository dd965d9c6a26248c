use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Directional side expressed through options: a call (CE) rides the index
/// up, a put (PE) rides it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// Broker code for the side ("CE" / "PE").
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Call => Self::Put,
            Self::Put => Self::Call,
        }
    }

    /// Both sides, in the order entry gates evaluate them.
    #[must_use]
    pub const fn both() -> [Self; 2] {
        [Self::Call, Self::Put]
    }
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A value held separately for each option side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub call: T,
    pub put: T,
}

impl<T> PerSide<T> {
    pub fn get(&self, side: OptionSide) -> &T {
        match side {
            OptionSide::Call => &self.call,
            OptionSide::Put => &self.put,
        }
    }

    pub fn get_mut(&mut self, side: OptionSide) -> &mut T {
        match side {
            OptionSide::Call => &mut self.call,
            OptionSide::Put => &mut self.put,
        }
    }

    pub fn set(&mut self, side: OptionSide, value: T) {
        *self.get_mut(side) = value;
    }
}

/// Candle resolution supported by the market-data collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Minute,
    Day,
}

impl Resolution {
    /// Wire code used by the broker history endpoint.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Minute => "1",
            Self::Day => "D",
        }
    }
}

/// A single OHLCV candle, timestamps in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// (high + low + close) / 3, the VWAP contribution price.
    #[must_use]
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }
}
