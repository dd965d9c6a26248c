//! Shared mean-reversion helpers.

use orbit_core::OptionSide;
use rust_decimal::Decimal;

/// Tag-and-reject: the previous close tagged (closed at/beyond) a band
/// and the live price has reverted back inside it.
#[must_use]
pub fn tag_and_reject(
    prev_close: Decimal,
    live: Decimal,
    upper: Decimal,
    lower: Decimal,
) -> Option<OptionSide> {
    if prev_close <= lower && live > lower {
        return Some(OptionSide::Call);
    }
    if prev_close >= upper && live < upper {
        return Some(OptionSide::Put);
    }
    None
}

/// True when the RSI sits inside the neutral window — reversion entries
/// stay out of strongly trending conditions.
#[must_use]
pub fn rsi_in_range(rsi: f64, min: f64, max: f64) -> bool {
    (min..=max).contains(&rsi)
}
