//! Stateless transforms of candle series into trading indicators.
//!
//! Every function returns `None` below its minimum sample count — an
//! absence of opinion, never an error.

pub mod aggregate;
pub mod bollinger;
pub mod opening_range;
pub mod rsi;
pub mod supertrend;
pub mod vwap;

pub use aggregate::{aggregate, post_open, within_lookback};
pub use bollinger::{bollinger, BollingerBands};
pub use opening_range::{opening_range, OpeningRange};
pub use rsi::{rsi, rsi_from_1m};
pub use supertrend::{supertrend, SupertrendPoint};
pub use vwap::{vwap_bands, VwapBands};
