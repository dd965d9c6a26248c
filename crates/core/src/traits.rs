use crate::events::TradeEvent;
use crate::types::{Candle, Resolution};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Market-data / broker gateway consumed by the engine.
///
/// Implementations are expected to surface transport failures as errors;
/// an empty history result is a valid "no data" outcome, not an error.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Last traded price for a symbol.
    async fn quote(&self, symbol: &str) -> Result<Decimal>;

    /// Ordered candles for the inclusive date range.
    async fn history(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Candle>>;
}

/// Structured event log consumed by the engine — one append per event,
/// no batching.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: &TradeEvent) -> Result<()>;
}

/// Wall-clock source. Injected so cooldowns, re-arm windows, and snapshot
/// cadence are deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
