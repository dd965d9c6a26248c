//! Append-only CSV trade log.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use csv::WriterBuilder;
use orbit_core::{EventSink, TradeEvent};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

const HEADER: [&str; 10] = [
    "timestamp", "event", "symbol", "side", "price", "qty", "reason", "pnl", "day_pnl", "extra",
];

/// One CSV row per event, appended as events happen — no batching. The
/// file is dated per session and the header written exactly once.
pub struct CsvEventSink {
    path: PathBuf,
}

impl CsvEventSink {
    /// Opens (creating if needed) the session log under `dir`.
    pub fn open(dir: impl AsRef<Path>, session_date: NaiveDate) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;

        let path = dir.join(format!("orbit_{}.csv", session_date.format("%Y%m%d")));
        if !path.exists() {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&path)
                .with_context(|| format!("failed to create trade log {}", path.display()))?;
            let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &TradeEvent) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open trade log {}", self.path.display()))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(&[
            event.timestamp.to_rfc3339(),
            event.kind.to_string(),
            event.symbol.clone(),
            event.side.map(|s| s.code().to_string()).unwrap_or_default(),
            event.price.to_string(),
            event.qty.to_string(),
            event.reason.clone(),
            event.pnl.to_string(),
            event.day_pnl.to_string(),
            event.extra.clone(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for CsvEventSink {
    async fn record(&self, event: &TradeEvent) -> Result<()> {
        self.append(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use orbit_core::{EventKind, OptionSide};
    use rust_decimal_macros::dec;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "orbit-csv-test-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn appends_one_row_per_event_after_a_header() {
        let dir = temp_dir();
        let date = NaiveDate::from_ymd_opt(2025, 8, 25).unwrap();
        let sink = CsvEventSink::open(&dir, date).unwrap();

        let enter = TradeEvent::new(Utc::now(), EventKind::Enter)
            .with_symbol("NSE:NIFTY25AUG24700CE")
            .with_side(OptionSide::Call)
            .with_price(dec!(182.4))
            .with_qty(75)
            .with_reason("New CORE");
        let exit = TradeEvent::new(Utc::now(), EventKind::Exit)
            .with_symbol("NSE:NIFTY25AUG24700CE")
            .with_side(OptionSide::Call)
            .with_price(dec!(195.0))
            .with_qty(75)
            .with_reason("Take-Profit")
            .with_pnl(dec!(905))
            .with_day_pnl(dec!(905));

        sink.record(&enter).await.unwrap();
        sink.record(&exit).await.unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,event,symbol"));
        assert!(lines[1].contains("ENTER"));
        assert!(lines[1].contains("CE"));
        assert!(lines[2].contains("Take-Profit"));
        assert!(lines[2].contains("905"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn reopening_does_not_duplicate_the_header() {
        let dir = temp_dir();
        let date = NaiveDate::from_ymd_opt(2025, 8, 25).unwrap();

        let sink = CsvEventSink::open(&dir, date).unwrap();
        sink.record(&TradeEvent::new(Utc::now(), EventKind::Info).with_reason("first"))
            .await
            .unwrap();
        drop(sink);

        let sink = CsvEventSink::open(&dir, date).unwrap();
        sink.record(&TradeEvent::new(Utc::now(), EventKind::Info).with_reason("second"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let headers = contents
            .lines()
            .filter(|l| l.starts_with("timestamp,"))
            .count();
        assert_eq!(headers, 1);
        assert_eq!(contents.lines().count(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }
}
