//! Full configuration surface, validated once at startup.
//!
//! Every knob has a documented default mirroring the reference deployment;
//! partial TOML files override only what they name.

use anyhow::{ensure, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub instrument: InstrumentConfig,
    pub session: SessionConfig,
    pub risk: RiskConfig,
    pub core_position: CorePositionConfig,
    pub scalp: ScalpConfig,
    pub rsi: RsiConfig,
    pub strategies: StrategiesConfig,
    pub timing: TimingConfig,
    pub observability: ObservabilityConfig,
    pub gateway: GatewayConfig,
}

/// Index and option-contract identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Quoted index symbol, e.g. "NSE:NIFTY50-INDEX".
    pub index_symbol: String,
    /// Option symbol root, e.g. "NIFTY".
    pub option_root: String,
    /// Weekly/monthly expiry code embedded in option symbols, e.g. "25AUG".
    pub expiry_code: String,
    /// Strike grid spacing in index points.
    pub strike_step: u32,
    /// Exchange segments probed during symbol resolution, in order.
    pub segments: Vec<String>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            index_symbol: "NSE:NIFTY50-INDEX".to_string(),
            option_root: "NIFTY".to_string(),
            expiry_code: "25AUG".to_string(),
            strike_step: 50,
            segments: vec!["NSE".to_string(), "NFO".to_string()],
        }
    }
}

/// Session window boundaries and tick cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Market open / opening-range window start (exchange-local).
    pub open: NaiveTime,
    /// Opening-range window end (exchange-local).
    pub or_end: NaiveTime,
    /// Forced square-off boundary (exchange-local).
    pub square_off: NaiveTime,
    /// Exchange-local offset from UTC in seconds (IST = 19800).
    pub utc_offset_secs: i32,
    /// Polling cadence between ticks.
    pub tick_interval_ms: u64,
    /// Skip waiting for the opening-range window to complete (testing).
    pub start_immediately: bool,
    /// Fall back to the last trading day's candles when today has none
    /// (off-hours testing).
    pub use_prev_day_when_empty: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            or_end: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            square_off: NaiveTime::from_hms_opt(15, 20, 0).unwrap(),
            utc_offset_secs: 19800,
            tick_interval_ms: 800,
            start_immediately: false,
            use_prev_day_when_empty: true,
        }
    }
}

impl SessionConfig {
    /// Exchange-local offset as a chrono `FixedOffset`.
    ///
    /// # Panics
    ///
    /// Never panics after `Config::validate` has accepted the offset.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap()
    }

    /// Exchange-local wall time of a UTC instant.
    #[must_use]
    pub fn local_time(&self, ts: DateTime<Utc>) -> NaiveTime {
        ts.with_timezone(&self.offset()).time()
    }

    /// Exchange-local calendar date of a UTC instant.
    #[must_use]
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset()).date_naive()
    }
}

/// Session-wide risk limits shared by all entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Fixed contract quantity per position.
    pub lot_size: u32,
    /// Open-position concurrency cap.
    pub max_concurrent: usize,
    /// Daily realized-loss cap; entries stop once breached.
    pub daily_loss_cap: Decimal,
    /// Brokerage/slippage cost charged per side (entry and exit).
    pub cost_per_side: Decimal,
    /// Global cooldown after any exit, seconds.
    pub cooldown_secs: u64,
    /// Reject entries whose worst-case loss would breach the daily cap.
    pub use_projected_risk_block: bool,
    /// Allow an opposite-side scalp when the natural side already holds a
    /// core position and at least one open position is loss-proof.
    pub allow_opposite_if_safe: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            lot_size: 75,
            max_concurrent: 2,
            daily_loss_cap: Decimal::from(2000),
            cost_per_side: Decimal::from(20),
            cooldown_secs: 60,
            use_projected_risk_block: true,
            allow_opposite_if_safe: true,
        }
    }
}

/// One staged-trailing rung: once profit reaches `level_pct`, the stop is
/// lifted to entry * (1 + `stop_offset_pct`/100).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrailStep {
    pub level_pct: Decimal,
    pub stop_offset_pct: Decimal,
}

/// Core (trend) position lifecycle parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorePositionConfig {
    /// Initial stop-loss, percent below entry.
    pub initial_sl_pct: Decimal,
    /// Initial take-profit, percent above entry.
    pub initial_tp_pct: Decimal,
    /// Staged trailing table, ascending by `level_pct`.
    pub trail_steps: Vec<TrailStep>,
    /// Profit percent that moves the stop to (near) breakeven.
    pub breakeven_at_profit_pct: Decimal,
    /// Breakeven stop offset above entry, percent.
    pub breakeven_offset_pct: Decimal,
    /// Retracement from peak that forces an exit, percent.
    pub dd_hard_drop_pct: Decimal,
    /// Peak must exceed entry by this percent before drawdown exits arm.
    pub min_peak_gain_pct: Decimal,
    /// Timed re-arm floor after a core entry, seconds.
    pub rearm_secs: u64,
    /// Refuse a second core position on an already-held side.
    pub prevent_duplicate_side: bool,
    /// Re-arm a side when the index pulls back inside the opening-range band.
    pub rearm_on_pullback: bool,
}

impl Default for CorePositionConfig {
    fn default() -> Self {
        Self {
            initial_sl_pct: Decimal::from(25),
            initial_tp_pct: Decimal::from(40),
            trail_steps: vec![
                TrailStep {
                    level_pct: Decimal::from(10),
                    stop_offset_pct: Decimal::from(-5),
                },
                TrailStep {
                    level_pct: Decimal::from(20),
                    stop_offset_pct: Decimal::ZERO,
                },
                TrailStep {
                    level_pct: Decimal::from(30),
                    stop_offset_pct: Decimal::from(10),
                },
                TrailStep {
                    level_pct: Decimal::from(40),
                    stop_offset_pct: Decimal::from(20),
                },
            ],
            breakeven_at_profit_pct: Decimal::from(10),
            breakeven_offset_pct: Decimal::new(5, 1),
            dd_hard_drop_pct: Decimal::from(10),
            min_peak_gain_pct: Decimal::from(12),
            rearm_secs: 120,
            prevent_duplicate_side: true,
            rearm_on_pullback: true,
        }
    }
}

/// Scalp (short-hold) position parameters and stacking limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalpConfig {
    pub enabled: bool,
    /// Take-profit on the option premium, percent.
    pub tp_pct: Decimal,
    /// Stop-loss on the option premium, percent.
    pub sl_pct: Decimal,
    /// Time-based exit when no target is hit, minutes.
    pub max_hold_min: i64,
    /// Cooldown after a scalp exit before the next scalp, seconds.
    pub cooldown_secs: u64,
    /// Cap on concurrently open scalps.
    pub max_open: usize,
    /// Per-side scalp cap (0 disables the per-side check).
    pub max_per_side: usize,
    /// Minimum gap between scalp entries, seconds (global and per side).
    pub entry_min_gap_secs: u64,
    /// Retracement from peak forcing a scalp exit, percent.
    pub dd_hard_drop_pct: Decimal,
    /// Peak gain required before scalp drawdown exits arm, percent.
    pub min_peak_gain_pct: Decimal,
}

impl Default for ScalpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tp_pct: Decimal::from(7),
            sl_pct: Decimal::from(8),
            max_hold_min: 12,
            cooldown_secs: 120,
            max_open: 1,
            max_per_side: 1,
            entry_min_gap_secs: 180,
            dd_hard_drop_pct: Decimal::from(8),
            min_peak_gain_pct: Decimal::from(6),
        }
    }
}

/// RSI computation and directional gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiConfig {
    pub enabled: bool,
    pub period: usize,
    /// Aggregation timeframe for RSI candles, minutes.
    pub timeframe_min: u32,
    /// Minimum RSI to allow long entries.
    pub long_min: f64,
    /// Maximum RSI to allow short entries.
    pub short_max: f64,
    /// Threshold relaxation once a regime is established, RSI points.
    pub hysteresis: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 14,
            timeframe_min: 5,
            long_min: 55.0,
            short_max: 45.0,
            hysteresis: 1.0,
        }
    }
}

/// Opening-range breakout knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbConfig {
    /// Band extension beyond the opening-range high/low, percent.
    pub entry_buffer_pct: Decimal,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            entry_buffer_pct: Decimal::new(5, 2),
        }
    }
}

/// Bollinger mean-reversion scalper knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BbConfig {
    /// Rolling window on 1-minute closes.
    pub period: usize,
    /// Band width in standard deviations.
    pub std_k: f64,
    /// Neutral-RSI window lower bound.
    pub rsi_min: f64,
    /// Neutral-RSI window upper bound.
    pub rsi_max: f64,
    /// Minutes of 1-minute data fed into the bands.
    pub lookback_min: i64,
}

impl Default for BbConfig {
    fn default() -> Self {
        Self {
            period: 20,
            std_k: 2.0,
            rsi_min: 40.0,
            rsi_max: 60.0,
            lookback_min: 90,
        }
    }
}

/// Supertrend trend-follow knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupertrendConfig {
    /// ATR period on aggregated candles.
    pub period: usize,
    /// ATR multiplier for the trailing line.
    pub multiplier: Decimal,
    /// Aggregation timeframe, minutes.
    pub timeframe_min: u32,
}

impl Default for SupertrendConfig {
    fn default() -> Self {
        Self {
            period: 10,
            multiplier: Decimal::from(3),
            timeframe_min: 5,
        }
    }
}

/// VWAP reversion knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VwapConfig {
    /// Band width in rolling standard deviations around VWAP.
    pub band_k: f64,
    /// Minutes of 1-minute data fed into the bands.
    pub lookback_min: i64,
    /// Rolling window for the close-vs-VWAP deviation.
    pub dev_window: usize,
}

impl Default for VwapConfig {
    fn default() -> Self {
        Self {
            band_k: 2.0,
            lookback_min: 120,
            dev_window: 20,
        }
    }
}

/// Per-strategy parameter blocks.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StrategiesConfig {
    pub orb: OrbConfig,
    pub bb: BbConfig,
    pub supertrend: SupertrendConfig,
    pub vwap: VwapConfig,
}

/// Holding-time based target management.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Grace period before dynamic target rules apply, minutes.
    pub min_hold_min: i64,
    /// Profit percent considered "slow" past the time-exit threshold.
    pub slow_profit_pct: Decimal,
    /// Holding time past which a slow position's target tightens, minutes.
    pub time_exit_min: i64,
    /// Tightened take-profit, percent above entry.
    pub reduced_tp_pct: Decimal,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_hold_min: 5,
            slow_profit_pct: Decimal::from(15),
            time_exit_min: 30,
            reduced_tp_pct: Decimal::from(25),
        }
    }
}

/// Snapshots, diagnostics, and momentum change-logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Full market+positions snapshot cadence, seconds.
    pub snapshot_interval_secs: u64,
    /// Emit no-entry diagnostics.
    pub diagnostics: bool,
    /// Minimum seconds between diagnostic emissions.
    pub diag_interval_secs: u64,
    /// Suppress diagnostics whose reason set did not change.
    pub diag_only_on_change: bool,
    /// Emit RSI-regime and price-zone transition logs.
    pub momentum_logs: bool,
    /// Directory for the CSV trade log.
    pub log_dir: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: 900,
            diagnostics: true,
            diag_interval_secs: 900,
            diag_only_on_change: true,
            momentum_logs: true,
            log_dir: "logs".to_string(),
        }
    }
}

/// Broker REST gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Broker application id, prefixed to the bearer token.
    pub client_id: String,
    /// Path to the raw access-token file.
    pub token_path: String,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-t1.fyers.in/api/v3".to_string(),
            client_id: String::new(),
            token_path: "accessToken/token.txt".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Config {
    /// Validates the whole surface once at startup.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field on the first violation.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.instrument.index_symbol.is_empty(),
            "instrument.index_symbol must not be empty"
        );
        ensure!(
            self.instrument.strike_step > 0,
            "instrument.strike_step must be positive"
        );
        ensure!(
            !self.instrument.segments.is_empty(),
            "instrument.segments must list at least one exchange segment"
        );

        ensure!(
            self.session.open < self.session.or_end,
            "session.open must precede session.or_end"
        );
        ensure!(
            self.session.or_end < self.session.square_off,
            "session.or_end must precede session.square_off"
        );
        ensure!(
            FixedOffset::east_opt(self.session.utc_offset_secs).is_some(),
            "session.utc_offset_secs is out of range"
        );
        ensure!(
            self.session.tick_interval_ms > 0,
            "session.tick_interval_ms must be positive"
        );

        ensure!(self.risk.lot_size > 0, "risk.lot_size must be positive");
        ensure!(
            self.risk.max_concurrent > 0,
            "risk.max_concurrent must be positive"
        );
        ensure!(
            self.risk.daily_loss_cap > Decimal::ZERO,
            "risk.daily_loss_cap must be positive"
        );
        ensure!(
            self.risk.cost_per_side >= Decimal::ZERO,
            "risk.cost_per_side must not be negative"
        );

        let pct_range = |name: &str, value: Decimal| -> Result<()> {
            ensure!(
                value > Decimal::ZERO && value < Decimal::from(100),
                "{name} must be in (0, 100)"
            );
            Ok(())
        };
        pct_range("core_position.initial_sl_pct", self.core_position.initial_sl_pct)?;
        pct_range("core_position.initial_tp_pct", self.core_position.initial_tp_pct)?;
        pct_range("scalp.sl_pct", self.scalp.sl_pct)?;
        pct_range("scalp.tp_pct", self.scalp.tp_pct)?;

        let mut prev_level: Option<Decimal> = None;
        for step in &self.core_position.trail_steps {
            if let Some(prev) = prev_level {
                ensure!(
                    step.level_pct > prev,
                    "core_position.trail_steps must ascend strictly by level_pct"
                );
            }
            prev_level = Some(step.level_pct);
        }

        ensure!(self.rsi.period > 1, "rsi.period must exceed 1");
        ensure!(
            self.rsi.timeframe_min > 0,
            "rsi.timeframe_min must be positive"
        );
        ensure!(
            self.rsi.long_min > self.rsi.short_max,
            "rsi.long_min must exceed rsi.short_max"
        );
        ensure!(self.rsi.hysteresis >= 0.0, "rsi.hysteresis must not be negative");

        ensure!(
            self.strategies.bb.rsi_min < self.strategies.bb.rsi_max,
            "strategies.bb.rsi_min must be below strategies.bb.rsi_max"
        );
        ensure!(
            self.strategies.bb.period > 1,
            "strategies.bb.period must exceed 1"
        );
        ensure!(
            self.strategies.supertrend.period > 1,
            "strategies.supertrend.period must exceed 1"
        );
        ensure!(
            self.strategies.supertrend.timeframe_min > 0,
            "strategies.supertrend.timeframe_min must be positive"
        );
        ensure!(
            self.strategies.vwap.dev_window > 1,
            "strategies.vwap.dev_window must exceed 1"
        );

        ensure!(
            self.scalp.max_hold_min > 0,
            "scalp.max_hold_min must be positive"
        );
        ensure!(self.timing.min_hold_min >= 0, "timing.min_hold_min must not be negative");

        Ok(())
    }
}
