pub mod clock;
pub mod config;
pub mod config_loader;
pub mod events;
pub mod traits;
pub mod types;

pub use clock::{ManualClock, SystemClock};
pub use config::{
    BbConfig, Config, CorePositionConfig, GatewayConfig, InstrumentConfig, ObservabilityConfig,
    OrbConfig, RiskConfig, RsiConfig, ScalpConfig, SessionConfig, StrategiesConfig,
    SupertrendConfig, TimingConfig, TrailStep, VwapConfig,
};
pub use config_loader::ConfigLoader;
pub use events::{EventKind, TradeEvent};
pub use traits::{Clock, EventSink, MarketData};
pub use types::{Candle, OptionSide, PerSide, Resolution};
