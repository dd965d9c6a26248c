//! Real-time decision engine: position lifecycle, risk admission, and
//! the multi-strategy session loop.

pub mod diagnostics;
pub mod exits;
pub mod manager;
pub mod momentum;
pub mod position;
pub mod resolver;
pub mod risk;
pub mod session;
pub mod summary;
pub mod trailing;

pub use diagnostics::DiagnosticsRecorder;
pub use exits::{
    apply_dynamic_target, check_drawdown, check_hard_exit, check_scalp_timeout, TargetAdjustment,
};
pub use manager::PositionManager;
pub use momentum::{MomentumTracker, MomentumUpdate, PriceZone};
pub use position::{ExitReason, Position};
pub use resolver::SymbolResolver;
pub use risk::RiskGate;
pub use session::{prev_trading_close, SessionLoop, TickOutcome};
pub use summary::{ClosedTrade, SessionSummary};
pub use trailing::{apply_stop_ratchets, StopAdjustment};
