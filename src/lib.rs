//! Token Tracker Library
//!
//! Polls token prices from DexScreener, persists snapshots, fires one-shot
//! price/volume alerts and fans updates out to WebSocket subscribers.
//! The [`fees`] module is an independent tiered trading-fee engine.

pub mod common;
pub mod config;
pub mod dexscreener;
pub mod fees;
pub mod monitor;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use common::errors::{Result, TrackerError};
pub use common::events::{ClientRequest, ServerEvent};
pub use common::traits::{Listener, ListenerId, PriceSource, Store};
pub use common::types::{
    AlertKind, AlertRule, NewAlertRule, PricePoint, TokenSnapshot, TriggeredAlert,
};
pub use config::types::AppConfig;
pub use dexscreener::DexScreenerClient;
pub use store::{MemoryStore, SqliteStore};

// Monitor types
pub use monitor::{
    AlertEvaluator, BroadcastReport, MonitorHandle, MonitorLoop, MonitorPhase, PassReport,
    PriceCache, RiskLevel, SniperAnalysis, SubscriptionRegistry, TrackedTokens,
};
pub use server::{SessionContext, WebSocketServer};

// Fee engine types
pub use fees::{FeeBreakdown, FeeCalculator, FeeSchedule, FeeTier, TradePhase};
