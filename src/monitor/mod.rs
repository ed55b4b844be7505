//! Price monitoring core
//!
//! - [`TrackedTokens`] / [`PriceCache`]: what is polled and its latest state
//! - [`SubscriptionRegistry`]: global and token-scoped listeners
//! - [`AlertEvaluator`]: at-most-once alert firing
//! - [`SniperAnalysis`]: heuristic read of one snapshot
//! - [`MonitorLoop`]: the polling scheduler tying them together

pub mod alerts;
pub mod analysis;
pub mod monitor_loop;
pub mod registry;
pub mod tracker;

pub use alerts::AlertEvaluator;
pub use analysis::{MarketCapRange, RiskLevel, SniperAnalysis, SniperIndicators};
pub use monitor_loop::{MonitorHandle, MonitorLoop, MonitorPhase, PassReport};
pub use registry::{BroadcastReport, SharedListener, SubscriptionRegistry};
pub use tracker::{PriceCache, TrackedTokens};
