//! Seams to the external collaborators: price source, store and transport

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

use super::errors::Result;
use super::types::{AlertRule, NewAlertRule, PricePoint, TokenSnapshot};

/// Source of token snapshots (DexScreener, tests, ...)
///
/// Implementations must not be assumed reliable: `Ok(None)` means the
/// source has no data for the token right now.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current snapshot for `address`
    async fn fetch_snapshot(&self, address: &str) -> Result<Option<TokenSnapshot>>;

    /// Name of the source, used in logs
    fn name(&self) -> &'static str;
}

/// Durable storage for snapshots, price history and alert rules
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace the latest snapshot for the token
    async fn upsert_snapshot(&self, snapshot: &TokenSnapshot) -> Result<()>;

    /// Append one entry to the token's price history
    async fn append_history(&self, address: &str, price: Decimal, volume: Decimal) -> Result<()>;

    /// Most recent history entries for a token, newest first
    async fn price_history(&self, address: &str, limit: usize) -> Result<Vec<PricePoint>>;

    /// Alert rules for a token, optionally filtered by triggered state
    async fn list_alerts(&self, address: &str, triggered: Option<bool>) -> Result<Vec<AlertRule>>;

    /// Flip a rule to triggered
    ///
    /// Returns `true` only for the call that performed the transition.
    async fn mark_triggered(&self, alert_id: i64) -> Result<bool>;

    /// Persist a new rule and return it with its assigned id
    async fn insert_alert(&self, rule: &NewAlertRule) -> Result<AlertRule>;

    /// Latest snapshot of every stored token, most recently captured first
    async fn list_tokens(&self) -> Result<Vec<TokenSnapshot>>;
}

/// Identity of a connected listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Delivery target for broadcast events (e.g. a WebSocket connection)
///
/// `send` must not block; any error is treated as a disconnect.
#[cfg_attr(test, mockall::automock)]
pub trait Listener: Send + Sync {
    fn id(&self) -> ListenerId;

    /// Queue a text message for delivery
    fn send(&self, message: &str) -> Result<()>;
}
