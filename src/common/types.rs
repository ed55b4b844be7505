//! Domain types shared by the monitor, the store and the delivery surface

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::{Result, TrackerError};

/// Point-in-time price/volume view of a tracked token
///
/// Snapshots are never mutated; a newer snapshot for the same address
/// supersedes the previous one as "latest".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    /// Token address (unique key)
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub market_cap: Decimal,
    pub price: Decimal,
    pub volume_24h: Decimal,
    /// Percentage change over the last 24h
    pub change_24h: Decimal,
    pub holder_count: u64,
    pub captured_at: DateTime<Utc>,
}

impl TokenSnapshot {
    /// Create a snapshot with placeholder metadata and zeroed numbers
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: UNKNOWN_NAME.to_string(),
            symbol: UNKNOWN_SYMBOL.to_string(),
            market_cap: Decimal::ZERO,
            price: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            change_24h: Decimal::ZERO,
            holder_count: 0,
            captured_at: Utc::now(),
        }
    }
}

/// Name used when the price source omits one
pub const UNKNOWN_NAME: &str = "Unknown";

/// Symbol used when the price source omits one
pub const UNKNOWN_SYMBOL: &str = "UNK";

/// One entry of the append-only price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub address: String,
    pub price: Decimal,
    pub volume: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Condition an alert rule watches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PriceAbove,
    PriceBelow,
    VolumeAbove,
}

impl AlertKind {
    /// Value of the snapshot this kind compares against its threshold
    pub fn observed_value(&self, snapshot: &TokenSnapshot) -> Decimal {
        match self {
            AlertKind::PriceAbove | AlertKind::PriceBelow => snapshot.price,
            AlertKind::VolumeAbove => snapshot.volume_24h,
        }
    }

    /// Strict comparison of the observed value against `threshold`
    pub fn is_met(&self, snapshot: &TokenSnapshot, threshold: Decimal) -> bool {
        let observed = self.observed_value(snapshot);
        match self {
            AlertKind::PriceAbove | AlertKind::VolumeAbove => observed > threshold,
            AlertKind::PriceBelow => observed < threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PriceAbove => "price_above",
            AlertKind::PriceBelow => "price_below",
            AlertKind::VolumeAbove => "volume_above",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "price_above" => Ok(AlertKind::PriceAbove),
            "price_below" => Ok(AlertKind::PriceBelow),
            "volume_above" => Ok(AlertKind::VolumeAbove),
            other => Err(TrackerError::Validation(format!(
                "unknown alert kind '{}'",
                other
            ))),
        }
    }
}

/// Persisted alert rule
///
/// `triggered` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: i64,
    pub token_address: String,
    pub kind: AlertKind,
    pub threshold: Decimal,
    pub message: String,
    pub triggered: bool,
    pub created_at: DateTime<Utc>,
}

/// Alert rule as submitted by a client, before an id is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlertRule {
    pub token_address: String,
    pub kind: AlertKind,
    pub threshold: Decimal,
    #[serde(default)]
    pub message: String,
}

impl NewAlertRule {
    pub fn new(
        token_address: impl Into<String>,
        kind: AlertKind,
        threshold: Decimal,
        message: impl Into<String>,
    ) -> Self {
        Self {
            token_address: token_address.into(),
            kind,
            threshold,
            message: message.into(),
        }
    }

    /// Parse and validate a JSON alert payload
    pub fn from_json(payload: &str) -> Result<Self> {
        let rule: NewAlertRule = serde_json::from_str(payload)
            .map_err(|e| TrackerError::Validation(format!("malformed alert rule: {}", e)))?;
        rule.validate()?;
        Ok(rule)
    }

    /// Reject rules that could never be evaluated meaningfully
    pub fn validate(&self) -> Result<()> {
        if self.token_address.trim().is_empty() {
            return Err(TrackerError::Validation(
                "alert rule requires a token address".to_string(),
            ));
        }
        if self.threshold.is_sign_negative() {
            return Err(TrackerError::Validation(format!(
                "alert threshold must be non-negative, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Notification produced when a rule fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    pub alert_id: i64,
    /// Token address the rule watches
    pub token: String,
    pub symbol: String,
    pub kind: AlertKind,
    pub message: String,
    pub threshold: Decimal,
    pub current_price: Decimal,
    /// Price or volume, depending on `kind`
    pub observed_value: Decimal,
    pub triggered_at: DateTime<Utc>,
}

impl TriggeredAlert {
    pub fn from_rule(rule: &AlertRule, snapshot: &TokenSnapshot) -> Self {
        Self {
            alert_id: rule.id,
            token: rule.token_address.clone(),
            symbol: snapshot.symbol.clone(),
            kind: rule.kind,
            message: rule.message.clone(),
            threshold: rule.threshold,
            current_price: snapshot.price,
            observed_value: rule.kind.observed_value(snapshot),
            triggered_at: snapshot.captured_at,
        }
    }
}
