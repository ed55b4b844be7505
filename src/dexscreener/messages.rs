//! DexScreener API response types

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

use crate::common::types::{TokenSnapshot, UNKNOWN_NAME, UNKNOWN_SYMBOL};

/// Response from `/latest/dex/tokens/{address}`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPairsResponse {
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: Option<String>,
    /// Null when the token is unknown
    #[serde(default)]
    pub pairs: Option<Vec<Pair>>,
}

/// A trading pair for the token
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub pair_address: Option<String>,
    #[serde(default)]
    pub base_token: Option<BaseToken>,
    /// Decimal string in the API, numbers accepted too
    #[serde(default)]
    pub price_usd: Option<Value>,
    #[serde(default)]
    pub market_cap: Option<Value>,
    #[serde(default)]
    pub volume: Option<WindowedValues>,
    #[serde(default)]
    pub price_change: Option<WindowedValues>,
}

/// Base token metadata
#[derive(Debug, Clone, Deserialize)]
pub struct BaseToken {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Values reported per time window (m5, h1, h6, h24)
#[derive(Debug, Clone, Deserialize)]
pub struct WindowedValues {
    #[serde(default)]
    pub h24: Option<Value>,
}

/// Lenient decimal conversion: missing or unparseable values become zero
pub(crate) fn decimal_or_zero(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .unwrap_or_default(),
        Some(Value::String(s)) => Decimal::from_str(s.trim()).unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

impl Pair {
    /// Convert into a snapshot, defaulting missing fields
    pub fn into_snapshot(self, address: &str) -> TokenSnapshot {
        let base = self.base_token.as_ref();
        TokenSnapshot {
            address: address.to_string(),
            name: non_empty_or(base.and_then(|b| b.name.as_deref()), UNKNOWN_NAME),
            symbol: non_empty_or(base.and_then(|b| b.symbol.as_deref()), UNKNOWN_SYMBOL),
            market_cap: decimal_or_zero(self.market_cap.as_ref()),
            price: decimal_or_zero(self.price_usd.as_ref()),
            volume_24h: decimal_or_zero(self.volume.as_ref().and_then(|v| v.h24.as_ref())),
            change_24h: decimal_or_zero(self.price_change.as_ref().and_then(|v| v.h24.as_ref())),
            // Not provided by this source
            holder_count: 0,
            captured_at: Utc::now(),
        }
    }
}
