//! In-process store, used by tests and ephemeral runs

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::common::errors::Result;
use crate::common::traits::Store;
use crate::common::types::{AlertRule, NewAlertRule, PricePoint, TokenSnapshot};

#[derive(Debug, Default)]
struct Inner {
    tokens: HashMap<String, TokenSnapshot>,
    history: Vec<PricePoint>,
    alerts: BTreeMap<i64, AlertRule>,
    next_alert_id: i64,
}

/// Store backed by in-memory maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of history entries across all tokens
    pub async fn history_len(&self) -> usize {
        self.inner.read().await.history.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_snapshot(&self, snapshot: &TokenSnapshot) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .tokens
            .insert(snapshot.address.clone(), snapshot.clone());
        Ok(())
    }

    async fn append_history(&self, address: &str, price: Decimal, volume: Decimal) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.history.push(PricePoint {
            address: address.to_string(),
            price,
            volume,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    async fn price_history(&self, address: &str, limit: usize) -> Result<Vec<PricePoint>> {
        let inner = self.inner.read().await;
        Ok(inner
            .history
            .iter()
            .rev()
            .filter(|point| point.address == address)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_alerts(&self, address: &str, triggered: Option<bool>) -> Result<Vec<AlertRule>> {
        let inner = self.inner.read().await;
        Ok(inner
            .alerts
            .values()
            .filter(|rule| rule.token_address == address)
            .filter(|rule| triggered.map_or(true, |t| rule.triggered == t))
            .cloned()
            .collect())
    }

    async fn mark_triggered(&self, alert_id: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.alerts.get_mut(&alert_id) {
            Some(rule) if !rule.triggered => {
                rule.triggered = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_alert(&self, rule: &NewAlertRule) -> Result<AlertRule> {
        let mut inner = self.inner.write().await;
        inner.next_alert_id += 1;
        let stored = AlertRule {
            id: inner.next_alert_id,
            token_address: rule.token_address.clone(),
            kind: rule.kind,
            threshold: rule.threshold,
            message: rule.message.clone(),
            triggered: false,
            created_at: Utc::now(),
        };
        inner.alerts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_tokens(&self) -> Result<Vec<TokenSnapshot>> {
        let inner = self.inner.read().await;
        let mut tokens: Vec<TokenSnapshot> = inner.tokens.values().cloned().collect();
        tokens.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        Ok(tokens)
    }
}
