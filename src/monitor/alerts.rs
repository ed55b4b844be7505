//! Alert rule evaluation
//!
//! The store's triggered flag is the single source of truth: a rule is
//! reported only by the evaluation whose `mark_triggered` call flipped it,
//! so overlapping evaluations for the same token cannot double-fire.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, instrument};

use crate::common::errors::Result;
use crate::common::traits::Store;
use crate::common::types::{AlertRule, NewAlertRule, TokenSnapshot, TriggeredAlert};

/// Default bound on each store call made by the evaluator
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks pending alert rules against fresh snapshots
#[derive(Clone)]
pub struct AlertEvaluator {
    store: Arc<dyn Store>,
    store_timeout: Duration,
}

impl AlertEvaluator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_store_timeout(store, DEFAULT_STORE_TIMEOUT)
    }

    pub fn with_store_timeout(store: Arc<dyn Store>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Run a store call, failing with `Timeout` if it does not finish in time
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        timeout(self.store_timeout, call).await?
    }

    /// Validate and persist a new rule
    #[instrument(skip(self, rule), fields(token = %rule.token_address, kind = %rule.kind))]
    pub async fn create_rule(&self, rule: NewAlertRule) -> Result<AlertRule> {
        rule.validate()?;
        let stored = self.bounded(self.store.insert_alert(&rule)).await?;
        info!(alert_id = stored.id, "Alert rule created");
        Ok(stored)
    }

    /// Fire every pending rule for the snapshot's token whose condition holds
    ///
    /// Fails only when pending rules cannot be loaded. A rule whose trigger
    /// cannot be persisted in time stays unreported.
    pub async fn evaluate(&self, snapshot: &TokenSnapshot) -> Result<Vec<TriggeredAlert>> {
        let pending = self
            .bounded(self.store.list_alerts(&snapshot.address, Some(false)))
            .await?;

        let mut triggered = Vec::new();
        for rule in pending
            .iter()
            .filter(|rule| !rule.triggered && rule.kind.is_met(snapshot, rule.threshold))
        {
            match self.bounded(self.store.mark_triggered(rule.id)).await {
                Ok(true) => {
                    info!(
                        alert_id = rule.id,
                        token = %snapshot.address,
                        symbol = %snapshot.symbol,
                        "ALERT: {}",
                        rule.message
                    );
                    triggered.push(TriggeredAlert::from_rule(rule, snapshot));
                }
                // Another evaluation got there first
                Ok(false) => {}
                Err(e) => {
                    error!(alert_id = rule.id, "Failed to mark alert triggered: {}", e);
                }
            }
        }
        Ok(triggered)
    }
}
