//! Background polling loop
//!
//! ```text
//!        ┌────────── tracked set empty ──────────┐
//!        ▼                                       │
//!      Idle ── tokens tracked ──► Polling ──► Waiting
//!                                   ▲            │
//!                                   └────────────┘
//! ```
//!
//! One token is processed at a time: fetch → broadcast price → persist →
//! evaluate alerts → broadcast alerts. Subscribers see the price before any
//! store call is made, and every fetch and store call is time-bounded. A stop
//! request is honoured at the top of each pass and at every delay point; an
//! in-flight fetch is allowed to finish.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::alerts::AlertEvaluator;
use super::registry::SubscriptionRegistry;
use super::tracker::PriceCache;
use crate::common::errors::Result;
use crate::common::events::ServerEvent;
use crate::common::traits::{PriceSource, Store};
use crate::common::types::TokenSnapshot;
use crate::config::types::MonitorSettings;

/// Current phase of the monitor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Nothing tracked yet
    Idle,
    /// Working through the tracked tokens
    Polling,
    /// Between passes
    Waiting,
    Stopped,
}

/// Counters for one pass over the tracked tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Snapshots fetched and published
    pub fetched: usize,
    /// Source had no data for the token
    pub unavailable: usize,
    /// Fetch errors and timeouts
    pub failed: usize,
    /// Snapshots whose persistence failed (still published)
    pub persist_failures: usize,
    pub alerts_triggered: usize,
}

enum TokenOutcome {
    Published { alerts: usize, persisted: bool },
    Unavailable,
    Failed,
}

/// Controls a running [`MonitorLoop`]
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    stop_tx: Arc<watch::Sender<bool>>,
    phase_rx: watch::Receiver<MonitorPhase>,
}

impl MonitorHandle {
    /// Ask the loop to stop at its next check point
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn phase(&self) -> MonitorPhase {
        *self.phase_rx.borrow()
    }

    /// Wait until the loop reports `phase`
    pub async fn wait_for_phase(&self, phase: MonitorPhase) {
        let mut rx = self.phase_rx.clone();
        let _ = rx.wait_for(|current| *current == phase).await;
    }
}

/// The scheduling core: polls every tracked token and publishes the results
pub struct MonitorLoop {
    source: Arc<dyn PriceSource>,
    store: Arc<dyn Store>,
    registry: Arc<SubscriptionRegistry>,
    cache: Arc<PriceCache>,
    evaluator: AlertEvaluator,
    settings: MonitorSettings,
    stop_rx: watch::Receiver<bool>,
    phase_tx: watch::Sender<MonitorPhase>,
}

impl MonitorLoop {
    pub fn new(
        source: Arc<dyn PriceSource>,
        store: Arc<dyn Store>,
        registry: Arc<SubscriptionRegistry>,
        cache: Arc<PriceCache>,
        settings: MonitorSettings,
    ) -> (Self, MonitorHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (phase_tx, phase_rx) = watch::channel(MonitorPhase::Idle);

        let monitor = Self {
            evaluator: AlertEvaluator::with_store_timeout(
                store.clone(),
                settings.store_timeout(),
            ),
            source,
            store,
            registry,
            cache,
            settings,
            stop_rx,
            phase_tx,
        };
        let handle = MonitorHandle {
            stop_tx: Arc::new(stop_tx),
            phase_rx,
        };
        (monitor, handle)
    }

    pub fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }

    fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    fn set_phase(&self, phase: MonitorPhase) {
        self.phase_tx.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }

    /// Sleep for `duration` unless a stop arrives first
    ///
    /// Returns `false` if the loop should stop.
    async fn pause(&self, duration: Duration) -> bool {
        let mut stop = self.stop_rx.clone();
        if *stop.borrow_and_update() {
            return false;
        }
        tokio::select! {
            _ = sleep(duration) => {}
            changed = stop.changed() => {
                // Handle dropped: nobody can stop us any more
                if changed.is_err() {
                    sleep(duration).await;
                }
            }
        }
        !self.is_stopped()
    }

    /// Run until stopped
    pub async fn run(self) {
        info!(source = self.source.name(), "Starting price monitoring");

        'passes: loop {
            if self.is_stopped() {
                break;
            }

            let tokens = self.registry.tracked().snapshot();
            if tokens.is_empty() {
                self.set_phase(MonitorPhase::Idle);
                if !self.pause(self.settings.idle_poll()).await {
                    break;
                }
                continue;
            }

            self.set_phase(MonitorPhase::Polling);
            let mut report = PassReport::default();
            for address in &tokens {
                self.process_token(address, &mut report).await;
                if !self.pause(self.settings.token_delay()).await {
                    break 'passes;
                }
            }
            debug!(?report, "Pass complete");

            self.set_phase(MonitorPhase::Waiting);
            if !self.pause(self.settings.cycle_delay()).await {
                break;
            }
        }

        self.set_phase(MonitorPhase::Stopped);
        info!("Price monitoring stopped");
    }

    /// One pass over the tracked tokens without inter-token delays
    pub async fn poll_once(&self) -> PassReport {
        let mut report = PassReport::default();
        for address in self.registry.tracked().snapshot() {
            self.process_token(&address, &mut report).await;
        }
        report
    }

    async fn process_token(&self, address: &str, report: &mut PassReport) {
        match self.poll_token(address).await {
            TokenOutcome::Published { alerts, persisted } => {
                report.fetched += 1;
                report.alerts_triggered += alerts;
                if !persisted {
                    report.persist_failures += 1;
                }
            }
            TokenOutcome::Unavailable => report.unavailable += 1,
            TokenOutcome::Failed => report.failed += 1,
        }
    }

    async fn fetch(&self, address: &str) -> Result<Option<TokenSnapshot>> {
        Ok(timeout(
            self.settings.fetch_timeout(),
            self.source.fetch_snapshot(address),
        )
        .await??)
    }

    async fn poll_token(&self, address: &str) -> TokenOutcome {
        let snapshot = match self.fetch(address).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(token = %address, "No data from price source");
                return TokenOutcome::Unavailable;
            }
            Err(e) => {
                warn!(token = %address, "Error fetching token data: {}", e);
                return TokenOutcome::Failed;
            }
        };

        self.cache.insert(snapshot.clone());
        self.publish(address, &ServerEvent::PriceUpdate(snapshot.clone()));

        let persisted = self.persist(&snapshot).await;

        let alerts = match self.evaluator.evaluate(&snapshot).await {
            Ok(alerts) => alerts,
            Err(e) => {
                error!(token = %address, "Failed to load alert rules: {}", e);
                Vec::new()
            }
        };
        let count = alerts.len();
        for alert in alerts {
            self.publish(address, &ServerEvent::AlertTriggered(alert));
        }

        TokenOutcome::Published {
            alerts: count,
            persisted,
        }
    }

    async fn store_call<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        timeout(self.settings.store_timeout(), call).await?
    }

    /// Write snapshot and history; failures are logged, never propagated
    async fn persist(&self, snapshot: &TokenSnapshot) -> bool {
        let mut ok = true;
        if let Err(e) = self.store_call(self.store.upsert_snapshot(snapshot)).await {
            error!(token = %snapshot.address, "Failed to store snapshot: {}", e);
            ok = false;
        }
        if let Err(e) = self
            .store_call(self.store.append_history(
                &snapshot.address,
                snapshot.price,
                snapshot.volume_24h,
            ))
            .await
        {
            error!(token = %snapshot.address, "Failed to append price history: {}", e);
            ok = false;
        }
        ok
    }

    fn publish(&self, address: &str, event: &ServerEvent) {
        let global = self.registry.broadcast_global(event);
        let scoped = self.registry.broadcast_scoped(address, event);
        debug!(
            token = %address,
            delivered = global.delivered + scoped.delivered,
            dropped = global.dropped + scoped.dropped,
            "Event published"
        );
    }
}
