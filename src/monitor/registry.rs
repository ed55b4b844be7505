//! Subscription registry: who receives which events
//!
//! Listeners are either global (every event) or scoped to one token; a
//! listener may be in both. Broadcasts copy the target list under the lock
//! and deliver after releasing it, so listeners can join or leave while a
//! broadcast is in flight. A failed delivery removes the listener.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, warn};

use super::tracker::TrackedTokens;
use crate::common::events::ServerEvent;
use crate::common::traits::{Listener, ListenerId};

/// Listener shared between the registry and its connection
pub type SharedListener = Arc<dyn Listener>;

#[derive(Default)]
struct Subscriptions {
    global: HashMap<ListenerId, SharedListener>,
    scoped: HashMap<String, HashMap<ListenerId, SharedListener>>,
}

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Listeners removed because delivery failed
    pub dropped: usize,
}

/// Registry of global and token-scoped listeners
pub struct SubscriptionRegistry {
    subscriptions: RwLock<Subscriptions>,
    tracked: Arc<TrackedTokens>,
}

impl SubscriptionRegistry {
    pub fn new(tracked: Arc<TrackedTokens>) -> Self {
        Self {
            subscriptions: RwLock::new(Subscriptions::default()),
            tracked,
        }
    }

    /// Tracked-token set fed by scoped subscriptions
    pub fn tracked(&self) -> &Arc<TrackedTokens> {
        &self.tracked
    }

    /// Register a listener for every event
    pub fn add_global(&self, listener: SharedListener) {
        let id = listener.id();
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .global
            .insert(id, listener);
        debug!(listener = %id, "Global listener added");
    }

    /// Register a listener for one token's events and start tracking it
    ///
    /// Returns `true` if the token was not tracked before.
    pub fn add_scoped(&self, listener: SharedListener, token: &str) -> bool {
        let id = listener.id();
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .scoped
            .entry(token.to_string())
            .or_default()
            .insert(id, listener);
        debug!(listener = %id, token = %token, "Scoped listener added");
        self.tracked.track(token)
    }

    /// Remove a listener from every scope in one step
    ///
    /// Returns `true` if it was registered anywhere.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut removed = subscriptions.global.remove(&id).is_some();
        subscriptions.scoped.retain(|_, listeners| {
            removed |= listeners.remove(&id).is_some();
            !listeners.is_empty()
        });

        if removed {
            debug!(listener = %id, "Listener removed");
        }
        removed
    }

    pub fn global_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .global
            .len()
    }

    pub fn scoped_count(&self, token: &str) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .scoped
            .get(token)
            .map_or(0, HashMap::len)
    }

    pub fn is_registered(&self, id: ListenerId) -> bool {
        let subscriptions = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        subscriptions.global.contains_key(&id)
            || subscriptions.scoped.values().any(|l| l.contains_key(&id))
    }

    /// Deliver to every global listener
    pub fn broadcast_global(&self, event: &ServerEvent) -> BroadcastReport {
        let targets: Vec<SharedListener> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .global
            .values()
            .cloned()
            .collect();
        self.deliver(targets, event)
    }

    /// Deliver to listeners scoped to `token` only
    pub fn broadcast_scoped(&self, token: &str, event: &ServerEvent) -> BroadcastReport {
        let targets: Vec<SharedListener> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .scoped
            .get(token)
            .map(|listeners| listeners.values().cloned().collect())
            .unwrap_or_default();
        self.deliver(targets, event)
    }

    fn deliver(&self, targets: Vec<SharedListener>, event: &ServerEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        if targets.is_empty() {
            return report;
        }

        let message = match event.to_json() {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                return report;
            }
        };

        for listener in targets {
            match listener.send(&message) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(listener = %listener.id(), "Delivery failed, disconnecting: {}", e);
                    self.remove(listener.id());
                    report.dropped += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::channels::{create_outbound_channel, ChannelListener};
    use crate::common::errors::TrackerError;
    use crate::common::traits::MockListener;
    use crate::common::types::TokenSnapshot;

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::new(Arc::new(TrackedTokens::new()))
    }

    fn price_update(token: &str) -> ServerEvent {
        ServerEvent::PriceUpdate(TokenSnapshot::empty(token))
    }

    fn failing_listener() -> MockListener {
        let id = ListenerId::next();
        let mut listener = MockListener::new();
        listener.expect_id().return_const(id);
        listener
            .expect_send()
            .returning(|_| Err(TrackerError::ChannelSend("closed".to_string())));
        listener
    }

    #[test]
    fn test_add_scoped_tracks_token() {
        let registry = registry();
        let (tx, _rx) = create_outbound_channel();

        assert!(registry.add_scoped(Arc::new(ChannelListener::new(tx.clone())), "mint_1"));
        assert!(!registry.add_scoped(Arc::new(ChannelListener::new(tx)), "mint_1"));
        assert!(registry.tracked().contains("mint_1"));
        assert_eq!(registry.scoped_count("mint_1"), 2);
    }

    #[test]
    fn test_removed_listener_never_receives() {
        let registry = registry();
        let id = ListenerId::next();
        let mut listener = MockListener::new();
        listener.expect_id().return_const(id);
        listener.expect_send().never();
        let listener: SharedListener = Arc::new(listener);

        registry.add_global(listener.clone());
        registry.add_scoped(listener, "mint_1");
        assert!(registry.remove(id));
        assert!(!registry.is_registered(id));

        let report = registry.broadcast_global(&price_update("mint_1"));
        assert_eq!(report, BroadcastReport::default());
        registry.broadcast_scoped("mint_1", &price_update("mint_1"));
        assert_eq!(registry.scoped_count("mint_1"), 0);
    }

    #[test]
    fn test_listener_in_both_scopes_gets_both_events() {
        let registry = registry();
        let (tx, mut rx) = create_outbound_channel();
        let listener: SharedListener = Arc::new(ChannelListener::new(tx));
        registry.add_global(listener.clone());
        registry.add_scoped(listener, "mint_1");

        let event = price_update("mint_1");
        assert_eq!(registry.broadcast_global(&event).delivered, 1);
        assert_eq!(registry.broadcast_scoped("mint_1", &event).delivered, 1);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_scoped_broadcast_skips_other_tokens() {
        let registry = registry();
        let (tx, mut rx) = create_outbound_channel();
        registry.add_scoped(Arc::new(ChannelListener::new(tx)), "mint_1");

        let report = registry.broadcast_scoped("mint_2", &price_update("mint_2"));
        assert_eq!(report.delivered, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_delivery_removes_only_that_listener() {
        let registry = registry();
        let bad: SharedListener = Arc::new(failing_listener());
        let bad_id = bad.id();
        let (tx, mut rx) = create_outbound_channel();
        let good: SharedListener = Arc::new(ChannelListener::new(tx));

        registry.add_global(bad.clone());
        registry.add_scoped(bad, "mint_1");
        registry.add_global(good.clone());

        let report = registry.broadcast_global(&price_update("mint_1"));
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert!(!registry.is_registered(bad_id));
        assert!(registry.is_registered(good.id()));
        assert_eq!(registry.scoped_count("mint_1"), 0);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_concurrent_add_remove_broadcast() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();

        for worker in 0..4 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..200 {
                    let (tx, rx) = create_outbound_channel();
                    let listener: SharedListener = Arc::new(ChannelListener::new(tx));
                    let id = listener.id();
                    registry.add_global(listener.clone());
                    registry.add_scoped(listener, &format!("mint_{}", worker));
                    registry.broadcast_global(&price_update("mint_0"));
                    if i % 2 == 0 {
                        registry.remove(id);
                    } else {
                        drop(rx);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Closed receivers are pruned by the next broadcast
        registry.broadcast_global(&price_update("mint_0"));
        for worker in 0..4 {
            registry.broadcast_scoped(&format!("mint_{}", worker), &price_update("x"));
        }
        assert_eq!(registry.global_count(), 0);
        assert_eq!(registry.tracked().len(), 4);
    }
}
