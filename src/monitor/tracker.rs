//! Tracked-token set and latest-snapshot cache

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};
use tracing::info;

use crate::common::types::TokenSnapshot;

/// Tokens the monitor loop polls
///
/// Shared between the monitor loop and the connection handlers.
#[derive(Debug, Default)]
pub struct TrackedTokens {
    tokens: RwLock<BTreeSet<String>>,
}

impl TrackedTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a token; returns `true` if it was not tracked yet
    pub fn track(&self, address: &str) -> bool {
        let added = self
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_string());
        if added {
            info!(token = %address, "Now tracking token");
        }
        added
    }

    pub fn untrack(&self, address: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address)
    }

    pub fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current set, safe to iterate while others mutate it
    pub fn snapshot(&self) -> Vec<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Latest snapshot per token, as last seen by the monitor
#[derive(Debug, Default)]
pub struct PriceCache {
    latest: RwLock<HashMap<String, TokenSnapshot>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, snapshot: TokenSnapshot) {
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.address.clone(), snapshot);
    }

    pub fn get(&self, address: &str) -> Option<TokenSnapshot> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.latest.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
