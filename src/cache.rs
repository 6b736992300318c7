//! Time-boxed fixture cache with per-key refresh de-duplication.
//!
//! Each key owns an async slot. A caller that finds the slot empty or stale
//! refreshes it while holding the slot lock, so concurrent callers for the
//! same key queue behind that single refresh and then read its result
//! instead of each hitting the upstream sources. Different keys never block
//! each other.
//!
//! Entries are replaced lazily on the next read after expiry; nothing is
//! evicted in the background.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::fixtures::Fixture;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fixtures: Arc<Vec<Fixture>>,
    pub fetched_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    /// Stale strictly after `ttl` has elapsed.
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) > self.ttl
    }
}

/// What a non-blocking look at one key found.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Missing,
    /// A caller holds the slot, normally for an upstream refresh
    Refreshing,
    Entry(CacheEntry),
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Thread-safe fixture cache shared by all request handlers.
#[derive(Clone, Default)]
pub struct FixtureCache {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
}

impl FixtureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live entry for `key`, or run `fetch`, store its result
    /// (empty results included) and return it.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Arc<Vec<Fixture>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<Fixture>>,
    {
        let slot = self.slot(key).await;
        let mut entry = slot.lock().await;

        if let Some(live) = entry.as_ref().filter(|e| !e.is_stale(Instant::now())) {
            debug!("Fixture cache hit for '{}'", key);
            return Arc::clone(&live.fixtures);
        }

        debug!("Fixture cache miss for '{}', refreshing", key);
        let fixtures = Arc::new(fetch().await);
        *entry = Some(CacheEntry {
            fixtures: Arc::clone(&fixtures),
            fetched_at: Instant::now(),
            ttl,
        });
        fixtures
    }

    /// Look at the entry for `key`, live or not, without waiting behind a
    /// refresh in progress.
    pub async fn peek(&self, key: &str) -> Snapshot {
        let Some(slot) = self.slots.read().await.get(key).cloned() else {
            return Snapshot::Missing;
        };
        let entry = match slot.try_lock() {
            Ok(entry) => entry.clone(),
            Err(_) => return Snapshot::Refreshing,
        };
        entry.map_or(Snapshot::Missing, Snapshot::Entry)
    }

    /// Drop stale or empty slots that no caller is using.
    /// Returns how many were removed.
    pub async fn purge_stale(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, slot| {
            // Another caller holds a handle and may be about to lock it
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => entry.as_ref().is_some_and(|e| !e.is_stale(now)),
                Err(_) => true,
            }
        });
        before - slots.len()
    }

    /// Number of keys with a slot.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    async fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(key.to_string()).or_default())
    }
}
