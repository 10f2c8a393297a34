//! Time-bounded dedupe cache for API calls
//!
//! A key is *fresh* while it was committed less than `ttl` ago. Keys can
//! also be *claimed* while the call they guard is in flight, so two
//! triggering messages never start the same call twice; a failed call
//! releases the claim and a later trigger may retry.

use feedlink::ShutdownSignal;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Slot {
    Pending,
    Done(Instant),
}

/// Shared key → timestamp store with a time to live
#[derive(Debug)]
pub struct ExpiringMap<K> {
    entries: RwLock<HashMap<K, Slot>>,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone> ExpiringMap<K> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn live(&self, slot: Slot, now: Instant) -> bool {
        match slot {
            Slot::Pending => true,
            Slot::Done(at) => now.duration_since(at) < self.ttl,
        }
    }

    /// Committed within the TTL, or claimed
    pub fn fresh(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|slot| self.live(*slot, now))
    }

    /// Claim `key` unless it is fresh
    ///
    /// Returns `true` when the caller now owns the key and must either
    /// [`commit`](Self::commit) or [`release`](Self::release) it.
    pub fn try_claim(&self, key: K) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write();
        if entries.get(&key).is_some_and(|slot| self.live(*slot, now)) {
            return false;
        }
        entries.insert(key, Slot::Pending);
        true
    }

    /// Mark a claimed key as done now
    pub fn commit(&self, key: K) {
        self.entries.write().insert(key, Slot::Done(Instant::now()));
    }

    /// Drop a claim so the key can be retried
    pub fn release(&self, key: &K) {
        let mut entries = self.entries.write();
        if matches!(entries.get(key), Some(Slot::Pending)) {
            entries.remove(key);
        }
    }

    /// Insert as done, regardless of the previous state
    pub fn insert(&self, key: K) {
        self.commit(key);
    }

    pub fn remove(&self, key: &K) {
        self.entries.write().remove(key);
    }

    /// Drop every expired entry, returning how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, slot| self.live(*slot, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static> ExpiringMap<K> {
    /// Sweep every `interval` until shutdown
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: ShutdownSignal,
    ) -> tokio::task::JoinHandle<()> {
        let map = Arc::clone(self);
        tokio::spawn(async move {
            while shutdown.sleep(interval).await {
                let removed = map.sweep();
                if removed > 0 {
                    debug!(removed, remaining = map.len(), "Expiring map swept");
                }
            }
        })
    }
}
