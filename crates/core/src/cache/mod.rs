//! Time-bounded key/value store with debounce-on-touch.
//!
//! Every entry owns exactly one pending eviction timer. Re-inserting or
//! touching a key aborts the old timer before scheduling a new one, and each
//! timer carries the epoch it was armed with so a timer that already woke up
//! cannot evict a newer epoch of the same key.

mod artifacts;

pub use artifacts::{ArtifactEvictor, ArtifactRegistry};

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::metrics::{CACHE_EVICTIONS, CACHE_EVICTION_FAILURES};

/// Side effect run after an entry has been evicted by its timer.
///
/// Failures are logged and never retried; the entry stays evicted.
#[async_trait]
pub trait EvictionHandler<K, V>: Send + Sync {
    async fn on_evict(&self, key: &K, value: &V) -> anyhow::Result<()>;
}

struct Entry<V> {
    value: V,
    ttl: Duration,
    expires_at: Instant,
    epoch: u64,
    timer: JoinHandle<()>,
}

struct Inner<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, Entry<V>>>,
    next_epoch: AtomicU64,
    on_evict: Option<Arc<dyn EvictionHandler<K, V>>>,
}

/// TTL cache whose entries are reclaimed only by their timer or `remove`.
///
/// Cloning is cheap; clones share the same entries. Must be used from within
/// a tokio runtime since timers are spawned tasks.
pub struct ExpiringCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for ExpiringCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for ExpiringCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("name", &self.inner.name)
            .field("entries", &self.inner.entries.lock().unwrap().len())
            .finish()
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Create a cache without an eviction side effect.
    pub fn new(name: &'static str) -> Self {
        Self::build(name, None)
    }

    /// Create a cache that runs `handler` for every timer-driven eviction.
    pub fn with_handler(name: &'static str, handler: Arc<dyn EvictionHandler<K, V>>) -> Self {
        Self::build(name, Some(handler))
    }

    fn build(name: &'static str, on_evict: Option<Arc<dyn EvictionHandler<K, V>>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                entries: Mutex::new(HashMap::new()),
                next_epoch: AtomicU64::new(0),
                on_evict,
            }),
        }
    }

    /// Insert or replace `key`, arming a fresh timer of `ttl`.
    ///
    /// The timer is armed under the map lock so that even a zero `ttl`
    /// cannot fire before the entry is visible.
    pub fn put(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.inner.entries.lock().unwrap();
        let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
        let entry = Entry {
            value,
            ttl,
            expires_at: Instant::now() + ttl,
            epoch,
            timer: self.arm(key.clone(), epoch, ttl),
        };
        if let Some(previous) = entries.insert(key, entry) {
            previous.timer.abort();
        }
    }

    /// Restart the TTL of `key` without changing its value.
    ///
    /// Returns false when the key is absent (already evicted or never set).
    pub fn touch(&self, key: &K) -> bool {
        let mut entries = self.inner.entries.lock().unwrap();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };

        entry.timer.abort();
        let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
        entry.epoch = epoch;
        entry.expires_at = Instant::now() + entry.ttl;
        entry.timer = self.arm(key.clone(), epoch, entry.ttl);
        true
    }

    /// Drop `key` and its timer. The eviction side effect is not run.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.inner.entries.lock().unwrap().remove(key);
        removed.map(|entry| {
            entry.timer.abort();
            entry.value
        })
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.entries.lock().unwrap().contains_key(key)
    }

    /// When the current timer for `key` fires.
    pub fn expires_at(&self, key: &K) -> Option<Instant> {
        self.inner
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.expires_at)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn arm(&self, key: K, epoch: u64, ttl: Duration) -> JoinHandle<()> {
        let inner: Weak<Inner<K, V>> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(key, epoch).await;
            }
        })
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.value.clone())
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + fmt::Debug,
{
    async fn expire(&self, key: K, epoch: u64) {
        let value = {
            let mut entries = self.entries.lock().unwrap();
            match entries.get(&key) {
                Some(entry) if entry.epoch == epoch => entries.remove(&key).map(|e| e.value),
                _ => None,
            }
        };

        let Some(value) = value else {
            debug!(cache = self.name, ?key, "Stale eviction timer ignored");
            return;
        };

        CACHE_EVICTIONS.with_label_values(&[self.name]).inc();
        debug!(cache = self.name, ?key, "Entry expired");

        if let Some(handler) = &self.on_evict {
            if let Err(e) = handler.on_evict(&key, &value).await {
                CACHE_EVICTION_FAILURES.with_label_values(&[self.name]).inc();
                error!(cache = self.name, ?key, "Eviction side effect failed: {:#}", e);
            }
        }
    }
}

impl<K, V> Drop for Inner<K, V> {
    fn drop(&mut self) {
        if let Ok(entries) = self.entries.get_mut() {
            for entry in entries.values() {
                entry.timer.abort();
            }
        }
    }
}
