//! In-memory response cache with per-entry expiry.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::{sync::RwLock, time::Instant};

/// Key for the admin user listing. Not caller-specific.
pub const ADMIN_USERS_KEY: &str = "admin_all_users";

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Every `invalidate` bumps the generation. A value computed before the bump
/// is refused by `set`, so a slow reader cannot re-cache stale data.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    generation: AtomicU64,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            ttl,
        }
    }

    /// Read before loading the value that will be passed to `set`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns the value if present and not yet expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| Instant::now() < e.expires_at)
            .map(|e| e.value.clone())
    }

    /// Stores `value` unless the cache was invalidated since `seen` was read.
    /// Returns whether the value was stored.
    pub async fn set(&self, key: impl Into<String>, value: V, seen: u64) -> bool {
        let expires_at = Instant::now() + self.ttl;
        let mut entries = self.entries.write().await;
        if self.generation() != seen {
            return false;
        }
        entries.retain(|_, e| e.expires_at > Instant::now());
        entries.insert(key.into(), CacheEntry { value, expires_at });
        true
    }

    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.remove(key);
    }
}
