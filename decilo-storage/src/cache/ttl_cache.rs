//! Process-wide TTL cache with lazy expiry.
//!
//! Values are stored behind `Arc` and replaced whole, never mutated in place,
//! so a reader holds either the old value or the new one. Expired entries are
//! dropped when a lookup finds them; nothing sweeps in the background.
//!
//! Concurrent misses on the same key may both compute the value. The last
//! insert wins. Computation never happens while a map shard is locked.

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::clock::Clock;
use super::freshness::{expiry_for, is_live, CacheRead};
use super::traits::{CacheStats, StatCounters};

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            cached_at: self.cached_at,
            expires_at: self.expires_at,
        }
    }
}

/// A keyed cache whose entries expire a fixed time after insertion.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: StatCounters,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
            counters: StatCounters::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry. An expired entry is removed and counts as a miss.
    pub fn get(&self, key: &K) -> Option<CacheRead<Arc<V>>> {
        let now = self.clock.now();
        let entry = self.entries.get(key).map(|entry| entry.value().clone());

        match entry {
            Some(entry) if is_live(entry.expires_at, now) => {
                self.counters.hit();
                Some(CacheRead::from_cache(
                    entry.value,
                    entry.cached_at,
                    entry.expires_at,
                ))
            }
            Some(_) => {
                // Only drop it if nobody replaced it with a live one meanwhile.
                if self
                    .entries
                    .remove_if(key, |_, current| !is_live(current.expires_at, now))
                    .is_some()
                {
                    self.counters.expiration();
                }
                self.counters.miss();
                None
            }
            None => {
                self.counters.miss();
                None
            }
        }
    }

    /// Store a value, replacing any previous entry for the key.
    pub fn insert(&self, key: K, value: V) -> CacheRead<Arc<V>> {
        self.insert_arc(key, Arc::new(value))
    }

    pub fn insert_arc(&self, key: K, value: Arc<V>) -> CacheRead<Arc<V>> {
        let cached_at = self.clock.now();
        let expires_at = expiry_for(cached_at, self.ttl);
        self.entries.insert(
            key,
            CacheEntry {
                value: Arc::clone(&value),
                cached_at,
                expires_at,
            },
        );
        self.counters.insertion();
        CacheRead::from_source(value, cached_at, expires_at)
    }

    /// Return the live entry, or compute, store and return a new one.
    ///
    /// Errors from `build` are returned and nothing is cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: K,
        build: F,
    ) -> Result<CacheRead<Arc<V>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = build().await?;
        Ok(self.insert(key, value))
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries held, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len())
    }
}
