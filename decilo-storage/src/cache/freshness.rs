//! Expiry metadata for cache reads.
//!
//! Every cache read returns a [`CacheRead<T>`] that says when the value was
//! cached, when it stops being served, and whether it came from the cache or
//! was just built.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Compute the instant an entry cached at `cached_at` stops being served.
pub fn expiry_for(cached_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| cached_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// An entry is live strictly before its expiry instant.
pub fn is_live(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < expires_at
}

/// Result of a cache read, carrying expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A value served from an existing entry.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            expires_at,
            was_cache_hit: true,
        }
    }

    /// A value that was just computed and stored.
    pub fn from_source(value: T, cached_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            expires_at,
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// How long ago the value was cached, relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            expires_at: self.expires_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
