//! TTL cache keyed by request key
//!
//! Provides a `TtlCache` that maps string keys to values with an absolute
//! expiry instant. Time is read from `tokio::time::Instant` so tests can drive
//! expiry with a paused clock.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for generic endpoint caching
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Time-to-live for long-lived full-response caching
pub const RESPONSE_TTL: Duration = Duration::from_secs(20 * 60);

/// Lifetime given to entries whose TTL does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A cached value and the instant it stops being valid
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe in-memory cache with per-entry expiry
///
/// Lookups never return an expired entry. Memory is unbounded unless a
/// maximum entry count is configured with [`TtlCache::with_max_entries`].
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    /// TTL used by [`TtlCache::insert`]
    default_ttl: Duration,
    /// Optional upper bound on stored entries
    max_entries: Option<usize>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty, unbounded cache with the given default TTL
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            max_entries: None,
        }
    }

    /// Bounds the cache to `max_entries` keys
    ///
    /// When a new key is stored at capacity, expired entries are purged first
    /// and then the entry closest to expiry is evicted.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    /// The TTL applied by [`TtlCache::insert`]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the value stored under `key` if it has not expired
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.is_valid(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                log::debug!("cache entry expired: {}", key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key`, valid for `ttl` from now
    ///
    /// Any previous entry for the key is overwritten. A TTL too large to
    /// represent (e.g. `Duration::MAX`) is capped at roughly 30 years.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(ttl).unwrap_or(now + FAR_FUTURE),
        };

        let mut entries = self.entries.lock();
        if let Some(max) = self.max_entries {
            if entries.len() >= max && !entries.contains_key(&key) {
                Self::make_room(&mut entries, now);
            }
        }
        entries.insert(key, entry);
    }

    /// Stores `value` under `key` with the default TTL
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Removes every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now));
        before - entries.len()
    }

    /// Removes every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet looked up
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn make_room(entries: &mut HashMap<String, CacheEntry<V>>, now: Instant) {
        entries.retain(|_, entry| entry.is_valid(now));
        if entries.is_empty() {
            return;
        }

        let soonest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = soonest {
            log::debug!("cache full, evicting {}", key);
            entries.remove(&key);
        }
    }
}
