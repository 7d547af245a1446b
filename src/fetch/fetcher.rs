//! Cache-then-network fetcher
//!
//! Provides `CachedFetcher`, which answers from the TTL cache when it can and
//! otherwise spends a rate limit token on a live call through its `Transport`.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{FetchError, Transport};
use crate::cache::TtlCache;
use crate::limiter::RateLimiter;

/// Query parameters for an endpoint, kept sorted so cache keys are stable
pub type QueryParams = BTreeMap<String, String>;

/// Builds the cache key for a request: endpoint followed by the params as a JSON object
///
/// Keys are sorted, so the same parameters always produce the same key.
/// Empty parameters serialize as `{}`.
pub fn cache_key(endpoint: &str, params: &QueryParams) -> String {
    let object: Map<String, Value> = params
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    format!("{}{}", endpoint, Value::Object(object))
}

/// Behavior switches for a `CachedFetcher`
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Give up waiting for a rate limit token after this long
    pub acquire_timeout: Option<Duration>,
    /// Let concurrent misses for the same key share one network call
    pub dedupe_in_flight: bool,
}

/// Snapshot of fetcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests that missed the cache
    pub misses: u64,
    /// Calls handed to the transport
    pub network_calls: u64,
    /// Calls that failed (limiter timeout or transport error)
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    network_calls: AtomicU64,
    failures: AtomicU64,
}

/// Per-key gates used when in-flight de-duplication is enabled
type InFlight = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Fetches API responses through the TTL cache and the rate limiter
///
/// Owned by the composition root; build a fresh one per test.
pub struct CachedFetcher {
    transport: Arc<dyn Transport>,
    cache: TtlCache<Value>,
    limiter: RateLimiter,
    options: FetchOptions,
    in_flight: InFlight,
    counters: Counters,
}

impl CachedFetcher {
    /// Creates a fetcher from its collaborators
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: TtlCache<Value>,
        limiter: RateLimiter,
        options: FetchOptions,
    ) -> Self {
        Self {
            transport,
            cache,
            limiter,
            options,
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// The response cache
    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    /// The outbound rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Current counter values
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            network_calls: self.counters.network_calls.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Returns the response for `endpoint` + `params`, from cache if fresh
    ///
    /// # Arguments
    /// * `endpoint` - API path relative to the base URL, e.g. `coins/bitcoin`
    /// * `params` - Query parameters (part of the cache key)
    /// * `ttl` - How long a fresh response stays cached
    ///
    /// # Returns
    /// * `Ok(Value)` - Cached or freshly fetched JSON
    /// * `Err(FetchError)` - The call failed; nothing was cached and the
    ///   token spent on it is not refunded
    pub async fn fetch_with_cache(
        &self,
        endpoint: &str,
        params: &QueryParams,
        ttl: Duration,
    ) -> Result<Value, FetchError> {
        let key = cache_key(endpoint, params);

        if let Some(value) = self.cache_lookup(&key) {
            return Ok(value);
        }

        if !self.options.dedupe_in_flight {
            return self.fetch_and_store(&key, endpoint, params, ttl).await;
        }

        let gate = Arc::clone(self.in_flight.lock().entry(key.clone()).or_default());
        let guard = gate.lock().await;

        // The previous holder may have filled the cache while we waited.
        // Such a request is reported as a hit rather than a miss.
        let result = match self.cache.get(&key) {
            Some(value) => {
                self.counters.misses.fetch_sub(1, Ordering::Relaxed);
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("cache hit after waiting: {}", key);
                Ok(value)
            }
            None => self.fetch_and_store(&key, endpoint, params, ttl).await,
        };

        drop(guard);
        let mut in_flight = self.in_flight.lock();
        // One reference in the map, one here: nobody else is waiting
        if Arc::strong_count(&gate) == 2 {
            in_flight.remove(&key);
        }

        result
    }

    /// Typed variant of [`CachedFetcher::fetch_with_cache`]
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
        ttl: Duration,
    ) -> Result<T, FetchError> {
        let value = self.fetch_with_cache(endpoint, params, ttl).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn cache_lookup(&self, key: &str) -> Option<Value> {
        match self.cache.get(key) {
            Some(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("cache hit: {}", key);
                Some(value)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("cache miss: {}", key);
                None
            }
        }
    }

    async fn fetch_and_store(
        &self,
        key: &str,
        endpoint: &str,
        params: &QueryParams,
        ttl: Duration,
    ) -> Result<Value, FetchError> {
        if let Err(e) = self.acquire().await {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            log::warn!("{}: {}", endpoint, e);
            return Err(e);
        }

        self.counters.network_calls.fetch_add(1, Ordering::Relaxed);
        match self.transport.get_json(endpoint, params).await {
            Ok(value) => {
                self.cache.set(key, value.clone(), ttl);
                Ok(value)
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("fetch of {} failed: {}", endpoint, e);
                Err(e)
            }
        }
    }

    async fn acquire(&self) -> Result<(), FetchError> {
        match self.options.acquire_timeout {
            Some(timeout) => Ok(self.limiter.acquire_timeout(timeout).await?),
            None => {
                self.limiter.acquire().await;
                Ok(())
            }
        }
    }
}
