//! Token-bucket rate limiter for outbound API calls
//!
//! The bucket holds up to `capacity` tokens and is refilled in whole steps:
//! every full `refill_interval` that has elapsed restores `capacity` tokens.
//! Refill is computed lazily when a caller asks for a token; there is no
//! background timer.
//!
//! The refill point only advances by whole intervals. Resetting it to `now`
//! on every call would discard partial progress, and a caller retrying more
//! often than once per interval would never see a refill.

use parking_lot::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Errors produced by the rate limiter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// No token became available within the allowed wait
    #[error("Timed out after {0:?} waiting for a rate limit token")]
    Timeout(Duration),

    /// The limiter was configured with a zero capacity or interval
    #[error("Invalid rate limiter configuration: {0}")]
    InvalidConfig(String),
}

/// Mutable bucket state, always read and written under one lock
#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

impl Bucket {
    /// Applies any whole-interval refills that are due at `now`
    ///
    /// `last_refill` only moves forward by whole intervals so that partial
    /// progress towards the next refill is never lost.
    ///
    /// Returns the time elapsed since the (updated) last refill.
    fn refill(&mut self, now: Instant, capacity: u32, interval: Duration) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let interval_nanos = interval.as_nanos();
        let intervals = elapsed.as_nanos() / interval_nanos;

        if intervals > 0 {
            let refill = intervals.saturating_mul(u128::from(capacity));
            let tokens = u128::from(self.tokens).saturating_add(refill);
            self.tokens = tokens.min(u128::from(capacity)) as u32;

            let remainder = Duration::from_nanos((elapsed.as_nanos() % interval_nanos) as u64);
            self.last_refill = now - remainder;
            remainder
        } else {
            elapsed
        }
    }

    /// Takes a token, or returns how long to wait before the next refill
    fn try_take(&mut self, now: Instant, capacity: u32, interval: Duration) -> Result<(), Duration> {
        let since_refill = self.refill(now, capacity, interval);

        if self.tokens > 0 {
            self.tokens -= 1;
            Ok(())
        } else {
            Err(interval - since_refill)
        }
    }
}

/// Token-bucket gate in front of the market-data API
///
/// Safe to share between tasks: each attempt performs its read-modify-write
/// of the bucket under a mutex and never holds it while sleeping.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    refill_interval: Duration,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Creates a full bucket of `capacity` tokens refilled every `refill_interval`
    ///
    /// # Returns
    /// * `Ok(RateLimiter)` for a positive capacity and interval
    /// * `Err(RateLimitError::InvalidConfig)` otherwise
    pub fn new(capacity: u32, refill_interval: Duration) -> Result<Self, RateLimitError> {
        if capacity == 0 {
            return Err(RateLimitError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if refill_interval.is_zero() {
            return Err(RateLimitError::InvalidConfig(
                "refill interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            refill_interval,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Maximum number of tokens (burst size)
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Window over which `capacity` tokens are replenished
    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Tokens currently available, after applying any due refill
    pub fn available(&self) -> u32 {
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now(), self.capacity, self.refill_interval);
        bucket.tokens
    }

    /// Takes a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.bucket
            .lock()
            .try_take(Instant::now(), self.capacity, self.refill_interval)
            .is_ok()
    }

    /// Waits until a token is available and consumes it
    ///
    /// Never fails. The wait has no upper bound; drop the future to give up,
    /// or use [`RateLimiter::acquire_timeout`].
    pub async fn acquire(&self) {
        loop {
            let attempt = self
                .bucket
                .lock()
                .try_take(Instant::now(), self.capacity, self.refill_interval);

            match attempt {
                Ok(()) => return,
                Err(wait) => {
                    log::debug!("rate limit reached, waiting {:?} for refill", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Like [`RateLimiter::acquire`], but gives up after `timeout`
    ///
    /// A timed-out call consumes no token.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), RateLimitError> {
        tokio::time::timeout(timeout, self.acquire())
            .await
            .map_err(|_| RateLimitError::Timeout(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::advance;

    const MINUTE: Duration = Duration::from_millis(60_000);

    #[test]
    fn test_new_rejects_zero_capacity() {
        let result = RateLimiter::new(0, MINUTE);
        assert!(matches!(result, Err(RateLimitError::InvalidConfig(_))));
    }

    #[test]
    fn test_new_rejects_zero_interval() {
        let result = RateLimiter::new(30, Duration::ZERO);
        assert!(matches!(result, Err(RateLimitError::InvalidConfig(_))));
    }

    #[test]
    fn test_new_starts_full() {
        let limiter = RateLimiter::new(30, MINUTE).unwrap();
        assert_eq!(limiter.available(), 30);
        assert_eq!(limiter.capacity(), 30);
        assert_eq!(limiter.refill_interval(), MINUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_capacity_does_not_suspend() {
        let limiter = RateLimiter::new(5, MINUTE).unwrap();
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_thirty_first_call_waits_for_full_interval() {
        let limiter = RateLimiter::new(30, MINUTE).unwrap();
        let start = Instant::now();

        for _ in 0..30 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.available(), 0);

        limiter.acquire().await;

        assert!(start.elapsed() >= MINUTE);
        assert!(start.elapsed() < MINUTE + Duration::from_millis(5));
        // Refilled to 30 at t=60000, then one consumed
        assert_eq!(limiter.available(), 29);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_call_stays_pending_until_refill() {
        let limiter = Arc::new(RateLimiter::new(2, MINUTE).unwrap());
        limiter.acquire().await;
        limiter.acquire().await;

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire().await })
        };

        // Let the waiter register its sleep without auto-advancing the clock
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        advance(MINUTE).await;
        waiter.await.unwrap();
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_interval_restores_full_bucket() {
        let limiter = RateLimiter::new(3, MINUTE).unwrap();
        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());

        advance(MINUTE).await;

        assert!(limiter.try_acquire());
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_interval_does_not_refill() {
        let limiter = RateLimiter::new(2, MINUTE).unwrap();
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());

        advance(Duration::from_millis(59_999)).await;

        assert!(!limiter.try_acquire());
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frequent_polling_still_reaches_refill() {
        let limiter = RateLimiter::new(1, MINUTE).unwrap();
        assert!(limiter.try_acquire());

        // Polling more often than the interval must not push the refill out
        for _ in 0..5 {
            advance(Duration::from_secs(10)).await;
            assert!(!limiter.try_acquire());
        }
        advance(Duration::from_secs(10)).await;

        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_idle_refill_is_capped_at_capacity() {
        let limiter = RateLimiter::new(4, MINUTE).unwrap();
        assert!(limiter.try_acquire());

        advance(MINUTE * 10).await;

        assert_eq!(limiter.available(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_targets_next_interval_boundary() {
        let limiter = RateLimiter::new(1, MINUTE).unwrap();
        let start = Instant::now();
        limiter.acquire().await;

        advance(Duration::from_secs(45)).await;
        limiter.acquire().await;

        // Boundary is at t=60s, not 60s after the second call
        assert!(start.elapsed() >= MINUTE);
        assert!(start.elapsed() < MINUTE + Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_timeout_expires_without_consuming() {
        let limiter = RateLimiter::new(1, MINUTE).unwrap();
        limiter.acquire().await;

        let result = limiter.acquire_timeout(Duration::from_secs(5)).await;
        assert_eq!(result, Err(RateLimitError::Timeout(Duration::from_secs(5))));

        advance(MINUTE).await;
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_timeout_succeeds_when_refill_arrives_in_time() {
        let limiter = RateLimiter::new(1, Duration::from_secs(2)).unwrap();
        limiter.acquire().await;

        let result = limiter.acquire_timeout(Duration::from_secs(5)).await;

        assert!(result.is_ok());
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_overdraw() {
        let limiter = Arc::new(RateLimiter::new(3, MINUTE).unwrap());
        let start = Instant::now();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut immediate = 0;
        for handle in handles {
            let finished_at = handle.await.unwrap();
            if finished_at == start {
                immediate += 1;
            }
        }

        assert_eq!(immediate, 3, "Only capacity callers may pass before the refill");
        assert_eq!(limiter.available(), 0);
    }
}
