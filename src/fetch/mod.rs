//! Cached, rate-limited access to the market-data API
//!
//! `CachedFetcher` composes the TTL cache and the token-bucket limiter in
//! front of a `Transport`. Cache hits bypass the limiter entirely; only live
//! network calls spend tokens.

mod fetcher;
mod transport;

pub use fetcher::{cache_key, CachedFetcher, FetchOptions, FetchStats, QueryParams};
pub use transport::{HttpTransport, Transport, API_KEY_PARAM, COINGECKO_BASE_URL};

use thiserror::Error;

use crate::limiter::RateLimitError;

/// Errors that can occur when fetching from the market-data API
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (connection, timeout, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status code
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The request was rejected before reaching the network
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No rate limit token could be obtained
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}
