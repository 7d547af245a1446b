//! CoinGecko market-data client
//!
//! Typed wrappers over the endpoints the dashboard reads. Every call goes
//! through the `CachedFetcher`, so repeated views are served from memory and
//! live calls stay inside the rate budget.
//!
//! Endpoints used:
//! 1. `coins/markets` - paginated market listing sorted by market cap
//! 2. `coins/{id}` - coin detail
//! 3. `coins/{id}/market_chart` - historical price series
//! 4. `global` - aggregate market figures
//! 5. `search/trending` - trending coins
//! 6. `search` - free-text coin search

pub mod types;

pub use types::{
    CoinDetail, CoinImage, CoinMarket, CoinMarketData, GlobalData, MarketChart, SearchCoin,
    TrendingCoin,
};

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{TtlCache, DEFAULT_TTL, RESPONSE_TTL};
use crate::config::Config;
use crate::fetch::{CachedFetcher, FetchError, FetchOptions, HttpTransport, QueryParams, Transport};
use crate::limiter::RateLimiter;
use types::{GlobalEnvelope, SearchResponse, TrendingResponse};

/// Coins per `coins/markets` page
pub const MARKETS_PER_PAGE: u32 = 20;

/// Coins charted when none are named
pub const DEFAULT_CHART_COINS: [&str; 3] = ["bitcoin", "ethereum", "binancecoin"];

/// Default quote currency
pub const DEFAULT_CURRENCY: &str = "usd";

/// Default chart range in days
pub const DEFAULT_CHART_DAYS: u32 = 30;

/// Freshness windows per kind of endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlSettings {
    /// Short-lived endpoint caching (charts, global figures, search)
    pub endpoint: Duration,
    /// Long-lived full-response caching (listings, details, trending)
    pub response: Duration,
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TTL,
            response: RESPONSE_TTL,
        }
    }
}

/// Client for the CoinGecko endpoints the dashboard uses
pub struct MarketClient {
    fetcher: CachedFetcher,
    ttl: TtlSettings,
}

impl MarketClient {
    /// Creates a client around an existing fetcher
    pub fn new(fetcher: CachedFetcher, ttl: TtlSettings) -> Self {
        Self { fetcher, ttl }
    }

    /// Builds the HTTP-backed client described by `config`
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let transport = HttpTransport::new(
            config.api.base_url.clone(),
            config.api.api_key.clone(),
            config.api.timeout(),
        )?;
        Self::with_transport(Arc::new(transport), config)
    }

    /// Builds a client described by `config` on top of a custom transport
    pub fn with_transport(transport: Arc<dyn Transport>, config: &Config) -> Result<Self, FetchError> {
        let limiter = RateLimiter::new(
            config.rate_limit.capacity,
            config.rate_limit.refill_interval(),
        )?;

        let mut cache = TtlCache::new(config.cache.default_ttl());
        if let Some(max) = config.cache.max_entries {
            cache = cache.with_max_entries(max);
        }

        let options = FetchOptions {
            acquire_timeout: config.rate_limit.acquire_timeout(),
            dedupe_in_flight: config.cache.dedupe_in_flight,
        };

        let ttl = TtlSettings {
            endpoint: config.cache.default_ttl(),
            response: config.cache.response_ttl(),
        };

        Ok(Self::new(CachedFetcher::new(transport, cache, limiter, options), ttl))
    }

    /// The underlying cached fetcher
    pub fn fetcher(&self) -> &CachedFetcher {
        &self.fetcher
    }

    /// Fetch one page of coins ordered by market cap
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    pub async fn coin_markets(&self, page: u32) -> Result<Vec<CoinMarket>, FetchError> {
        if page == 0 {
            return Err(FetchError::InvalidRequest("page numbers start at 1".to_string()));
        }

        let params = query(&[
            ("vs_currency", DEFAULT_CURRENCY.to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", MARKETS_PER_PAGE.to_string()),
            ("page", page.to_string()),
            ("sparkline", "false".to_string()),
        ]);

        self.fetcher
            .fetch("coins/markets", &params, self.ttl.response)
            .await
    }

    /// Fetch detail for a single coin
    pub async fn coin_detail(&self, id: &str) -> Result<CoinDetail, FetchError> {
        let id = coin_id(id)?;
        self.fetcher
            .fetch(&format!("coins/{}", id), &QueryParams::new(), self.ttl.response)
            .await
    }

    /// Fetch the historical price series of a coin
    ///
    /// # Arguments
    /// * `id` - CoinGecko coin id, e.g. `bitcoin`
    /// * `vs_currency` - Quote currency, e.g. `usd`
    /// * `days` - Range in days
    pub async fn market_chart(
        &self,
        id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<MarketChart, FetchError> {
        let id = coin_id(id)?;
        let params = query(&[
            ("vs_currency", vs_currency.to_lowercase()),
            ("days", days.to_string()),
        ]);

        self.fetcher
            .fetch(&format!("coins/{}/market_chart", id), &params, self.ttl.endpoint)
            .await
    }

    /// Fetch several price series concurrently, failing if any fails
    pub async fn market_charts(
        &self,
        ids: &[String],
        vs_currency: &str,
        days: u32,
    ) -> Result<Vec<(String, MarketChart)>, FetchError> {
        let requests = ids.iter().map(|id| async move {
            let chart = self.market_chart(id, vs_currency, days).await?;
            Ok::<_, FetchError>((id.clone(), chart))
        });

        try_join_all(requests).await
    }

    /// Fetch aggregate market figures
    pub async fn global(&self) -> Result<GlobalData, FetchError> {
        let envelope: GlobalEnvelope = self
            .fetcher
            .fetch("global", &QueryParams::new(), self.ttl.endpoint)
            .await?;
        Ok(envelope.data)
    }

    /// Fetch currently trending coins
    pub async fn trending(&self) -> Result<Vec<TrendingCoin>, FetchError> {
        let response: TrendingResponse = self
            .fetcher
            .fetch("search/trending", &QueryParams::new(), self.ttl.response)
            .await?;
        Ok(response.coins.into_iter().map(|entry| entry.item).collect())
    }

    /// Search coins by name or symbol
    pub async fn search(&self, text: &str) -> Result<Vec<SearchCoin>, FetchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FetchError::InvalidRequest("search query is empty".to_string()));
        }

        let response: SearchResponse = self
            .fetcher
            .fetch("search", &query(&[("query", text.to_string())]), self.ttl.endpoint)
            .await?;
        Ok(response.coins)
    }
}

/// Builds query parameters from name/value pairs
fn query(pairs: &[(&str, String)]) -> QueryParams {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Validates a coin id before it is placed in a URL path
fn coin_id(id: &str) -> Result<String, FetchError> {
    let id = id.trim().to_lowercase();
    if id.is_empty() || id.contains('/') || id.contains('?') {
        return Err(FetchError::InvalidRequest(format!("invalid coin id: '{}'", id)));
    }
    Ok(id)
}
