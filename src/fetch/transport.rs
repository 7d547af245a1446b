//! Network seam between the cached fetcher and the CoinGecko REST API

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{FetchError, QueryParams};

/// Base URL for the CoinGecko v3 API
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Query parameter carrying the demo-tier API key
pub const API_KEY_PARAM: &str = "x_cg_demo_api_key";

/// Performs a single GET against the market-data API
///
/// Implementations must not cache or retry; the fetcher owns both concerns.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `endpoint` with the given query parameters and return the JSON body
    async fn get_json(&self, endpoint: &str, params: &QueryParams) -> Result<Value, FetchError>;
}

/// `Transport` backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Creates a transport with the given request timeout
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. [`COINGECKO_BASE_URL`]
    /// * `api_key` - Appended to every request as [`API_KEY_PARAM`] when present
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Creates a transport with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Full URL for an endpoint path
    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, endpoint: &str, params: &QueryParams) -> Result<Value, FetchError> {
        let url = self.url(endpoint);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(params);
        if let Some(ref key) = self.api_key {
            request = request.query(&[(API_KEY_PARAM, key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_endpoint() {
        let transport = HttpTransport::with_client(Client::new(), COINGECKO_BASE_URL, None);

        assert_eq!(
            transport.url("coins/bitcoin"),
            "https://api.coingecko.com/api/v3/coins/bitcoin"
        );
    }

    #[test]
    fn test_url_tolerates_extra_slashes() {
        let transport = HttpTransport::with_client(Client::new(), "http://localhost:8080/", None);

        assert_eq!(transport.url("/global"), "http://localhost:8080/global");
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let transport =
            HttpTransport::with_client(Client::new(), COINGECKO_BASE_URL, Some("  ".to_string()));

        assert!(transport.api_key.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let transport =
            HttpTransport::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();

        let result = transport.get_json("global", &QueryParams::new()).await;

        assert!(matches!(result, Err(FetchError::Request(_))));
    }
}
