//! Response models for the CoinGecko endpoints the dashboard uses
//!
//! Fields the API may omit or null out are `Option`s; unknown fields are ignored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of `coins/markets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Image URLs attached to a coin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinImage {
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

/// Market figures inside `coins/{id}`, keyed by currency code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinMarketData {
    #[serde(default)]
    pub current_price: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub total_volume: HashMap<String, f64>,
    #[serde(default)]
    pub high_24h: HashMap<String, f64>,
    #[serde(default)]
    pub low_24h: HashMap<String, f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
}

/// `coins/{id}` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub image: CoinImage,
    #[serde(default)]
    pub description: HashMap<String, String>,
    #[serde(default)]
    pub market_data: Option<CoinMarketData>,
}

impl CoinDetail {
    /// Price in the given currency, if the API reported one
    pub fn price_in(&self, currency: &str) -> Option<f64> {
        self.market_data
            .as_ref()
            .and_then(|data| data.current_price.get(currency).copied())
    }
}

/// `coins/{id}/market_chart` payload: `[timestamp_ms, value]` pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<[f64; 2]>,
    #[serde(default)]
    pub market_caps: Vec<[f64; 2]>,
    #[serde(default)]
    pub total_volumes: Vec<[f64; 2]>,
}

impl MarketChart {
    /// Lowest and highest price in the series
    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.prices.iter().map(|[_, price]| *price).fold(None, |range, price| {
            Some(match range {
                None => (price, price),
                Some((low, high)) => (low.min(price), high.max(price)),
            })
        })
    }

    /// Percentage change from the first to the last price
    pub fn change_percentage(&self) -> Option<f64> {
        let first = self.prices.first()?[1];
        let last = self.prices.last()?[1];
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }
}

/// Aggregate figures from `global`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalData {
    #[serde(default)]
    pub active_cryptocurrencies: Option<u64>,
    #[serde(default)]
    pub markets: Option<u64>,
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub total_volume: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap_change_percentage_24h_usd: Option<f64>,
}

/// `global` wraps its figures in a `data` envelope
#[derive(Debug, Deserialize)]
pub(crate) struct GlobalEnvelope {
    pub data: GlobalData,
}

/// A coin from `search/trending`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub price_btc: Option<f64>,
    #[serde(default)]
    pub score: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrendingItem {
    pub item: TrendingCoin,
}

/// `search/trending` lists coins as `{ "item": { ... } }`
#[derive(Debug, Deserialize)]
pub(crate) struct TrendingResponse {
    #[serde(default)]
    pub coins: Vec<TrendingItem>,
}

/// A coin hit from free-text `search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub coins: Vec<SearchCoin>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coin_market_tolerates_nulls() {
        let coin: CoinMarket = serde_json::from_value(json!({
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 64000.5,
            "market_cap": null,
            "market_cap_rank": 1,
            "extra_field": "ignored"
        }))
        .unwrap();

        assert_eq!(coin.id, "bitcoin");
        assert_eq!(coin.market_cap_rank, Some(1));
        assert!(coin.market_cap.is_none());
        assert!(coin.image.is_none());
    }

    #[test]
    fn test_coin_detail_price_lookup() {
        let detail: CoinDetail = serde_json::from_value(json!({
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "image": { "thumb": "t.png" },
            "market_data": { "current_price": { "usd": 3100.0, "eur": 2900.0 } }
        }))
        .unwrap();

        assert_eq!(detail.price_in("usd"), Some(3100.0));
        assert_eq!(detail.price_in("jpy"), None);
        assert_eq!(detail.image.thumb.as_deref(), Some("t.png"));
    }

    #[test]
    fn test_market_chart_summary() {
        let chart: MarketChart = serde_json::from_value(json!({
            "prices": [[1.0, 100.0], [2.0, 80.0], [3.0, 150.0]]
        }))
        .unwrap();

        assert_eq!(chart.price_range(), Some((80.0, 150.0)));
        assert!((chart.change_percentage().unwrap() - 50.0).abs() < 1e-9);
        assert!(chart.market_caps.is_empty());
    }

    #[test]
    fn test_empty_market_chart_has_no_summary() {
        let chart = MarketChart::default();

        assert!(chart.price_range().is_none());
        assert!(chart.change_percentage().is_none());
    }

    #[test]
    fn test_trending_response_unwraps_items() {
        let response: TrendingResponse = serde_json::from_value(json!({
            "coins": [
                { "item": { "id": "pepe", "name": "Pepe", "symbol": "PEPE", "score": 0 } },
                { "item": { "id": "sui", "name": "Sui", "symbol": "SUI", "market_cap_rank": 20 } }
            ]
        }))
        .unwrap();

        assert_eq!(response.coins.len(), 2);
        assert_eq!(response.coins[1].item.market_cap_rank, Some(20));
    }
}
