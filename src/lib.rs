//! coindash library
//!
//! A CoinGecko market-data client built around a TTL response cache and a
//! token-bucket rate limiter, plus the persisted watchlist and recent lists
//! used by the `coindash` CLI.

pub mod api;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod limiter;
pub mod store;
