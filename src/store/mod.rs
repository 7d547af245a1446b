//! Persisted user state: theme, watchlist and recent lists
//!
//! This module owns the small key/value state the dashboard keeps between
//! runs. It is separate from the in-memory response cache: values here are
//! JSON files on disk, one per key, and never expire.

mod local;
mod preferences;

pub use local::LocalStore;
pub use preferences::{
    CoinSummary, Preferences, RECENTLY_VIEWED_KEY, RECENT_LIMIT, RECENT_SEARCHES_KEY, THEME_KEY,
    WATCHLIST_KEY,
};
