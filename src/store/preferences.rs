//! Theme flag, watchlist and recent lists on top of `LocalStore`

use serde::{Deserialize, Serialize};
use std::io;

use super::LocalStore;
use crate::api::{CoinDetail, SearchCoin};

/// Key for the dark-mode flag
pub const THEME_KEY: &str = "isDarkMode";

/// Key for the recently viewed coins
pub const RECENTLY_VIEWED_KEY: &str = "recentlyViewed";

/// Key for the recent searches
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

/// Key for the watchlist
pub const WATCHLIST_KEY: &str = "watchlist";

/// Maximum length of the recently viewed and recent search lists
pub const RECENT_LIMIT: usize = 5;

/// The part of a coin worth remembering between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSummary {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

impl From<&CoinDetail> for CoinSummary {
    fn from(detail: &CoinDetail) -> Self {
        Self {
            id: detail.id.clone(),
            name: detail.name.clone(),
            symbol: detail.symbol.clone(),
            thumb: detail.image.thumb.clone(),
            market_cap_rank: detail.market_cap_rank,
        }
    }
}

impl From<&SearchCoin> for CoinSummary {
    fn from(coin: &SearchCoin) -> Self {
        Self {
            id: coin.id.clone(),
            name: coin.name.clone(),
            symbol: coin.symbol.clone(),
            thumb: coin.thumb.clone(),
            market_cap_rank: coin.market_cap_rank,
        }
    }
}

/// User preferences and lists persisted in a `LocalStore`
#[derive(Debug, Clone)]
pub struct Preferences {
    store: LocalStore,
}

impl Preferences {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Whether dark mode is on (the default when never set)
    pub fn is_dark_mode(&self) -> bool {
        self.store.read(THEME_KEY).unwrap_or(true)
    }

    /// Flips the theme and returns the new dark-mode flag
    pub fn toggle_theme(&self) -> io::Result<bool> {
        let dark = !self.is_dark_mode();
        self.store.write(THEME_KEY, &dark)?;
        Ok(dark)
    }

    /// Recently viewed coins, most recent first
    pub fn recently_viewed(&self) -> Vec<CoinSummary> {
        self.list(RECENTLY_VIEWED_KEY)
    }

    /// Moves `coin` to the front of the recently viewed list
    pub fn add_recently_viewed(&self, coin: CoinSummary) -> io::Result<Vec<CoinSummary>> {
        self.push_recent(RECENTLY_VIEWED_KEY, coin)
    }

    /// Drops one coin from the recently viewed list
    pub fn remove_recently_viewed(&self, id: &str) -> io::Result<Vec<CoinSummary>> {
        let mut coins = self.recently_viewed();
        coins.retain(|coin| coin.id != id);
        self.store.write(RECENTLY_VIEWED_KEY, &coins)?;
        Ok(coins)
    }

    pub fn clear_recently_viewed(&self) -> io::Result<()> {
        self.store.write(RECENTLY_VIEWED_KEY, &Vec::<CoinSummary>::new())
    }

    /// Coins picked from search results, most recent first
    pub fn recent_searches(&self) -> Vec<CoinSummary> {
        self.list(RECENT_SEARCHES_KEY)
    }

    pub fn add_recent_search(&self, coin: CoinSummary) -> io::Result<Vec<CoinSummary>> {
        self.push_recent(RECENT_SEARCHES_KEY, coin)
    }

    pub fn clear_recent_searches(&self) -> io::Result<()> {
        self.store.remove(RECENT_SEARCHES_KEY)
    }

    /// Watched coins in the order they were added
    pub fn watchlist(&self) -> Vec<CoinSummary> {
        self.list(WATCHLIST_KEY)
    }

    /// Appends `coin` unless a coin with the same id is already watched
    ///
    /// Returns `true` if the coin was added.
    pub fn add_to_watchlist(&self, coin: CoinSummary) -> io::Result<bool> {
        let mut coins = self.watchlist();
        if coins.iter().any(|c| c.id == coin.id) {
            return Ok(false);
        }
        coins.push(coin);
        self.store.write(WATCHLIST_KEY, &coins)?;
        Ok(true)
    }

    /// Removes a coin from the watchlist, returning `true` if it was there
    pub fn remove_from_watchlist(&self, id: &str) -> io::Result<bool> {
        let mut coins = self.watchlist();
        let before = coins.len();
        coins.retain(|coin| coin.id != id);
        if coins.len() == before {
            return Ok(false);
        }
        self.store.write(WATCHLIST_KEY, &coins)?;
        Ok(true)
    }

    pub fn clear_watchlist(&self) -> io::Result<()> {
        self.store.write(WATCHLIST_KEY, &Vec::<CoinSummary>::new())
    }

    fn list(&self, key: &str) -> Vec<CoinSummary> {
        self.store.read(key).unwrap_or_default()
    }

    /// Most-recent-first insert, de-duplicated by id and bounded to `RECENT_LIMIT`
    fn push_recent(&self, key: &str, coin: CoinSummary) -> io::Result<Vec<CoinSummary>> {
        let mut coins = self.list(key);
        coins.retain(|c| c.id != coin.id);
        coins.insert(0, coin);
        coins.truncate(RECENT_LIMIT);
        self.store.write(key, &coins)?;
        Ok(coins)
    }
}
