//! Application state and command execution
//!
//! `App` is the composition root: it owns the market client (and with it the
//! response cache and rate limiter) and the persisted preferences, runs one
//! command and renders the result as text or JSON.

use serde::Serialize;
use std::io::{self, Write};
use thiserror::Error;

use crate::api::{CoinDetail, CoinMarket, GlobalData, MarketChart, MarketClient, SearchCoin, TrendingCoin};
use crate::cli::{pick_index, ChartArgs, CliError, Command, WatchlistAction};
use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::store::{CoinSummary, Preferences};

/// Top-level error for a command run
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cli(#[from] CliError),

    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// The command needs local storage but no data directory is available
    #[error("No data directory available for the watchlist and recent lists")]
    NoStore,
}

/// Everything a command needs
pub struct App {
    client: MarketClient,
    preferences: Option<Preferences>,
    json: bool,
}

impl App {
    /// Creates an app
    ///
    /// # Arguments
    /// * `client` - Market-data client
    /// * `preferences` - Persisted lists; `None` disables the commands that need them
    /// * `json` - Render raw JSON instead of text
    pub fn new(client: MarketClient, preferences: Option<Preferences>, json: bool) -> Self {
        Self {
            client,
            preferences,
            json,
        }
    }

    pub fn client(&self) -> &MarketClient {
        &self.client
    }

    fn preferences(&self) -> Result<&Preferences, AppError> {
        self.preferences.as_ref().ok_or(AppError::NoStore)
    }

    /// Runs one command, writing its output to `out`
    pub async fn run<W: Write>(&self, command: &Command, out: &mut W) -> Result<(), AppError> {
        match command {
            Command::Markets { page } => {
                let coins = self.client.coin_markets(*page).await?;
                self.emit(out, &coins, |out| render_markets(out, *page, &coins))
            }
            Command::Coin { id } => {
                let detail = self.client.coin_detail(id).await?;
                if let Some(prefs) = &self.preferences {
                    prefs.add_recently_viewed(CoinSummary::from(&detail))?;
                }
                self.emit(out, &detail, |out| render_detail(out, &detail))
            }
            Command::Chart(args) => self.chart(args, out).await,
            Command::Global => {
                let global = self.client.global().await?;
                self.emit(out, &global, |out| render_global(out, &global))
            }
            Command::Trending { limit } => {
                let mut coins = self.client.trending().await?;
                if let Some(limit) = limit {
                    coins.truncate(*limit);
                }
                self.emit(out, &coins, |out| render_trending(out, &coins))
            }
            Command::Search { query, limit, pick } => {
                let mut hits = self.client.search(query).await?;
                hits.truncate(*limit);
                if let Some(pick) = pick {
                    let index = pick_index(*pick, hits.len())?;
                    self.preferences()?
                        .add_recent_search(CoinSummary::from(&hits[index]))?;
                }
                self.emit(out, &hits, |out| render_search(out, &hits))
            }
            Command::Watchlist { action } => self.watchlist(action.as_ref(), out).await,
            Command::Recent { clear, remove } => {
                let prefs = self.preferences()?;
                if *clear {
                    prefs.clear_recently_viewed()?;
                }
                if let Some(id) = remove {
                    prefs.remove_recently_viewed(&id.trim().to_lowercase())?;
                }
                let coins = prefs.recently_viewed();
                self.emit(out, &coins, |out| render_summaries(out, "Recently viewed", &coins))
            }
            Command::Searches { clear } => {
                let prefs = self.preferences()?;
                if *clear {
                    prefs.clear_recent_searches()?;
                }
                let coins = prefs.recent_searches();
                self.emit(out, &coins, |out| render_summaries(out, "Recent searches", &coins))
            }
            Command::Theme { toggle } => {
                let prefs = self.preferences()?;
                let dark = if *toggle {
                    prefs.toggle_theme()?
                } else {
                    prefs.is_dark_mode()
                };
                let theme = if dark { "dark" } else { "light" };
                self.emit(out, &serde_json::json!({ "theme": theme }), |out| {
                    writeln!(out, "Theme: {}", theme)
                })
            }
        }
    }

    async fn chart<W: Write>(&self, args: &ChartArgs, out: &mut W) -> Result<(), AppError> {
        let ids = args.coin_ids();
        let charts = self.client.market_charts(&ids, &args.currency, args.days).await?;
        self.emit(out, &charts, |out| {
            render_charts(out, &args.currency, args.days, &charts)
        })
    }

    async fn watchlist<W: Write>(
        &self,
        action: Option<&WatchlistAction>,
        out: &mut W,
    ) -> Result<(), AppError> {
        let prefs = self.preferences()?;

        match action {
            None | Some(WatchlistAction::List) => {}
            Some(WatchlistAction::Add { id }) => {
                let detail = self.client.coin_detail(id).await?;
                if !prefs.add_to_watchlist(CoinSummary::from(&detail))? && !self.json {
                    writeln!(out, "{} is already on the watchlist", detail.id)?;
                }
            }
            Some(WatchlistAction::Remove { id }) => {
                if !prefs.remove_from_watchlist(id)? && !self.json {
                    writeln!(out, "{} is not on the watchlist", id)?;
                }
            }
            Some(WatchlistAction::Clear) => prefs.clear_watchlist()?,
        }

        let coins = prefs.watchlist();
        self.emit(out, &coins, |out| render_summaries(out, "Watchlist", &coins))
    }

    /// Writes `value` as JSON in JSON mode, otherwise runs the text renderer
    fn emit<W, T, F>(&self, out: &mut W, value: &T, render: F) -> Result<(), AppError>
    where
        W: Write,
        T: Serialize + ?Sized,
        F: FnOnce(&mut W) -> io::Result<()>,
    {
        if self.json {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        } else {
            render(out)?;
        }
        Ok(())
    }
}

/// Formats large USD amounts compactly, e.g. `$1.23T`
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if abs >= 1.0 {
        format!("${:.2}", value)
    } else {
        format!("${:.6}", value)
    }
}

fn format_change(change: Option<f64>) -> String {
    change.map_or_else(|| "N/A".to_string(), |c| format!("{:+.2}%", c))
}

fn render_markets<W: Write>(out: &mut W, page: u32, coins: &[CoinMarket]) -> io::Result<()> {
    writeln!(out, "Markets (page {})", page)?;
    for coin in coins {
        writeln!(
            out,
            "{:>4}  {:<24} {:<8} {:>14} {:>9} {:>12}",
            coin.market_cap_rank.map_or_else(|| "-".to_string(), |r| r.to_string()),
            coin.name,
            coin.symbol.to_uppercase(),
            coin.current_price.map_or_else(|| "N/A".to_string(), format_usd),
            format_change(coin.price_change_percentage_24h),
            coin.market_cap.map_or_else(|| "N/A".to_string(), format_usd),
        )?;
    }
    Ok(())
}

fn render_detail<W: Write>(out: &mut W, detail: &CoinDetail) -> io::Result<()> {
    writeln!(out, "{} ({})", detail.name, detail.symbol.to_uppercase())?;
    if let Some(rank) = detail.market_cap_rank {
        writeln!(out, "Rank: #{}", rank)?;
    }
    if let Some(price) = detail.price_in("usd") {
        writeln!(out, "Price: {}", format_usd(price))?;
    }
    if let Some(data) = &detail.market_data {
        if let Some(cap) = data.market_cap.get("usd") {
            writeln!(out, "Market cap: {}", format_usd(*cap))?;
        }
        if let (Some(high), Some(low)) = (data.high_24h.get("usd"), data.low_24h.get("usd")) {
            writeln!(out, "24h range: {} - {}", format_usd(*low), format_usd(*high))?;
        }
        writeln!(out, "24h change: {}", format_change(data.price_change_percentage_24h))?;
    }
    Ok(())
}

fn render_charts<W: Write>(
    out: &mut W,
    currency: &str,
    days: u32,
    charts: &[(String, MarketChart)],
) -> io::Result<()> {
    writeln!(out, "Price history ({} days, {})", days, currency.to_uppercase())?;
    for (id, chart) in charts {
        match chart.price_range() {
            Some((low, high)) => writeln!(
                out,
                "{:<16} {:>5} points  low {:>14}  high {:>14}  change {:>9}",
                id,
                chart.prices.len(),
                format!("{:.4}", low),
                format!("{:.4}", high),
                format_change(chart.change_percentage()),
            )?,
            None => writeln!(out, "{:<16} no data", id)?,
        }
    }
    Ok(())
}

fn render_global<W: Write>(out: &mut W, global: &GlobalData) -> io::Result<()> {
    writeln!(out, "Global market")?;
    if let Some(cap) = global.total_market_cap.get("usd") {
        writeln!(out, "Total market cap: {}", format_usd(*cap))?;
    }
    if let Some(volume) = global.total_volume.get("usd") {
        writeln!(out, "24h volume: {}", format_usd(*volume))?;
    }
    writeln!(
        out,
        "24h change: {}",
        format_change(global.market_cap_change_percentage_24h_usd)
    )?;
    if let Some(count) = global.active_cryptocurrencies {
        writeln!(out, "Active cryptocurrencies: {}", count)?;
    }
    if let Some(btc) = global.market_cap_percentage.get("btc") {
        writeln!(out, "BTC dominance: {:.1}%", btc)?;
    }
    Ok(())
}

fn render_trending<W: Write>(out: &mut W, coins: &[TrendingCoin]) -> io::Result<()> {
    writeln!(out, "Trending")?;
    for (i, coin) in coins.iter().enumerate() {
        writeln!(
            out,
            "{:>2}. {:<24} {:<8} rank {}",
            i + 1,
            coin.name,
            coin.symbol.to_uppercase(),
            coin.market_cap_rank.map_or_else(|| "-".to_string(), |r| r.to_string()),
        )?;
    }
    Ok(())
}

fn render_search<W: Write>(out: &mut W, hits: &[SearchCoin]) -> io::Result<()> {
    if hits.is_empty() {
        return writeln!(out, "No coins found");
    }
    for (i, coin) in hits.iter().enumerate() {
        writeln!(
            out,
            "{:>2}. {:<24} {:<8} ({})",
            i + 1,
            coin.name,
            coin.symbol.to_uppercase(),
            coin.id
        )?;
    }
    Ok(())
}

fn render_summaries<W: Write>(out: &mut W, title: &str, coins: &[CoinSummary]) -> io::Result<()> {
    if coins.is_empty() {
        return writeln!(out, "{}: empty", title);
    }
    writeln!(out, "{}", title)?;
    for coin in coins {
        writeln!(out, "  {:<24} {:<8} ({})", coin.name, coin.symbol.to_uppercase(), coin.id)?;
    }
    Ok(())
}
