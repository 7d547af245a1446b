//! Command-line interface parsing for coindash
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the settings the application starts with.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::api::{DEFAULT_CHART_COINS, DEFAULT_CHART_DAYS, DEFAULT_CURRENCY};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// `--pick` points past the end of the search results
    #[error("Invalid pick: {pick}. The search returned {available} result(s)")]
    InvalidPick { pick: usize, available: usize },

    /// A numeric argument must be at least 1
    #[error("Invalid value for {name}: must be at least 1")]
    NotPositive { name: &'static str },
}

/// coindash - crypto market dashboard in the terminal
#[derive(Parser, Debug)]
#[command(name = "coindash")]
#[command(about = "Crypto market listings, charts and watchlist backed by CoinGecko")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// CoinGecko demo API key, overriding the config file
    #[arg(long, global = true, env = "COINDASH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print raw JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List coins by market cap
    Markets {
        /// Page number (20 coins per page)
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show details for a coin and remember it as recently viewed
    Coin {
        /// CoinGecko coin id, e.g. bitcoin
        id: String,
    },
    /// Summarize historical prices for one or more coins
    Chart(ChartArgs),
    /// Show global market-cap figures
    Global,
    /// Show trending coins
    Trending {
        /// Show at most this many coins
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Search coins by name or symbol
    Search {
        /// Text to search for
        query: String,
        /// Show at most this many results
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Remember the Nth result (1-based) as a recent search
        #[arg(long, value_name = "N")]
        pick: Option<usize>,
    },
    /// Manage the watchlist
    Watchlist {
        #[command(subcommand)]
        action: Option<WatchlistAction>,
    },
    /// Show, prune or clear recently viewed coins
    Recent {
        #[arg(long, conflicts_with = "remove")]
        clear: bool,
        /// Drop one coin id from the list
        #[arg(long, value_name = "ID")]
        remove: Option<String>,
    },
    /// Show or clear recent searches
    Searches {
        #[arg(long)]
        clear: bool,
    },
    /// Show or toggle the theme preference
    Theme {
        #[arg(long)]
        toggle: bool,
    },
}

/// Arguments for the `chart` command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ChartArgs {
    /// Coin ids to chart (defaults to bitcoin, ethereum and binancecoin)
    pub ids: Vec<String>,
    /// Quote currency
    #[arg(long, default_value = DEFAULT_CURRENCY)]
    pub currency: String,
    /// Range in days
    #[arg(long, default_value_t = DEFAULT_CHART_DAYS)]
    pub days: u32,
}

impl ChartArgs {
    /// Coin ids to chart, falling back to the defaults
    pub fn coin_ids(&self) -> Vec<String> {
        if self.ids.is_empty() {
            DEFAULT_CHART_COINS.iter().map(|id| id.to_string()).collect()
        } else {
            self.ids.clone()
        }
    }
}

/// Watchlist subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum WatchlistAction {
    /// List watched coins
    List,
    /// Watch a coin
    Add { id: String },
    /// Stop watching a coin
    Remove { id: String },
    /// Remove every coin
    Clear,
}

impl Cli {
    /// Rejects argument values clap cannot express as constraints
    pub fn validate(&self) -> Result<(), CliError> {
        match &self.command {
            Command::Markets { page: 0 } => Err(CliError::NotPositive { name: "--page" }),
            Command::Chart(args) if args.days == 0 => Err(CliError::NotPositive { name: "--days" }),
            Command::Search { pick: Some(0), .. } => Err(CliError::NotPositive { name: "--pick" }),
            _ => Ok(()),
        }
    }

    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Picks the Nth (1-based) search result, checking it exists
pub fn pick_index(pick: usize, available: usize) -> Result<usize, CliError> {
    if pick == 0 || pick > available {
        return Err(CliError::InvalidPick { pick, available });
    }
    Ok(pick - 1)
}
