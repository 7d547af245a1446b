//! coindash - crypto market dashboard in the terminal
//!
//! Lists coins, shows coin details and price history, and keeps a local
//! watchlist and recently-viewed list. All market data comes from CoinGecko
//! through a cached, rate-limited client.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;

use coindash::api::MarketClient;
use coindash::app::{App, AppError};
use coindash::cli::Cli;
use coindash::config::Config;
use coindash::store::{LocalStore, Preferences};

/// Sets up logging; `RUST_LOG` takes precedence over the verbosity flags
fn init_logging(cli: &Cli) {
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<(), AppError> {
    cli.validate()?;

    let config = Config::load(cli.config.as_deref())?.with_api_key(cli.api_key.clone());
    log::debug!(
        "rate limit: {} requests per {:?}",
        config.rate_limit.capacity,
        config.rate_limit.refill_interval()
    );

    let client = MarketClient::from_config(&config)?;
    let preferences = LocalStore::new().map(Preferences::new);
    if preferences.is_none() {
        log::warn!("no data directory found, watchlist and recent lists are unavailable");
    }

    let app = App::new(client, preferences, cli.json);
    let mut stdout = io::stdout().lock();
    app.run(&cli.command, &mut stdout).await?;

    let stats = app.client().fetcher().stats();
    log::info!(
        "requests: {} cache hits, {} misses, {} network calls, {} failures",
        stats.hits,
        stats.misses,
        stats.network_calls,
        stats.failures
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
