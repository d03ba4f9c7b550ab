//! Sales Commission Leaderboard
//!
//! Ranks managers by the commission they earned in a selected month, using
//! contracts from the PocketBase CRM and rates from the currency service.

mod cache;
mod config;
mod constants;
mod identity;
mod pocketbase;
mod rates;
mod reports;

use anyhow::Result;
use chrono::{Local, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use leaderboard_core::{
    ExchangeRateTable, LeaderboardEntry, LeaderboardInputs, MonthWindow, aggregate_offices,
    build_leaderboard, rank_offices, user_stats,
};
use std::path::PathBuf;
use tracing::{info, warn};

use cache::Cache;
use config::{Config, FileConfig, Overrides};
use identity::{Identity, LoginOutcome};
use pocketbase::PocketBaseClient;
use rates::{RateSource, RatesClient};
use reports::ExportFormat;

#[derive(Parser, Debug)]
#[command(name = "sales-leaderboard")]
#[command(about = "Monthly commission leaderboard for sales managers")]
struct Args {
    /// Data directory for the cache database
    #[arg(short, long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Output directory for exports
    #[arg(short, long, default_value = "./output", global = true)]
    output_dir: PathBuf,

    /// Config file
    #[arg(short, long, default_value = constants::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Month to show (YYYY-MM, default: current month)
    #[arg(short, long, global = true)]
    month: Option<String>,

    /// Restrict the leaderboard to one office id (empty string clears the config value)
    #[arg(long, global = true)]
    office: Option<String>,

    /// PocketBase URL override
    #[arg(long, env = "POCKETBASE_URL", global = true)]
    pocketbase_url: Option<String>,

    /// PocketBase service account password
    #[arg(long, env = "POCKETBASE_PASSWORD", hide_env_values = true, global = true)]
    pocketbase_password: Option<String>,

    /// Rate API bearer token
    #[arg(long, env = "RATES_TOKEN", hide_env_values = true, global = true)]
    rates_token: Option<String>,

    /// Ignore cached exchange rates
    #[arg(long, global = true)]
    no_cache: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in by nickname (unknown nicknames sign in as guest)
    Login {
        nickname: String,
    },

    /// Forget the signed-in manager
    Logout,

    /// Show the signed-in manager
    Whoami,

    /// Show current exchange rates
    Rates,

    /// Rank offices instead of managers
    Offices,

    /// Write the leaderboard to a file
    Export {
        /// File format
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Output path (default: <output-dir>/leaderboard_<YYYY-MM>.<ext>)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// Load config file or exit with helpful message
fn load_config(args: &Args) -> Result<Config> {
    if !args.config.exists() {
        anyhow::bail!(
            "Config file '{}' not found.\n\n\
            To get started:\n\
            1. Copy config.toml.example to config.toml\n\
            2. Fill in the PocketBase URL and the rate API URL/token\n\n\
            See config.toml.example for the required format.",
            args.config.display()
        );
    }

    let file_config = FileConfig::load(&args.config)?;
    Config::from_file(
        &file_config,
        Overrides {
            pocketbase_url: args.pocketbase_url.clone(),
            pocketbase_password: args.pocketbase_password.clone(),
            rates_token: args.rates_token.clone(),
            office: args.office.clone(),
        },
    )
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    std::fs::create_dir_all(&args.data_dir)?;

    let cache_path = args.data_dir.join(constants::CACHE_FILENAME);
    let cache = Cache::open(&cache_path).await?;

    let now = Local::now().naive_local();
    let window = match &args.month {
        Some(month) => MonthWindow::parse(month, now)?,
        None => MonthWindow::current(now),
    };

    match &args.command {
        Some(Command::Login { nickname }) => handle_login(&args, &cache, nickname).await,
        Some(Command::Logout) => handle_logout(&cache).await,
        Some(Command::Whoami) => handle_whoami(&cache).await,
        Some(Command::Rates) => handle_rates(&args, &cache).await,
        Some(Command::Offices) => handle_offices(&args, &cache, &window).await,
        Some(Command::Export { format, file }) => {
            let leaderboard = compute_leaderboard(&args, &cache, &window, now).await?;
            let path = match file {
                Some(path) => path.clone(),
                None => {
                    std::fs::create_dir_all(&args.output_dir)?;
                    reports::export_path(&args.output_dir, &window, *format)
                }
            };
            reports::export_leaderboard(&path, &leaderboard, *format)?;
            println!("Exported {} managers to {}", leaderboard.len(), path.display());
            Ok(())
        }
        None => {
            let leaderboard = compute_leaderboard(&args, &cache, &window, now).await?;
            reports::print_leaderboard(&window, &leaderboard)
        }
    }
}

/// Rates for this run, honoring `--no-cache`
async fn load_rates(config: &Config, args: &Args, cache: &Cache) -> Result<(ExchangeRateTable, RateSource)> {
    let client = RatesClient::new(config)?;
    rates::load_rates(&client, cache, !args.no_cache, Utc::now()).await
}

/// The signed-in manager's own stats for `window`. Lookup failures are logged
/// and treated as "no stats".
async fn current_user_stats(
    client: &PocketBaseClient,
    identity: &Identity,
    window: &MonthWindow,
    rates: &ExchangeRateTable,
) -> Option<LeaderboardEntry> {
    match client.fetch_user_contracts(&identity.user_id, window).await {
        Ok(contracts) => Some(user_stats(
            &identity.user_id,
            &contracts,
            rates,
            Some(identity.name.as_str()),
            Some(identity.office_name.as_str()),
        )),
        Err(e) => {
            warn!(user = %identity.user_id, "could not load your stats: {:#}", e);
            None
        }
    }
}

/// Fetch everything and run the leaderboard pipeline
async fn compute_leaderboard(
    args: &Args,
    cache: &Cache,
    window: &MonthWindow,
    now: NaiveDateTime,
) -> Result<Vec<LeaderboardEntry>> {
    let config = load_config(args)?;
    let identity = cache.get_identity().await?;

    let (rates, _) = load_rates(&config, args, cache).await?;

    let client = PocketBaseClient::connect(&config).await?;
    let contracts = client
        .fetch_contracts(window, config.office_filter.as_deref())
        .await?;
    info!(count = contracts.len(), month = %window.key(), "loaded contracts");

    let stats = match &identity {
        Some(identity) => current_user_stats(&client, identity, window, &rates).await,
        None => None,
    };

    Ok(build_leaderboard(LeaderboardInputs {
        contracts: &contracts,
        rates: &rates,
        current_user_id: identity.as_ref().map(|i| i.user_id.as_str()),
        current_user_stats: stats,
        window: *window,
        now,
    }))
}

async fn handle_login(args: &Args, cache: &Cache, nickname: &str) -> Result<()> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        anyhow::bail!("Nickname must not be empty");
    }

    let config = load_config(args)?;
    let lookup = match PocketBaseClient::connect(&config).await {
        Ok(client) => client.find_user_by_nickname(nickname).await,
        Err(e) => Err(e),
    };

    let outcome = identity::resolve_login(lookup, nickname, Utc::now().timestamp_millis());
    cache.save_identity(outcome.identity()).await?;

    match &outcome {
        LoginOutcome::Found(identity) => {
            println!("Signed in as {} ({})", identity.name, identity.office_name);
        }
        LoginOutcome::NotFound(identity) => {
            println!(
                "⚠️  Profile \"{}\" was not found. You may not have any contracts yet, or the nickname is misspelled.",
                nickname
            );
            println!("Signed in as guest {}", identity.user_id);
        }
        LoginOutcome::LookupFailed(identity, e) => {
            warn!("user lookup failed: {:#}", e);
            println!("❌ Could not look up \"{}\". Signed in as guest {}", nickname, identity.user_id);
        }
    }

    Ok(())
}

async fn handle_logout(cache: &Cache) -> Result<()> {
    if cache.clear_identity().await? {
        println!("Signed out.");
    } else {
        println!("Nobody is signed in.");
    }
    Ok(())
}

async fn handle_whoami(cache: &Cache) -> Result<()> {
    match cache.get_identity().await? {
        Some(identity) => {
            println!(
                "{} ({}){}",
                identity.name,
                identity.office_name,
                if identity.is_guest { " [guest]" } else { "" }
            );
            println!("id: {}", identity.user_id);
        }
        None => {
            println!("Nobody is signed in.");
            println!("\nUse 'sales-leaderboard login <nickname>' to sign in");
        }
    }
    Ok(())
}

async fn handle_rates(args: &Args, cache: &Cache) -> Result<()> {
    let config = load_config(args)?;
    let (rates, source) = load_rates(&config, args, cache).await?;
    reports::print_rates(&rates, source);
    Ok(())
}

async fn handle_offices(args: &Args, cache: &Cache, window: &MonthWindow) -> Result<()> {
    let config = load_config(args)?;
    let identity = cache.get_identity().await?;
    let (rates, _) = load_rates(&config, args, cache).await?;

    let client = PocketBaseClient::connect(&config).await?;
    let contracts = client.fetch_contracts(window, None).await?;

    let offices = rank_offices(
        aggregate_offices(&contracts, &rates),
        identity.as_ref().and_then(|i| i.office_id.as_deref()),
    );
    reports::print_offices(window, &offices)
}
