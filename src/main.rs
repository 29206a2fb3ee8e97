mod alerts;
mod catalog;
mod config;
mod db;
mod error;
mod fetcher;
mod pricing;
mod runner;
mod types;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::alerts::{AlertDispatcher, LogNotifier, Notifier, TelegramNotifier};
use crate::config::Config;
use crate::db::{Repository, SqliteRepository};
use crate::error::{AppError, Result};
use crate::fetcher::HttpFetcher;
use crate::runner::Runner;
use crate::types::NewWatch;

#[derive(Parser)]
#[command(name = "listing-alert", about = "Marketplace search watcher with price-band alerts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check every watch once and send alerts for new or changed listings.
    Run {
        /// Write alerts to the log instead of delivering them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Check every watch once and store listings without sending alerts.
    Init,
    /// Add, list or remove watches.
    Watch {
        #[command(subcommand)]
        action: WatchAction,
    },
    /// Forget all stored listings (watches are kept).
    Clear,
}

#[derive(Subcommand)]
enum WatchAction {
    /// Add a watch and store its current listings without alerting.
    Add {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        term: String,
        #[arg(long, default_value = "search")]
        search_type: String,
        #[arg(long)]
        low: u32,
        #[arg(long)]
        high: u32,
    },
    /// Show all watches with their id.
    List,
    /// Remove a watch and its listings.
    Remove { id: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cli.command, cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command, cfg: Config) -> Result<()> {
    let repo = Arc::new(SqliteRepository::connect(&cfg.db_path).await?);

    match command {
        Command::Run { dry_run } => {
            info!(">> Starting listing alert run");
            let runner = build_runner(&cfg, Arc::clone(&repo), dry_run)?;
            let summary = runner.run(true).await?;
            if summary.failed_watches > 0 {
                warn!("{} of {} watches failed", summary.failed_watches, summary.watches);
            }
            info!("<< Listing alert run finished");
        }
        Command::Init => {
            info!(">> Initializing listing catalog");
            let runner = build_runner(&cfg, Arc::clone(&repo), true)?;
            runner.run(false).await?;
            info!("<< Listing catalog initialized");
        }
        Command::Watch { action } => watch_command(action, &cfg, repo).await?,
        Command::Clear => {
            let removed = repo.clear_listings().await?;
            println!("Cleared {removed} stored listings");
        }
    }

    Ok(())
}

async fn watch_command(action: WatchAction, cfg: &Config, repo: Arc<SqliteRepository>) -> Result<()> {
    match action {
        WatchAction::Add { url, term, search_type, low, high } => {
            let watch = repo
                .add_watch(NewWatch { url, search_term: term, search_type, price_low: low, price_high: high })
                .await?;
            let runner = build_runner(cfg, Arc::clone(&repo), true)?;
            let report = runner.run_watch(watch.id, false).await?;
            println!("Added watch {} with {} listings", watch.id, report.new);
        }
        WatchAction::List => {
            let watches = repo.load_watches().await?;
            if watches.is_empty() {
                println!("No watches");
            }
            for w in watches {
                let listings = repo.listing_count(w.id).await?;
                println!(
                    "{:<6}{:>6}€ - {:<6}€  {:>5} listings  {:<10} {:<20} {}",
                    w.id, w.price_low, w.price_high, listings, w.search_type, w.search_term, w.url
                );
            }
        }
        WatchAction::Remove { id } => {
            let Some(watch) = repo.get_watch(id).await? else {
                return Err(AppError::InvalidWatch(format!("no watch with id {id}")));
            };
            repo.remove_watch(id).await?;
            println!("Watch {id} removed ({})", watch.url);
        }
    }
    Ok(())
}

/// Wire collaborators. Alerts go to Telegram when credentials are configured and
/// `log_only` is false; otherwise to the log.
fn build_runner(cfg: &Config, repo: Arc<SqliteRepository>, log_only: bool) -> Result<Runner> {
    let notifier: Arc<dyn Notifier> = match cfg.telegram_credentials() {
        Some((token, chat)) if !log_only => {
            Arc::new(TelegramNotifier::new(&cfg.telegram_api_url, token, chat)?)
        }
        None if !log_only => {
            warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, alerts will only be logged");
            Arc::new(LogNotifier)
        }
        _ => Arc::new(LogNotifier),
    };

    Ok(Runner::new(
        Arc::new(HttpFetcher::new(cfg)?),
        repo,
        AlertDispatcher::new(notifier),
        cfg.watch_concurrency,
    ))
}
