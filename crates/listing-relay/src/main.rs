use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use listing_relay::audit::url_log::LogKind;
use listing_relay::cli::{backfill_cmd, inspect_cmd, output, requeue_cmd, run_cmd};
use listing_relay::config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "listing-relay",
    version,
    about = "Relay fresh sitemap listings from a vendor API into a webform"
)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Suppress the human-readable report
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process sitemap URLs modified yesterday (or on the given dates)
    Run {
        /// Sitemap lastmod date to select, YYYY-MM-DD; may be repeated
        #[arg(long = "date", conflicts_with = "all_dates")]
        dates: Vec<NaiveDate>,

        /// Ignore lastmod and consider every sitemap URL
        #[arg(long)]
        all_dates: bool,
    },

    /// Process URLs modified today or in the previous days
    Backfill {
        /// Number of days to cover, today included
        #[arg(long, default_value = "10")]
        days: u32,
    },

    /// Resolve, fetch and map one listing URL without posting it
    Inspect {
        /// Listing page URL
        url: String,
    },

    /// Remove a URL from a state log so the next run retries it
    Requeue {
        /// processed, unprocessed or unsaved
        #[arg(long)]
        log: LogKind,

        /// URL to remove
        url: String,
    },
}

fn init_tracing(verbose: bool, json_logs: bool) {
    let default = if verbose {
        "listing_relay=debug"
    } else {
        "listing_relay=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json {
        std::env::set_var(output::JSON_ENV, "1");
    }
    if cli.quiet {
        std::env::set_var(output::QUIET_ENV, "1");
    }
    init_tracing(cli.verbose, cli.json_logs);

    let path = Config::locate(cli.config.as_deref());
    let config =
        Config::load(&path).with_context(|| format!("loading config from {}", path.display()))?;

    match cli.command {
        Command::Run { dates, all_dates } => run_cmd::run(config, &dates, all_dates).await,
        Command::Backfill { days } => backfill_cmd::run(config, days).await,
        Command::Inspect { url } => inspect_cmd::run(&config, &url).await,
        Command::Requeue { log, url } => requeue_cmd::run(&config, log, &url),
    }
}
