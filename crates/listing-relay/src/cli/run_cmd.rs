//! `listing-relay run`: one run over the sitemap for the given dates.

use crate::acquisition::sitemap::DateFilter;
use crate::cli::output::{self, Styled};
use crate::config::Config;
use crate::pipeline::orchestrator::Orchestrator;
use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};

/// Sitemap `lastmod` format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The day before `today`.
pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today - Duration::days(1)
}

/// `today` and the `days - 1` days before it, newest first.
pub fn last_n_days(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..i64::from(days))
        .map(|offset| today - Duration::days(offset))
        .collect()
}

/// Build the date filter for a set of days.
pub fn date_filter(dates: &[NaiveDate]) -> DateFilter {
    DateFilter::Dates(
        dates
            .iter()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .collect(),
    )
}

/// Run the relay once. With no dates and no `all_dates`, yesterday is used.
pub async fn run(config: Config, dates: &[NaiveDate], all_dates: bool) -> Result<()> {
    let filter = if all_dates {
        DateFilter::All
    } else if dates.is_empty() {
        date_filter(&[yesterday(Local::now().date_naive())])
    } else {
        date_filter(dates)
    };

    execute(config, &filter, "Run complete").await
}

/// Shared by `run` and `backfill`.
pub(crate) async fn execute(config: Config, filter: &DateFilter, label: &str) -> Result<()> {
    let s = Styled::new();
    if !output::is_quiet() && !output::is_json() {
        output::print_header(&s);
        match filter {
            DateFilter::All => eprintln!("  Dates: all"),
            DateFilter::Dates(dates) => eprintln!("  Dates: {}", dates.join(", ")),
        }
        eprintln!();
    }

    let orchestrator = Orchestrator::from_config(config).context("setting up relay")?;
    let summary = orchestrator
        .process_sitemap(filter)
        .await
        .context("relay run aborted")?;

    output::print_summary(&s, label, &summary);
    Ok(())
}
