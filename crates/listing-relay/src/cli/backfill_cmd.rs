//! `listing-relay backfill --days N`: one run covering the last N days.

use crate::cli::run_cmd::{date_filter, execute, last_n_days};
use crate::config::Config;
use anyhow::{bail, Result};
use chrono::Local;

/// Run the relay for today and the `days - 1` days before it.
pub async fn run(config: Config, days: u32) -> Result<()> {
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let dates = last_n_days(Local::now().date_naive(), days);
    execute(config, &date_filter(&dates), &format!("Backfill of {days} day(s) complete")).await
}
