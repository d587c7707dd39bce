//! `listing-relay requeue --log <log> <url>`: forget a URL so the next run
//! picks it up again.

use crate::audit::url_log::{LogKind, UrlStateStore};
use crate::cli::output::{self, Styled};
use crate::config::Config;
use anyhow::{Context, Result};

/// Remove one occurrence of `url` from `log`. Fails if it is not there.
pub fn run(config: &Config, log: LogKind, url: &str) -> Result<()> {
    let store = UrlStateStore::new(&config.logs);
    store
        .remove(log, url)
        .with_context(|| format!("removing {url} from {}", store.path(log).display()))?;

    if output::is_json() {
        output::print_json(&serde_json::json!({"removed": url, "log": log.as_str()}));
    } else if !output::is_quiet() {
        let s = Styled::new();
        eprintln!("  {} removed {url} from the {log} log", s.ok_sym());
    }
    Ok(())
}
