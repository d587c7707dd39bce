//! `listing-relay inspect <url>`: resolve, fetch and map a single listing
//! without posting it or touching the logs.

use crate::acquisition::http_client::HttpClient;
use crate::audit::url_log::UrlStateStore;
use crate::cli::output::{self, Styled};
use crate::config::Config;
use crate::pipeline::orchestrator::build_processor;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Print the target URL, cutoff and mapped record for `url`.
pub async fn run(config: &Config, url: &str) -> Result<()> {
    let client = HttpClient::new(config.request_timeout)?;
    let store = Arc::new(UrlStateStore::new(&config.logs));
    let processor = build_processor(config, &client, store);

    let (extracted, record) = processor
        .preview(url)
        .await
        .with_context(|| format!("could not extract {url}"))?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "url": url,
            "target": extracted.target,
            "cutoff": extracted.cutoff,
            "record": record.to_json(),
        }));
        return Ok(());
    }

    let s = Styled::new();
    eprintln!("  {} {}", s.ok_sym(), s.bold(url));
    output::print_check(s.ok_sym(), "Target:", &extracted.target);
    output::print_check(s.ok_sym(), "Cutoff:", &extracted.cutoff.to_string());
    eprintln!();
    for (field, value) in record.fields() {
        let shown = match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        eprintln!("    {field:<16} {}", s.dim(&shown));
    }
    Ok(())
}
