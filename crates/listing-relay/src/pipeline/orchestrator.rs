//! One relay run: sitemap -> eligible batch -> worker pool -> summary.

use super::processor::{Outcome, UrlProcessor, UrlRecord};
use super::worker_pool::WorkerPool;
use crate::acquisition::delivery::WebformClient;
use crate::acquisition::http_client::HttpClient;
use crate::acquisition::listing_client::ListingClient;
use crate::acquisition::sitemap::{self, DateFilter, SitemapEntry, SitemapSource};
use crate::audit::url_log::{LogKind, UrlStateStore};
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::resolution::url_resolver::UrlResolver;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// URLs selected for a run and how many matched the date filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub date_matched: usize,
    pub urls: Vec<String>,
}

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sitemap_entries: usize,
    pub date_matched: usize,
    pub batch: usize,
    pub processed: usize,
    pub unprocessed: usize,
    pub unsaved: usize,
    pub elapsed_ms: u64,
}

impl RunSummary {
    fn tally(&mut self, records: &[UrlRecord]) {
        for record in records {
            match record.outcome {
                Outcome::Processed => self.processed += 1,
                Outcome::Unprocessed => self.unprocessed += 1,
                Outcome::Unsaved => self.unsaved += 1,
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Drives whole runs over the configured sitemap.
pub struct Orchestrator {
    config: Arc<Config>,
    sitemap: SitemapSource,
    store: Arc<UrlStateStore>,
    processor: Arc<UrlProcessor>,
    pool: WorkerPool,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        sitemap: SitemapSource,
        store: Arc<UrlStateStore>,
        processor: Arc<UrlProcessor>,
    ) -> Self {
        let pool = WorkerPool::new(config.workers);
        Self {
            config,
            sitemap,
            store,
            processor,
            pool,
        }
    }

    /// Wire the HTTP-backed sources and sinks described by `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let client = HttpClient::new(config.request_timeout)?;
        let store = Arc::new(UrlStateStore::new(&config.logs));
        let processor = Arc::new(build_processor(&config, &client, Arc::clone(&store)));
        Ok(Self::new(
            Arc::clone(&config),
            SitemapSource::new(client),
            store,
            processor,
        ))
    }

    pub fn processor(&self) -> &UrlProcessor {
        &self.processor
    }

    pub fn store(&self) -> &UrlStateStore {
        &self.store
    }

    /// Narrow sitemap entries to this run's batch: date filter, then drop
    /// URLs already in the processed or unprocessed logs, then cap.
    ///
    /// The unsaved log is deliberately not consulted, so URLs the webform
    /// rejected are offered again on every run.
    pub fn select_batch(&self, entries: &[SitemapEntry], filter: &DateFilter) -> Result<Batch> {
        let dated = filter.apply(entries);
        let date_matched = dated.len();

        let unseen = self.store.filter_unseen(&dated, LogKind::Processed)?;
        let mut urls = self.store.filter_unseen(&unseen, LogKind::Unprocessed)?;
        urls.truncate(self.config.max_scrap);

        Ok(Batch { date_matched, urls })
    }

    /// Process a batch across the worker pool.
    pub async fn process_batch(&self, urls: Vec<String>) -> Vec<UrlRecord> {
        let processor = Arc::clone(&self.processor);
        self.pool
            .run_all(urls, move |url| {
                let processor = Arc::clone(&processor);
                async move { processor.process_url(&url).await }
            })
            .await
    }

    /// A complete run. Fails only before fan-out (sitemap download or
    /// parse, state log reads); per-URL failures end up in the summary.
    pub async fn process_sitemap(&self, filter: &DateFilter) -> Result<RunSummary> {
        let started = Instant::now();
        let sitemap_file = &self.config.sitemap_file;

        if let Err(e) = self
            .sitemap
            .download(&self.config.sitemap_url, sitemap_file)
            .await
        {
            error!("unable to download and extract sitemap: {e}");
            return Err(e);
        }

        let entries = match sitemap::parse_file(sitemap_file) {
            Ok(entries) if !entries.is_empty() => entries,
            Ok(_) => {
                error!("sitemap contains no usable url entries");
                return Err(RelayError::Parse("sitemap contains no url entries".into()));
            }
            Err(e) => {
                error!("failed to parse sitemap: {e}");
                return Err(e);
            }
        };
        info!("found {} urls in the sitemap", entries.len());

        let batch = self.select_batch(&entries, filter)?;
        info!(
            "{} urls match the date filter, {} not yet handled (cap {})",
            batch.date_matched,
            batch.urls.len(),
            self.config.max_scrap
        );

        let mut summary = RunSummary {
            sitemap_entries: entries.len(),
            date_matched: batch.date_matched,
            batch: batch.urls.len(),
            ..RunSummary::default()
        };

        info!(
            "dispatching {} urls across {} workers",
            batch.urls.len(),
            self.pool.size()
        );
        let records = self.process_batch(batch.urls).await;
        summary.tally(&records);

        if let Err(e) = sitemap::cleanup(sitemap_file) {
            warn!("could not delete sitemap file: {e}");
        }

        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "handled {} urls in {:.1}s ({} processed, {} unprocessed, {} unsaved)",
            summary.batch,
            summary.elapsed().as_secs_f64(),
            summary.processed,
            summary.unprocessed,
            summary.unsaved
        );
        Ok(summary)
    }
}

/// The HTTP-backed per-URL processor for `config`.
pub fn build_processor(config: &Config, client: &HttpClient, store: Arc<UrlStateStore>) -> UrlProcessor {
    let listings = ListingClient::new(client.clone(), &config.api_url, &config.vendor_token);
    let sink = WebformClient::new(client.clone(), &config.webform_url);
    UrlProcessor::new(
        UrlResolver::new(config.site_url.clone()),
        Arc::new(listings),
        Arc::new(sink),
        config.api_extraction.clone(),
        store,
        config.max_cutoff,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogPaths;
    use crate::extraction::field_mapper::FieldMapping;
    use std::path::Path;

    fn config(dir: &Path, max_scrap: usize) -> Config {
        Config {
            sitemap_url: "http://127.0.0.1:9/sitemap.xml.gz".into(),
            sitemap_file: dir.join("sitemap.xml"),
            api_url: "http://127.0.0.1:9/api".into(),
            vendor_token: "t".into(),
            webform_url: "http://127.0.0.1:9/form".into(),
            logs: LogPaths {
                processed: dir.join("processed.csv"),
                unprocessed: dir.join("unprocessed.csv"),
                unsaved: dir.join("unsaved.csv"),
            },
            max_scrap,
            api_extraction: FieldMapping::new(),
            site_url: None,
            workers: 2,
            max_cutoff: 6,
            request_timeout: Duration::from_secs(1),
        }
    }

    fn entry(url: &str, date: &str) -> SitemapEntry {
        SitemapEntry {
            url: url.into(),
            last_modified: date.into(),
        }
    }

    #[test]
    fn test_select_batch_filters_and_caps() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::from_config(config(dir.path(), 2)).unwrap();
        let entries = vec![
            entry("https://x/a", "2026-10-19"),
            entry("https://x/b", "2026-10-18"),
            entry("https://x/c", "2026-10-19"),
            entry("https://x/d", "2026-10-19"),
            entry("https://x/e", "2026-10-18"),
        ];

        let batch = orchestrator
            .select_batch(&entries, &DateFilter::Dates(vec!["2026-10-19".into()]))
            .unwrap();
        assert_eq!(batch.date_matched, 3);
        assert_eq!(batch.urls, vec!["https://x/a".to_string(), "https://x/c".to_string()]);
    }

    #[test]
    fn test_select_batch_skips_handled_urls_but_not_unsaved() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::from_config(config(dir.path(), 10)).unwrap();
        let store = orchestrator.store();
        store.append(LogKind::Processed, &["https://x/a".into()]).unwrap();
        store.append(LogKind::Unprocessed, &["https://x/b".into()]).unwrap();
        store.append(LogKind::Unsaved, &["https://x/c".into()]).unwrap();

        let entries = vec![
            entry("https://x/a", "2026-10-19"),
            entry("https://x/b", "2026-10-19"),
            entry("https://x/c", "2026-10-19"),
        ];
        let batch = orchestrator.select_batch(&entries, &DateFilter::All).unwrap();
        assert_eq!(batch.urls, vec!["https://x/c".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_sitemap_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::from_config(config(dir.path(), 10)).unwrap();
        let err = orchestrator.process_sitemap(&DateFilter::All).await.unwrap_err();
        assert!(matches!(err, RelayError::Network { .. }));
        for kind in LogKind::ALL {
            assert!(!orchestrator.store().path(kind).exists());
        }
    }
}
