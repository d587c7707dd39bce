//! The per-URL pipeline: resolve, extract, map, post, record.
//!
//! ```text
//! Start -> Resolving(cutoff=3) -> [cutoff+1 ... max_cutoff]
//!       -> Extracted | ResolutionExhausted
//!       -> Mapping -> Posting -> Done(Success) | Done(PostFailed)
//! ```

use crate::acquisition::delivery::RecordSink;
use crate::acquisition::listing_client::{ListingRecord, ListingSource};
use crate::audit::url_log::{LogKind, UrlStateStore};
use crate::error::{RelayError, Result};
use crate::extraction::field_mapper::{FieldMapper, FieldMapping, MappedRecord};
use crate::resolution::url_resolver::{extract_key, UrlResolver};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// First cutoff tried for every URL.
pub const MIN_CUTOFF: usize = 3;

/// Final state of one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Processed,
    Unprocessed,
    Unsaved,
}

impl Outcome {
    /// The log this outcome is appended to.
    pub fn log(self) -> LogKind {
        match self {
            Self::Processed => LogKind::Processed,
            Self::Unprocessed => LogKind::Unprocessed,
            Self::Unsaved => LogKind::Unsaved,
        }
    }
}

/// Outcome recorded for one attempted URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlRecord {
    pub url: String,
    pub outcome: Outcome,
}

/// A listing found for a URL, with how it was found.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub target: String,
    pub cutoff: usize,
    pub listing: ListingRecord,
}

/// Runs the full pipeline for single URLs. Shared by all workers.
pub struct UrlProcessor {
    resolver: UrlResolver,
    listings: Arc<dyn ListingSource>,
    sink: Arc<dyn RecordSink>,
    mapper: FieldMapper,
    mapping: FieldMapping,
    store: Arc<UrlStateStore>,
    max_cutoff: usize,
}

impl UrlProcessor {
    pub fn new(
        resolver: UrlResolver,
        listings: Arc<dyn ListingSource>,
        sink: Arc<dyn RecordSink>,
        mapping: FieldMapping,
        store: Arc<UrlStateStore>,
        max_cutoff: usize,
    ) -> Self {
        Self {
            resolver,
            listings,
            sink,
            mapper: FieldMapper::default(),
            mapping,
            store,
            max_cutoff,
        }
    }

    /// Replace the default field mapper (e.g. to register extra transforms).
    pub fn with_mapper(mut self, mapper: FieldMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Try cutoffs from [`MIN_CUTOFF`] to `max_cutoff` until the vendor
    /// returns a listing.
    ///
    /// A URL that cannot be resolved at some cutoff fails immediately; a
    /// failed lookup moves on to the next cutoff. The error of the last
    /// attempt is returned when every cutoff fails.
    pub async fn extract(&self, url: &str) -> Result<Extracted> {
        let mut last_error = None;

        for cutoff in MIN_CUTOFF..=self.max_cutoff {
            debug!("trying cutoff {cutoff} for {url}");
            let target = self.resolver.resolve(url, cutoff)?;

            match self.lookup(&target).await {
                Ok(listing) => {
                    return Ok(Extracted {
                        target,
                        cutoff,
                        listing,
                    })
                }
                Err(e) => {
                    debug!("cutoff {cutoff} failed for {url}: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RelayError::malformed(url, format!("no cutoff between {MIN_CUTOFF} and {}", self.max_cutoff))
        }))
    }

    async fn lookup(&self, target: &str) -> Result<ListingRecord> {
        let key = extract_key(target)?;
        self.listings.fetch_listing(&key).await
    }

    /// Extract and map without posting or recording anything.
    pub async fn preview(&self, url: &str) -> Result<(Extracted, MappedRecord)> {
        let extracted = self.extract(url).await?;
        let record = self.mapper.map(&extracted.listing, &self.mapping);
        Ok((extracted, record))
    }

    /// Run the whole pipeline for `url` and record exactly one outcome.
    pub async fn process_url(&self, url: &str) -> UrlRecord {
        let outcome = match self.extract(url).await {
            Err(e) => {
                warn!("failed to extract {url}: {e}");
                Outcome::Unprocessed
            }
            Ok(extracted) => {
                info!("extracted {url} at cutoff {}", extracted.cutoff);
                let record = self.mapper.map(&extracted.listing, &self.mapping);
                match self.sink.post(&record).await {
                    Ok(()) => {
                        info!("processed {url}");
                        Outcome::Processed
                    }
                    Err(e) => {
                        warn!("failed to post {url}: {e}");
                        Outcome::Unsaved
                    }
                }
            }
        };

        // Losing a bookkeeping line is tolerated; the URL is retried next run.
        if let Err(e) = self.record(outcome.log(), url).await {
            warn!("could not record {url} as {}: {e}", outcome.log());
        }

        UrlRecord {
            url: url.to_string(),
            outcome,
        }
    }

    /// Append to a state log on the blocking pool; the store serializes
    /// writers with a std mutex and writes synchronously.
    async fn record(&self, log: LogKind, url: &str) -> Result<()> {
        let store = Arc::clone(&self.store);
        let urls = vec![url.to_string()];
        tokio::task::spawn_blocking(move || store.append(log, &urls))
            .await
            .map_err(|e| RelayError::StateStoreIo {
                path: self.store.path(log).to_path_buf(),
                source: std::io::Error::other(e),
            })?
    }
}
