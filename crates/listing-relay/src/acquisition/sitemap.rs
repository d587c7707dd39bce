//! Gzipped sitemap download and parsing.
//!
//! The sitemap is fetched once per run, gunzipped to a local file, parsed
//! into `(loc, lastmod)` entries and removed again when the run finishes.

use super::http_client::HttpClient;
use crate::error::{RelayError, Result};
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Namespace of the sitemap protocol.
pub const SITEMAP_NS: &[u8] = b"http://www.sitemaps.org/schemas/sitemap/0.9";

/// One `<url>` element of the sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: String,
}

/// Which URLs of a parsed sitemap are eligible by date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilter {
    /// Keep every entry.
    All,
    /// Keep entries whose `lastmod` equals one of these strings exactly.
    Dates(Vec<String>),
}

impl DateFilter {
    pub fn matches(&self, entry: &SitemapEntry) -> bool {
        match self {
            Self::All => true,
            Self::Dates(dates) => dates.iter().any(|d| d == &entry.last_modified),
        }
    }

    /// URLs of the matching entries, in sitemap order.
    pub fn apply(&self, entries: &[SitemapEntry]) -> Vec<String> {
        entries
            .iter()
            .filter(|e| self.matches(e))
            .map(|e| e.url.clone())
            .collect()
    }
}

/// Fetches and stores the remote sitemap.
#[derive(Debug, Clone)]
pub struct SitemapSource {
    client: HttpClient,
}

impl SitemapSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Download the raw (compressed) sitemap bytes.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).await?;
        if !resp.is_success() {
            return Err(RelayError::network(url, format!("status {}", resp.status)));
        }
        Ok(resp.body)
    }

    /// Download, decompress and store the sitemap XML at `output`.
    pub async fn download(&self, url: &str, output: &Path) -> Result<()> {
        info!("downloading sitemap {url}");
        let raw = self.fetch(url).await?;
        let xml = decompress(&raw)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RelayError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(output, xml).map_err(|source| RelayError::Io {
            path: output.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

/// Gunzip a sitemap payload into XML text.
pub fn decompress(raw: &[u8]) -> Result<String> {
    let mut xml = String::new();
    GzDecoder::new(raw)
        .read_to_string(&mut xml)
        .map_err(|e| RelayError::Decompress(e.to_string()))?;
    Ok(xml)
}

/// Read a stored sitemap and parse it.
pub fn parse_file(path: &Path) -> Result<Vec<SitemapEntry>> {
    let xml = std::fs::read_to_string(path).map_err(|source| RelayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&xml)
}

/// Remove the local sitemap copy.
pub fn cleanup(path: &Path) -> Result<()> {
    info!("deleting sitemap file {}", path.display());
    std::fs::remove_file(path).map_err(|source| RelayError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Loc,
    LastMod,
}

/// Parse sitemap XML into entries.
///
/// Only elements in the sitemap namespace are considered. A `<url>` without
/// both `<loc>` and `<lastmod>` is skipped with a warning; malformed XML
/// fails the whole parse.
pub fn parse(xml: &str) -> Result<Vec<SitemapEntry>> {
    let mut reader = NsReader::from_str(xml);
    let mut buf = Vec::new();

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    let mut in_url = false;
    let mut field: Option<Field> = None;
    let mut loc: Option<String> = None;
    let mut lastmod: Option<String> = None;

    loop {
        buf.clear();
        let (ns, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| RelayError::Parse(format!("sitemap xml: {e}")))?;
        let in_sitemap_ns = matches!(ns, ResolveResult::Bound(Namespace(n)) if n == SITEMAP_NS);

        match event {
            Event::Start(e) if in_sitemap_ns => match e.local_name().as_ref() {
                b"url" => {
                    in_url = true;
                    loc = None;
                    lastmod = None;
                }
                b"loc" if in_url => field = Some(Field::Loc),
                b"lastmod" if in_url => field = Some(Field::LastMod),
                _ => field = None,
            },
            Event::Text(e) => {
                if let Some(current) = field {
                    let text = e
                        .unescape()
                        .map_err(|e| RelayError::Parse(format!("sitemap text: {e}")))?;
                    push_text(current, text.trim(), &mut loc, &mut lastmod);
                }
            }
            Event::CData(e) => {
                if let Some(current) = field {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    push_text(current, text.trim(), &mut loc, &mut lastmod);
                }
            }
            Event::End(e) if in_sitemap_ns => {
                if e.local_name().as_ref() == b"url" && in_url {
                    in_url = false;
                    match (loc.take(), lastmod.take()) {
                        (Some(url), Some(last_modified)) => entries.push(SitemapEntry {
                            url,
                            last_modified,
                        }),
                        (url, _) => {
                            skipped += 1;
                            warn!(
                                "skipping sitemap url entry without loc/lastmod ({})",
                                url.as_deref().unwrap_or("no loc")
                            );
                        }
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if skipped > 0 {
        warn!("skipped {skipped} incomplete sitemap entries");
    }
    Ok(entries)
}

fn push_text(field: Field, text: &str, loc: &mut Option<String>, lastmod: &mut Option<String>) {
    if text.is_empty() {
        return;
    }
    let slot = match field {
        Field::Loc => loc,
        Field::LastMod => lastmod,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}
