//! Heuristic mapping from public listing URLs to vendor API keys.
//!
//! Public listing pages look like
//! `https://site/property/1-H6255197-253-Merrick-Avenue-Hempstead-NY-11554`:
//! an MLS id followed by the street address and a tail of locality segments
//! of unknown length. The vendor addresses the same listing as
//! `https://site/property/H6255197/253-Merrick-Avenue/`. Because the tail
//! length varies, callers retry with increasing cutoffs.

use crate::error::{RelayError, Result};
use serde::Serialize;
use url::Url;

/// Vendor API lookup key for one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedKey {
    pub domain: String,
    pub mls_id: String,
    pub address: String,
}

/// Builds vendor-facing target URLs from public listing URLs.
#[derive(Debug, Clone, Default)]
pub struct UrlResolver {
    base_url: Option<String>,
}

impl UrlResolver {
    /// `base_url` replaces the listing URL's origin in every target when set.
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.map(|b| b.trim_end_matches('/').to_string()),
        }
    }

    /// Drop the trailing `cutoff` hyphen-delimited segments of `url` and
    /// rebuild `{base}/property/{mls}/{address-segments}/`.
    pub fn resolve(&self, url: &str, cutoff: usize) -> Result<String> {
        let parts: Vec<&str> = url.split('-').collect();
        if parts.len() < cutoff + 2 {
            return Err(RelayError::malformed(
                url,
                format!(
                    "{} hyphen segments, need at least {} for cutoff {cutoff}",
                    parts.len(),
                    cutoff + 2
                ),
            ));
        }

        let kept = &parts[..parts.len() - cutoff];
        let base = self.base_for(url)?;
        Ok(format!(
            "{base}/property/{}/{}/",
            kept[1],
            kept[2..].join("-")
        ))
    }

    /// Resolve a batch of URLs at the same cutoff.
    pub fn resolve_all(&self, urls: &[String], cutoff: usize) -> Vec<Result<String>> {
        urls.iter().map(|url| self.resolve(url, cutoff)).collect()
    }

    fn base_for(&self, url: &str) -> Result<String> {
        if let Some(base) = &self.base_url {
            return Ok(base.clone());
        }
        let parsed = Url::parse(url).map_err(|e| RelayError::malformed(url, e.to_string()))?;
        let origin = parsed.origin();
        if !origin.is_tuple() {
            return Err(RelayError::malformed(url, "url has no origin"));
        }
        Ok(origin.ascii_serialization())
    }
}

/// Split a target URL into the vendor's `{domain, mls_id, address}` key.
///
/// The path must read `/<section>/<mls>/<address>`. Segments are
/// percent-decoded and address hyphens become spaces.
pub fn extract_key(target: &str) -> Result<ResolvedKey> {
    let parsed = Url::parse(target).map_err(|e| RelayError::malformed(target, e.to_string()))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| RelayError::malformed(target, "url has no host"))?;
    let domain = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let parts: Vec<&str> = parsed.path().trim_matches('/').split('/').collect();
    let (Some(mls_id), Some(address)) = (parts.get(1), parts.get(2)) else {
        return Err(RelayError::malformed(
            target,
            format!("path has {} segments, expected at least 3", parts.len()),
        ));
    };
    if mls_id.is_empty() || address.is_empty() {
        return Err(RelayError::malformed(target, "empty mls id or address"));
    }

    Ok(ResolvedKey {
        domain,
        mls_id: decode_segment(target, mls_id)?,
        address: decode_segment(target, address)?.replace('-', " "),
    })
}

/// `Url::path` is percent-encoded; the vendor query must carry the raw text.
fn decode_segment(target: &str, segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| RelayError::malformed(target, format!("path segment {segment}: {e}")))
}
