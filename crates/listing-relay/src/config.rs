//! Relay configuration, loaded once per run and passed down explicitly.

use crate::error::{RelayError, Result};
use crate::extraction::field_mapper::FieldMapping;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "LISTING_RELAY_CONFIG";

const DEFAULT_WORKERS: usize = 10;
const DEFAULT_MAX_CUTOFF: usize = 6;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Paths of the three URL state logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub processed: PathBuf,
    pub unprocessed: PathBuf,
    pub unsaved: PathBuf,
}

/// Static process-wide settings for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub sitemap_url: String,
    pub sitemap_file: PathBuf,
    pub api_url: String,
    pub vendor_token: String,
    pub webform_url: String,
    pub logs: LogPaths,
    /// Maximum number of URLs processed in one run.
    pub max_scrap: usize,
    /// Output field -> vendor source key.
    pub api_extraction: FieldMapping,
    /// Base URL for resolved targets; the listing URL's origin when unset.
    pub site_url: Option<String>,
    pub workers: usize,
    pub max_cutoff: usize,
    pub request_timeout: Duration,
}

/// On-disk shape. Every field is optional so that a missing key can be
/// reported by name instead of as a generic serde error.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    sitemap_url: Option<String>,
    sitemap_file: Option<PathBuf>,
    api_url: Option<String>,
    vendor_token: Option<String>,
    webform_url: Option<String>,
    processed_urls: Option<PathBuf>,
    unprocessed_urls: Option<PathBuf>,
    unsaved_urls: Option<PathBuf>,
    max_scrap: Option<usize>,
    api_extraction: Option<FieldMapping>,
    site_url: Option<String>,
    workers: Option<usize>,
    max_cutoff: Option<usize>,
    request_timeout_secs: Option<u64>,
}

fn required<T>(value: Option<T>, key: &'static str) -> Result<T> {
    value.ok_or(RelayError::ConfigMissing(key))
}

impl Config {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RelayError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|e| RelayError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_value(value).map_err(|e| match e {
            RelayError::ConfigInvalid { message, .. } => RelayError::ConfigInvalid {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Build a config from an already parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawConfig =
            serde_json::from_value(value).map_err(|e| RelayError::ConfigInvalid {
                path: PathBuf::new(),
                message: e.to_string(),
            })?;

        let config = Self {
            sitemap_url: required(raw.sitemap_url, "sitemap_url")?,
            sitemap_file: required(raw.sitemap_file, "sitemap_file")?,
            api_url: required(raw.api_url, "api_url")?,
            vendor_token: required(raw.vendor_token, "vendor_token")?,
            webform_url: required(raw.webform_url, "webform_url")?,
            logs: LogPaths {
                processed: required(raw.processed_urls, "processed_urls")?,
                unprocessed: required(raw.unprocessed_urls, "unprocessed_urls")?,
                unsaved: required(raw.unsaved_urls, "unsaved_urls")?,
            },
            max_scrap: required(raw.max_scrap, "max_scrap")?,
            api_extraction: required(raw.api_extraction, "api_extraction")?,
            site_url: raw.site_url.map(|s| s.trim_end_matches('/').to_string()),
            workers: raw.workers.unwrap_or(DEFAULT_WORKERS).max(1),
            max_cutoff: raw.max_cutoff.unwrap_or(DEFAULT_MAX_CUTOFF),
            request_timeout: Duration::from_secs(
                raw.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        Ok(config)
    }

    /// Locate the config file: explicit path, then `LISTING_RELAY_CONFIG`,
    /// then `./config.json`, then `~/.listing-relay/config.json`.
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        let local = PathBuf::from("config.json");
        if local.exists() {
            return local;
        }
        dirs::home_dir()
            .map(|home| home.join(".listing-relay").join("config.json"))
            .unwrap_or(local)
    }
}
