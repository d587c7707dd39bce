//! Error taxonomy shared by every stage of the relay.

use crate::audit::url_log::LogKind;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Everything that can go wrong between the sitemap and the webform.
///
/// Whether an error aborts a run depends on the stage that produced it, not
/// on the variant: anything raised while loading config or fetching and
/// parsing the sitemap aborts the run, anything raised while processing one
/// URL is recorded for that URL only.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("failed to decompress sitemap: {0}")]
    Decompress(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("malformed url {url}: {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("listing not found for {0}")]
    NotFound(String),

    #[error("webform rejected record with status {status}: {body}")]
    PostFailure { status: u16, body: String },

    #[error("missing required config key `{0}`")]
    ConfigMissing(&'static str),

    #[error("invalid config {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("state log {path}: {source}")]
    StateStoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{url} is not present in the {log} log")]
    NotLogged { log: LogKind, url: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RelayError {
    pub(crate) fn network(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl Into<String>) -> Self {
        Self::MalformedUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
