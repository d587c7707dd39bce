//! listing-relay: sitemap-driven relay from public listing pages to a webform.
//!
//! A run downloads a gzipped sitemap, selects the URLs that match the
//! requested dates and have not been handled before, resolves each one
//! against the vendor listing API, maps the listing onto the webform's
//! fields and posts it. Every attempted URL ends up in exactly one of three
//! flat-file logs (processed, unprocessed, unsaved), which is what keeps
//! repeated runs idempotent.

pub mod acquisition;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod pipeline;
pub mod resolution;

pub use config::Config;
pub use error::{RelayError, Result};
