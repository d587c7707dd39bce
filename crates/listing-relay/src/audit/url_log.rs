//! Append-only URL logs recording the outcome of every attempted URL.
//!
//! Each log is a plain text file with one URL per line. A URL containing a
//! comma, quote or line break is written as a quoted field with inner quotes
//! doubled, so files stay readable by any CSV tool. Writes to one log are
//! serialized by that log's mutex; different logs never block each other.

use crate::config::LogPaths;
use crate::error::{RelayError, Result};
use std::collections::HashSet;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// The three outcome categories, one log file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Extracted and accepted by the webform.
    Processed,
    /// Could not be resolved or extracted.
    Unprocessed,
    /// Extracted but rejected by the webform.
    Unsaved,
}

impl LogKind {
    pub const ALL: [LogKind; 3] = [Self::Processed, Self::Unprocessed, Self::Unsaved];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Unprocessed => "unprocessed",
            Self::Unsaved => "unsaved",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown log `{s}` (expected processed, unprocessed or unsaved)"))
    }
}

/// One log file plus the lock guarding writes to it.
#[derive(Debug)]
struct UrlLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl UrlLog {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn io_error(&self, source: std::io::Error) -> RelayError {
        RelayError::StateStoreIo {
            path: self.path.clone(),
            source,
        }
    }

    /// All URLs in file order. A missing file is an empty log.
    fn read(&self) -> Result<Vec<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(decode_records(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }
}

/// The processed, unprocessed and unsaved logs of one deployment.
#[derive(Debug)]
pub struct UrlStateStore {
    processed: UrlLog,
    unprocessed: UrlLog,
    unsaved: UrlLog,
}

impl UrlStateStore {
    pub fn new(paths: &LogPaths) -> Self {
        Self {
            processed: UrlLog::new(&paths.processed),
            unprocessed: UrlLog::new(&paths.unprocessed),
            unsaved: UrlLog::new(&paths.unsaved),
        }
    }

    fn log(&self, kind: LogKind) -> &UrlLog {
        match kind {
            LogKind::Processed => &self.processed,
            LogKind::Unprocessed => &self.unprocessed,
            LogKind::Unsaved => &self.unsaved,
        }
    }

    pub fn path(&self, kind: LogKind) -> &Path {
        &self.log(kind).path
    }

    /// Every URL in the log, as a set.
    pub fn load(&self, kind: LogKind) -> Result<HashSet<String>> {
        Ok(self.log(kind).read()?.into_iter().collect())
    }

    pub fn contains(&self, kind: LogKind, url: &str) -> Result<bool> {
        Ok(self.log(kind).read()?.iter().any(|u| u == url))
    }

    /// `urls` minus the members of the log, input order preserved.
    pub fn filter_unseen(&self, urls: &[String], kind: LogKind) -> Result<Vec<String>> {
        let seen = self.load(kind)?;
        Ok(urls.iter().filter(|u| !seen.contains(*u)).cloned().collect())
    }

    /// Append URLs, one per line, in a single write under the log's lock.
    pub fn append(&self, kind: LogKind, urls: &[String]) -> Result<()> {
        if urls.is_empty() {
            info!("no urls to save to the {kind} log");
            return Ok(());
        }

        let log = self.log(kind);
        let mut chunk = String::new();
        for url in urls {
            chunk.push_str(&encode_field(url));
            chunk.push('\n');
        }

        let _guard = log.lock();
        log.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log.path)
            .map_err(|e| log.io_error(e))?;
        file.write_all(chunk.as_bytes())
            .map_err(|e| log.io_error(e))?;
        debug!("appended {} url(s) to {}", urls.len(), log.path.display());
        Ok(())
    }

    /// Remove exactly one occurrence of `url` and rewrite the log.
    ///
    /// Fails with [`RelayError::NotLogged`] when the URL is absent.
    pub fn remove(&self, kind: LogKind, url: &str) -> Result<()> {
        let log = self.log(kind);
        let _guard = log.lock();

        let mut urls = log.read()?;
        let Some(index) = urls.iter().position(|u| u == url) else {
            return Err(RelayError::NotLogged {
                log: kind,
                url: url.to_string(),
            });
        };
        urls.remove(index);

        let mut text = String::new();
        for url in &urls {
            text.push_str(&encode_field(url));
            text.push('\n');
        }
        std::fs::write(&log.path, text).map_err(|e| log.io_error(e))?;
        Ok(())
    }
}

fn encode_field(url: &str) -> String {
    if url.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", url.replace('"', "\"\""))
    } else {
        url.to_string()
    }
}

/// First field of every non-blank record. Accepts `\n` and `\r\n` endings
/// and quoted fields that span lines.
fn decode_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_done = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '\n' => {
                if !field.is_empty() {
                    records.push(std::mem::take(&mut field));
                }
                field_done = false;
            }
            '\r' => {}
            _ if field_done => {}
            ',' => field_done = true,
            '"' if field.is_empty() => in_quotes = true,
            _ => field.push(c),
        }
    }
    if !field.is_empty() {
        records.push(field);
    }
    records
}
