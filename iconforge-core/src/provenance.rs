//! Provenance Resolver
//!
//! The "first introduced" instant of an icon file: the oldest `git` add
//! event when history is available, the file's mtime otherwise. Date and
//! epoch milliseconds always come from the same instant.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::debug;

use crate::process::run_with_timeout;

pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceSource {
    History,
    Filesystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    pub added_date: NaiveDate,
    pub added_ts: i64,
    #[serde(skip)]
    pub source: Option<ProvenanceSource>,
}

impl ProvenanceRecord {
    pub fn from_instant(instant: DateTime<Utc>, source: ProvenanceSource) -> Self {
        Self {
            added_date: instant.date_naive(),
            added_ts: instant.timestamp_millis(),
            source: Some(source),
        }
    }
}

/// Version-history lookup. `None` means "no answer", never an error.
pub trait HistorySource: Send + Sync {
    fn name(&self) -> &'static str;
    fn first_added(&self, path: &Path) -> Option<DateTime<FixedOffset>>;
}

/// Environments without version history.
pub struct NoHistory;

impl HistorySource for NoHistory {
    fn name(&self) -> &'static str { "none" }

    fn first_added(&self, _path: &Path) -> Option<DateTime<FixedOffset>> {
        None
    }
}

/// `git log --diff-filter=A --follow --format=%aI -- <file>`, oldest entry.
pub struct GitHistory {
    timeout: Duration,
}

impl GitHistory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn query(&self, path: &Path) -> io::Result<Option<String>> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut command = Command::new("git");
        command
            .args(["log", "--diff-filter=A", "--follow", "--format=%aI", "--"])
            .arg(path.file_name().unwrap_or(path.as_os_str()))
            .current_dir(dir);
        let output = run_with_timeout(&mut command, self.timeout)?;

        if !output.status.success() {
            return Ok(None);
        }

        // Newest first; the last line is the first add.
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(str::to_string))
    }
}

impl Default for GitHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_TIMEOUT)
    }
}

impl HistorySource for GitHistory {
    fn name(&self) -> &'static str { "git" }

    fn first_added(&self, path: &Path) -> Option<DateTime<FixedOffset>> {
        match self.query(path) {
            Ok(Some(line)) => match DateTime::parse_from_rfc3339(&line) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    debug!(path = %path.display(), line = %line, error = %e, "unparsable git timestamp");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "git history unavailable");
                None
            }
        }
    }
}

pub struct ProvenanceResolver {
    history: Box<dyn HistorySource>,
}

impl ProvenanceResolver {
    pub fn new(history: Box<dyn HistorySource>) -> Self {
        Self { history }
    }

    pub fn git(timeout: Duration) -> Self {
        Self::new(Box::new(GitHistory::new(timeout)))
    }

    pub fn filesystem_only() -> Self {
        Self::new(Box::new(NoHistory))
    }

    /// Only a failed `stat` of the file itself is an error.
    pub fn resolve(&self, path: &Path) -> io::Result<ProvenanceRecord> {
        if let Some(added) = self.history.first_added(path) {
            return Ok(ProvenanceRecord::from_instant(
                added.with_timezone(&Utc),
                ProvenanceSource::History,
            ));
        }

        let modified = std::fs::metadata(path)?.modified()?;
        debug!(path = %path.display(), history = self.history.name(), "provenance from mtime");
        Ok(ProvenanceRecord::from_instant(
            DateTime::<Utc>::from(modified),
            ProvenanceSource::Filesystem,
        ))
    }
}

impl Default for ProvenanceResolver {
    fn default() -> Self {
        Self::git(DEFAULT_HISTORY_TIMEOUT)
    }
}
