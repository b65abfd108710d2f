//! Recursive mirror of a remote indexed directory onto a local one.
//!
//! Depth-first and strictly sequential: each directory's index is fetched,
//! subdirectories (size 0) are created and descended into before the next
//! sibling, and files are downloaded only when missing or empty locally.
//! Local filesystem errors abort the whole run.

mod error;

pub use error::SyncError;

use crate::entry_name::validate_entry_name;
use crate::fetch::{FetchError, RetrievalChain};
use crate::listing::{fetch_listing, ListingEntry};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// One directory level to mirror: remote listing URL, local directory, token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub source: String,
    pub destination: PathBuf,
    pub token: Option<String>,
}

impl SyncJob {
    pub fn new(source: &str, destination: &Path, token: Option<&str>) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_path_buf(),
            token: token.map(str::to_string),
        }
    }

    /// Job for the child directory `name` (already validated).
    pub fn child(&self, name: &str) -> Self {
        Self {
            source: child_url(&self.source, name),
            destination: self.destination.join(name),
            token: self.token.clone(),
        }
    }
}

/// True when `name` can go into a URL path as-is: only unreserved and
/// sub-delim characters, with every `%` starting a valid escape.
fn is_url_safe_segment(name: &str) -> bool {
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escape = bytes.get(i + 1..i + 3);
                if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return false;
                }
                i += 3;
                continue;
            }
            b if b.is_ascii_alphanumeric() => {}
            b'-' | b'.' | b'_' | b'~' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*'
            | b'+' | b',' | b';' | b'=' | b':' | b'@' => {}
            _ => return false,
        }
        i += 1;
    }
    true
}

/// `<parent>/<name>`. A name that is already URL-safe (including one carrying
/// `%XX` escapes) is appended verbatim; anything else is percent-encoded as a
/// single path segment.
pub fn child_url(parent: &str, name: &str) -> String {
    if !is_url_safe_segment(name) {
        if let Ok(mut url) = url::Url::parse(parent) {
            let pushed = url
                .path_segments_mut()
                .map(|mut segments| {
                    segments.pop_if_empty().push(name);
                })
                .is_ok();
            if pushed {
                return url.to_string();
            }
        }
    }
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Progress notifications, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    CreatingDir(PathBuf),
    Downloading(PathBuf),
    Skipping(PathBuf),
    /// Every transport failed; the file is left empty for the next run.
    DownloadFailed(PathBuf),
    /// Entry name would escape its directory; nothing was created.
    Rejected(String),
}

/// Counters for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub dirs_created: usize,
    pub dirs_reused: usize,
    pub files_downloaded: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub entries_rejected: usize,
    pub bytes_downloaded: u64,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded ({} bytes), {} skipped, {} failed, {} dirs created, {} dirs reused, {} rejected",
            self.files_downloaded,
            self.bytes_downloaded,
            self.files_skipped,
            self.files_failed,
            self.dirs_created,
            self.dirs_reused,
            self.entries_rejected
        )
    }
}

/// Runs sync jobs against a retrieval chain.
pub struct Syncer {
    chain: RetrievalChain,
}

impl Syncer {
    pub fn new(chain: RetrievalChain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &RetrievalChain {
        &self.chain
    }

    /// Mirrors `job` without progress notifications.
    pub fn sync(&self, job: &SyncJob) -> Result<SyncReport, SyncError> {
        self.sync_with(job, &mut |_| {})
    }

    /// Mirrors `job`, calling `on_event` for every entry handled.
    pub fn sync_with(
        &self,
        job: &SyncJob,
        on_event: &mut dyn FnMut(&SyncEvent),
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        self.sync_dir(job, &mut report, on_event)?;
        tracing::info!("sync of {} finished: {}", job.source, report);
        Ok(report)
    }

    fn sync_dir(
        &self,
        job: &SyncJob,
        report: &mut SyncReport,
        on_event: &mut dyn FnMut(&SyncEvent),
    ) -> Result<(), SyncError> {
        let token = job.token.as_deref();
        let entries = fetch_listing(&self.chain, &job.source, token).ok_or_else(|| {
            SyncError::IndexUnavailable {
                url: job.source.clone(),
            }
        })?;
        tracing::debug!("{} entries under {}", entries.len(), job.source);

        for entry in &entries {
            if let Err(reason) = validate_entry_name(&entry.name) {
                tracing::warn!("rejecting entry {:?} under {}: {}", entry.name, job.source, reason);
                report.entries_rejected += 1;
                on_event(&SyncEvent::Rejected(entry.name.clone()));
                continue;
            }

            let child = job.child(&entry.name);
            if entry.is_dir() {
                self.enter_dir(&child, report, on_event)?;
            } else {
                self.sync_file(&child, entry, report, on_event)?;
            }
        }
        Ok(())
    }

    fn enter_dir(
        &self,
        child: &SyncJob,
        report: &mut SyncReport,
        on_event: &mut dyn FnMut(&SyncEvent),
    ) -> Result<(), SyncError> {
        let path = &child.destination;
        on_event(&SyncEvent::CreatingDir(path.clone()));
        match fs::create_dir(path) {
            Ok(()) => {
                tracing::info!("created dir {}", path.display());
                report.dirs_created += 1;
            }
            // Resumed runs see their own directories again.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {
                tracing::debug!("dir exists {}", path.display());
                report.dirs_reused += 1;
            }
            Err(source) => {
                return Err(SyncError::CreateDir {
                    path: path.clone(),
                    source,
                })
            }
        }
        self.sync_dir(child, report, on_event)
    }

    fn sync_file(
        &self,
        child: &SyncJob,
        entry: &ListingEntry,
        report: &mut SyncReport,
        on_event: &mut dyn FnMut(&SyncEvent),
    ) -> Result<(), SyncError> {
        let path = &child.destination;
        if !needs_download(path)? {
            tracing::debug!("skipping {}", path.display());
            report.files_skipped += 1;
            on_event(&SyncEvent::Skipping(path.clone()));
            return Ok(());
        }

        on_event(&SyncEvent::Downloading(path.clone()));
        tracing::info!("downloading {} ({} bytes) from {}", path.display(), entry.size, child.source);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| SyncError::OpenFile {
                path: path.clone(),
                source,
            })?;

        match self
            .chain
            .fetch_into(&child.source, child.token.as_deref(), &mut file)
        {
            Ok(n) => {
                report.files_downloaded += 1;
                report.bytes_downloaded += n;
            }
            Err(FetchError::Sink(source)) => {
                return Err(SyncError::WriteFile {
                    path: path.clone(),
                    source,
                })
            }
            Err(e @ FetchError::Exhausted { .. }) => {
                tracing::warn!("{}; {} left empty", e, path.display());
                report.files_failed += 1;
                on_event(&SyncEvent::DownloadFailed(path.clone()));
            }
        }
        Ok(())
    }
}

/// True when `path` does not exist or is empty.
fn needs_download(path: &Path) -> Result<bool, SyncError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(source) => Err(SyncError::Inspect {
            path: path.to_path_buf(),
            source,
        }),
    }
}
