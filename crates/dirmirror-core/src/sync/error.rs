//! Fatal traversal errors. Any of these ends the whole run.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Neither `<url>.csv` nor `<url>.json` could be fetched and parsed.
    #[error("neither CSV nor JSON index available at: {url}")]
    IndexUnavailable { url: String },
    #[error("mkdir `{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("open `{}': {source}", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write `{}': {source}", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stat `{}': {source}", .path.display())]
    Inspect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Process exit status for this error: 1 for a missing index, -1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::IndexUnavailable { .. } => 1,
            _ => -1,
        }
    }
}
