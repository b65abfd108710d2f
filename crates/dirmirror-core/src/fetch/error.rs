//! Error types for single transports and for the whole retrieval chain.

use std::io;
use std::process::ExitStatus;

/// Failure of one transport attempt. Everything except `Sink` lets the chain
/// move on to the next transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// libcurl refused to require TLS 1.2+ (old TLS backend).
    #[error("TLS 1.2 is not available: {0}")]
    TlsUnsupported(#[source] curl::Error),
    /// Resolution, connect, handshake or transfer error reported by libcurl.
    #[error("failed to make request: {0}")]
    Curl(#[from] curl::Error),
    /// Final response had a non-2xx status.
    #[error("HTTP GET error code: {0}")]
    Http(u32),
    /// External program could not be started (e.g. not installed).
    #[error("failed to run external client: {0}")]
    Spawn(#[source] io::Error),
    /// Reading the external program's output failed.
    #[error("failed to read external client output: {0}")]
    Pipe(#[source] io::Error),
    /// External program exited unsuccessfully.
    #[error("external client failed: {0}")]
    Exit(ExitStatus),
    /// Writing the body to the caller's sink failed. Never retried.
    #[error("write failed: {0}")]
    Sink(#[source] io::Error),
}

/// Outcome of a chain fetch that produced no body.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Every transport failed; the "no result" case.
    #[error("no transport could fetch {url}")]
    Exhausted { url: String },
    /// The local sink failed; the caller decides whether that is fatal.
    #[error("write failed: {0}")]
    Sink(#[source] io::Error),
}

impl FetchError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchError::Exhausted { .. })
    }
}
