//! Retrieval layer: a single HTTP GET, tried through an ordered chain of
//! transports until one succeeds.
//!
//! The first transport is libcurl in-process with TLS 1.2 required; the
//! second shells out to a command-line client for hosts whose TLS stack
//! cannot satisfy that. Failures are logged and collapse into "no result".

mod error;
mod external;
mod native;

pub use error::{FetchError, TransportError};
pub use external::ExternalTransport;
pub use native::NativeTransport;

use crate::config::MirrorConfig;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::sync::OnceLock;

static USER_AGENT: OnceLock<String> = OnceLock::new();

/// Identifying user agent, computed once per process.
pub fn user_agent() -> &'static str {
    USER_AGENT.get_or_init(|| {
        format!(
            "tis/dirmirror_{}--libcurl/{}",
            env!("CARGO_PKG_VERSION"),
            curl::Version::get().version()
        )
    })
}

/// One GET: URL plus the headers every transport must send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: &str, user_agent: &str, token: Option<&str>) -> Self {
        let mut headers = vec![("User-Agent".to_string(), user_agent.to_string())];
        if let Some(tok) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", tok)));
        }
        Self {
            url: url.to_string(),
            headers,
        }
    }

    /// Headers as `Name: value` lines.
    pub fn header_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.headers
            .iter()
            .map(|(k, v)| format!("{}: {}", k.trim(), v.trim()))
    }
}

/// Destination for a response body that can be emptied before a retry.
pub trait Sink: Write {
    /// Discard everything written so far.
    fn reset(&mut self) -> io::Result<()>;
}

impl Sink for File {
    fn reset(&mut self) -> io::Result<()> {
        self.set_len(0)?;
        self.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

impl Sink for Vec<u8> {
    fn reset(&mut self) -> io::Result<()> {
        self.clear();
        Ok(())
    }
}

/// A way of performing one GET and streaming its body into a sink.
pub trait Transport: Send + Sync {
    /// Short label used in diagnostics.
    fn name(&self) -> &str;

    /// Performs the GET and returns the number of body bytes written.
    fn get(&self, request: &FetchRequest, sink: &mut dyn Sink) -> Result<u64, TransportError>;
}

/// Ordered transports tried until one succeeds.
pub struct RetrievalChain {
    transports: Vec<Box<dyn Transport>>,
    user_agent: String,
}

impl RetrievalChain {
    pub fn new(transports: Vec<Box<dyn Transport>>) -> Self {
        Self {
            transports,
            user_agent: user_agent().to_string(),
        }
    }

    /// Native transport first, then the configured external client unless
    /// `allow_fallback` is false or the config disables it.
    pub fn from_config(cfg: &MirrorConfig, allow_fallback: bool) -> Self {
        let mut transports: Vec<Box<dyn Transport>> = vec![Box::new(NativeTransport::new(cfg))];
        if allow_fallback {
            if let Some(program) = cfg.fallback_program() {
                transports.push(Box::new(ExternalTransport::new(program)));
            }
        }
        let chain = Self::new(transports);
        match cfg.user_agent.as_deref() {
            Some(ua) => chain.with_user_agent(ua),
            None => chain,
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn transport_names(&self) -> Vec<&str> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    pub fn request(&self, url: &str, token: Option<&str>) -> FetchRequest {
        FetchRequest::new(url, &self.user_agent, token)
    }

    /// Streams the body of `url` into `sink`.
    ///
    /// The sink is reset before every fallback attempt so a failed partial
    /// transfer never leaks into the final content. When every transport
    /// fails the sink is left empty.
    pub fn fetch_into(
        &self,
        url: &str,
        token: Option<&str>,
        sink: &mut dyn Sink,
    ) -> Result<u64, FetchError> {
        let request = self.request(url, token);
        for (i, transport) in self.transports.iter().enumerate() {
            if i > 0 {
                tracing::warn!("trying {} for {}", transport.name(), request.url);
                sink.reset().map_err(FetchError::Sink)?;
            }
            match transport.get(&request, sink) {
                Ok(n) => {
                    tracing::debug!(transport = transport.name(), bytes = n, "GET {}", request.url);
                    return Ok(n);
                }
                Err(TransportError::Sink(e)) => return Err(FetchError::Sink(e)),
                Err(e) => {
                    tracing::warn!("{}: {} ({})", transport.name(), e, request.url);
                }
            }
        }
        // A transfer that died midway may have written some bytes; an empty
        // file is what marks it for download on the next run.
        sink.reset().map_err(FetchError::Sink)?;
        Err(FetchError::Exhausted {
            url: request.url,
        })
    }

    /// Fetches `url` and decodes the body as UTF-8. `None` when every transport
    /// failed or the body is not text.
    pub fn fetch_text(&self, url: &str, token: Option<&str>) -> Option<String> {
        let mut body: Vec<u8> = Vec::new();
        match self.fetch_into(url, token, &mut body) {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("{}", e);
                return None;
            }
        }
        match String::from_utf8(body) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("response from {} is not UTF-8: {}", url, e);
                None
            }
        }
    }
}
