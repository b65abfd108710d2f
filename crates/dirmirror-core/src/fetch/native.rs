//! In-process GET over libcurl with TLS 1.2 as the floor.

use super::{FetchRequest, Sink, Transport, TransportError};
use crate::config::MirrorConfig;
use curl::easy::{Easy, List, SslVersion};
use std::io;
use std::time::Duration;

/// libcurl transport. A fresh `Easy` handle is built per request.
#[derive(Debug, Clone)]
pub struct NativeTransport {
    connect_timeout: Duration,
    timeout: Duration,
    low_speed_limit: u32,
    low_speed_time: Duration,
    max_redirections: u32,
}

impl NativeTransport {
    pub fn new(cfg: &MirrorConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            low_speed_limit: cfg.low_speed_limit,
            low_speed_time: cfg.low_speed_time(),
            max_redirections: cfg.max_redirections,
        }
    }

    fn configure(&self, easy: &mut Easy, request: &FetchRequest) -> Result<(), TransportError> {
        // Refusal here means the TLS backend is too old; nothing has been sent yet.
        easy.ssl_min_max_version(SslVersion::Tlsv12, SslVersion::Default)
            .map_err(TransportError::TlsUnsupported)?;

        easy.url(&request.url)?;
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.max_redirections)?;
        // Empty path turns on the cookie engine without reading a file; login
        // redirects set a session cookie that must survive the hops.
        easy.cookie_file("")?;
        // Error pages must not end up in the sink.
        easy.fail_on_error(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(self.low_speed_limit)?;
        easy.low_speed_time(self.low_speed_time)?;
        easy.timeout(self.timeout)?;

        let mut list = List::new();
        for line in request.header_lines() {
            list.append(&line)?;
        }
        easy.http_headers(list)?;
        Ok(())
    }
}

impl Transport for NativeTransport {
    fn name(&self) -> &str {
        "native"
    }

    fn get(&self, request: &FetchRequest, sink: &mut dyn Sink) -> Result<u64, TransportError> {
        let mut easy = Easy::new();
        self.configure(&mut easy, request)?;

        let mut written: u64 = 0;
        let mut sink_error: Option<io::Error> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match sink.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    sink_error = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        };

        if let Some(e) = sink_error {
            return Err(TransportError::Sink(e));
        }
        if let Err(e) = performed {
            if e.is_http_returned_error() {
                let code = easy.response_code().unwrap_or(0);
                return Err(TransportError::Http(code));
            }
            return Err(TransportError::Curl(e));
        }

        let code = easy.response_code()?;
        // file:// and similar report 0.
        if code != 0 && !(200..300).contains(&code) {
            return Err(TransportError::Http(code));
        }
        Ok(written)
    }
}
