//! Last-resort transport: a command-line HTTP client run as a child process.
//!
//! Used when libcurl in this process cannot negotiate TLS 1.2 or the request
//! failed outright. The child's stdout is the response body.

use super::{FetchRequest, Sink, Transport, TransportError};
use std::io::Read;
use std::process::{Child, Command, Stdio};

const BUF_SIZE: usize = 64 * 1024;

/// Runs `<program> --fail -sS -L -b session --get <url> -H ...`.
#[derive(Debug, Clone)]
pub struct ExternalTransport {
    program: String,
}

impl ExternalTransport {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the client for `request`, in order.
    pub fn command_args(request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = ["--fail", "-sS", "-L", "-b", "session", "--get"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(request.url.clone());
        for line in request.header_lines() {
            args.push("-H".to_string());
            args.push(line);
        }
        args
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl Transport for ExternalTransport {
    fn name(&self) -> &str {
        &self.program
    }

    fn get(&self, request: &FetchRequest, sink: &mut dyn Sink) -> Result<u64, TransportError> {
        let mut child = Command::new(&self.program)
            .args(Self::command_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(TransportError::Spawn)?;

        let mut written: u64 = 0;
        if let Some(mut stdout) = child.stdout.take() {
            let mut buf = vec![0u8; BUF_SIZE];
            loop {
                let n = match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        reap(&mut child);
                        return Err(TransportError::Pipe(e));
                    }
                };
                if let Err(e) = sink.write_all(&buf[..n]) {
                    reap(&mut child);
                    return Err(TransportError::Sink(e));
                }
                written += n as u64;
            }
        }

        let status = child.wait().map_err(TransportError::Pipe)?;
        if !status.success() {
            return Err(TransportError::Exit(status));
        }
        sink.flush().map_err(TransportError::Sink)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_args_carry_url_and_headers() {
        let req = FetchRequest::new("https://example.com/data.csv", "ua/1", Some("tok"));
        let args = ExternalTransport::command_args(&req);
        assert_eq!(
            args,
            vec![
                "--fail",
                "-sS",
                "-L",
                "-b",
                "session",
                "--get",
                "https://example.com/data.csv",
                "-H",
                "User-Agent: ua/1",
                "-H",
                "Authorization: Bearer tok",
            ]
        );
    }

    #[test]
    fn name_is_program() {
        assert_eq!(ExternalTransport::new("curl").name(), "curl");
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let t = ExternalTransport::new("dirmirror-no-such-client");
        let req = FetchRequest::new("https://example.com/", "ua", None);
        let mut sink: Vec<u8> = Vec::new();
        let err = t.get(&req, &mut sink).unwrap_err();
        assert!(matches!(err, TransportError::Spawn(_)));
    }

    #[cfg(unix)]
    #[test]
    fn stdout_becomes_body_and_exit_status_is_checked() {
        // `echo` ignores the curl flags and prints them, which is enough to
        // see stdout streamed into the sink.
        let t = ExternalTransport::new("echo");
        let req = FetchRequest::new("https://example.com/x", "ua", None);
        let mut sink: Vec<u8> = Vec::new();
        let n = t.get(&req, &mut sink).unwrap();
        assert_eq!(n as usize, sink.len());
        let out = String::from_utf8(sink).unwrap();
        assert!(out.contains("https://example.com/x"));

        let t = ExternalTransport::new("false");
        let mut sink: Vec<u8> = Vec::new();
        let err = t.get(&req, &mut sink).unwrap_err();
        assert!(matches!(err, TransportError::Exit(_)));
    }
}
