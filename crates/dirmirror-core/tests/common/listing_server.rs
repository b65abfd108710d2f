//! Minimal HTTP/1.1 server that serves a fixed route table for integration tests.
//!
//! Each route maps a request path (e.g. `/root.csv`) to a status and body.
//! Unknown paths get 404. Every request's path and header lines are recorded
//! so tests can assert what was (and was not) fetched.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    /// `Content-Length` to announce when it differs from the body (truncated response).
    pub declared_len: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: Vec<String>,
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Clone)]
pub struct ListingServer {
    base_url: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ListingServer {
    /// Starts a server in a background thread with no routes.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let server = ListingServer {
            base_url: format!("http://127.0.0.1:{}", port),
            routes: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let shared = server.clone();
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let s = shared.clone();
                thread::spawn(move || s.handle(stream));
            }
        });
        server
    }

    /// Base URL without trailing slash, e.g. `http://127.0.0.1:12345`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn ok(&self, path: &str, body: &[u8]) {
        self.route(path, 200, body);
    }

    pub fn route(&self, path: &str, status: u16, body: &[u8]) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status,
                body: body.to_vec(),
                declared_len: None,
            },
        );
    }

    /// Announces `declared_len` bytes but sends only `body`, then closes.
    pub fn truncated(&self, path: &str, declared_len: usize, body: &[u8]) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status: 200,
                body: body.to_vec(),
                declared_len: Some(declared_len),
            },
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    fn handle(&self, mut stream: TcpStream) {
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
        let mut data = Vec::new();
        let mut buf = [0u8; 8192];
        while !data.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => data.extend_from_slice(&buf[..n]),
            }
        }
        let request = match std::str::from_utf8(&data) {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut lines = request.lines();
        let path = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .unwrap_or("")
            .to_string();
        let headers: Vec<String> = lines
            .take_while(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .collect();
        self.requests.lock().unwrap().push(RecordedRequest {
            path: path.clone(),
            headers,
        });

        let route = self.routes.lock().unwrap().get(&path).cloned();
        let (status, body, declared_len) = match route {
            Some(r) => (r.status, r.body, r.declared_len),
            None => (404, Vec::new(), None),
        };
        let reason = match status {
            200 => "OK",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "Status",
        };
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            reason,
            declared_len.unwrap_or(body.len())
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
    }
}
