//! Minimal HTTP/1.1 server that answers HEAD with scripted status codes.
//!
//! Each request pops the next status from the script; once the script is
//! exhausted every request gets `then`. Success responses carry a fixed
//! Content-Length so callers can check what the probe parsed.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const CONTENT_LENGTH: u64 = 4096;

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusServerOptions {
    /// Sleep before answering (simulates a slow upstream).
    pub delay: Option<Duration>,
}

pub struct StatusServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/".
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl StatusServer {
    /// Requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(script: &[u16], then: u16) -> StatusServer {
    start_with_options(script, then, StatusServerOptions::default())
}

pub fn start_with_options(script: &[u16], then: u16, opts: StatusServerOptions) -> StatusServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let script = Arc::new(Mutex::new(script.iter().copied().collect::<VecDeque<u16>>()));
    let hits = Arc::new(AtomicUsize::new(0));
    let server_hits = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let script = Arc::clone(&script);
            let hits = Arc::clone(&server_hits);
            thread::spawn(move || handle(stream, &script, then, &hits, opts));
        }
    });
    StatusServer {
        url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

/// A URL on a port nothing listens on.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

fn handle(
    mut stream: TcpStream,
    script: &Mutex<VecDeque<u16>>,
    then: u16,
    hits: &AtomicUsize,
    opts: StatusServerOptions,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }
    hits.fetch_add(1, Ordering::SeqCst);
    let status = script.lock().unwrap().pop_front().unwrap_or(then);
    if let Some(delay) = opts.delay {
        thread::sleep(delay);
    }
    let response = if (200..300).contains(&status) {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            reason(status),
            CONTENT_LENGTH
        )
    } else {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status,
            reason(status)
        )
    };
    let _ = stream.write_all(response.as_bytes());
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
