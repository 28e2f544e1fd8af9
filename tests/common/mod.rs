//! Minimal HTTP/1.1 server for integration tests.
//!
//! Answers every connection with the same canned raw response and records
//! each request (head and body) it received.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub struct CannedServer {
    /// Base URL, e.g. `http://127.0.0.1:12345/`.
    pub base: String,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl CannedServer {
    /// Requests received so far, lossily decoded.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| String::from_utf8_lossy(r).into_owned())
            .collect()
    }
}

/// Build a response with `Content-Length` set from `body`.
pub fn response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// Starts a server in a background thread replying with `raw` verbatim.
/// The server runs until the process exits.
pub fn start(raw: Vec<u8>) -> CannedServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let raw = Arc::new(raw);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let raw = Arc::clone(&raw);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &raw, &seen));
        }
    });
    CannedServer {
        base: format!("http://127.0.0.1:{port}/"),
        requests,
    }
}

fn handle(mut stream: TcpStream, raw: &[u8], seen: &Mutex<Vec<Vec<u8>>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let request = read_request(&mut stream);
    seen.lock().unwrap().push(request);
    let _ = stream.write_all(raw);
    let _ = stream.flush();
}

/// Read the request head, then as much body as `Content-Length` announces
/// (or up to the terminating chunk for chunked uploads).
fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return data,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);
        let Some(head_end) = find(&data, b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&data[..head_end]).to_ascii_lowercase();
        let body_len = data.len() - (head_end + 4);
        if let Some(len) = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            if body_len >= len {
                return data;
            }
        } else if head.contains("transfer-encoding: chunked") {
            if data.ends_with(b"0\r\n\r\n") {
                return data;
            }
        } else {
            return data;
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
