//! Minimal HTTP/1.1 server with HEAD, Range GET, and fault injection for
//! integration tests.
//!
//! Serves a single static body. Faults: truncate the first GET mid-body
//! (connection drop), report an inconsistent total on resumed requests
//! (stale-partial detection), omit Content-Length (unbounded transfers).

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Omit Content-Length everywhere (unbounded transfer).
    pub no_length: bool,
    /// Omit Content-Length on HEAD only; GETs still advertise it (unbounded
    /// transfer whose mid-stream drop is detectable).
    pub no_length_head: bool,
    /// Close the connection after this many body bytes on the first GET.
    pub truncate_first_get_after: Option<u64>,
    /// Report this total (instead of the real one) on ranged requests with a
    /// non-zero offset.
    pub lie_total_on_resume: Option<u64>,
    /// Answer the first N GETs with this HTTP status and an HTML error page
    /// instead of the body.
    pub error_status_gets: Option<(u16, usize)>,
    /// Extra response headers (e.g. Content-Disposition, Content-Encoding).
    pub extra_headers: Vec<(String, String)>,
}

/// Request counters, shared with the test.
#[derive(Debug, Default)]
pub struct Hits {
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
    pub ranged_gets: AtomicUsize,
}

pub struct ServerHandle {
    pub url: String,
    pub hits: Arc<Hits>,
}

/// Starts a server in a background thread serving `body`. Returns the base
/// URL (e.g. "http://127.0.0.1:12345/"). The server runs until the process
/// exits.
pub fn start(body: Vec<u8>) -> ServerHandle {
    start_with_options(body, ServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> ServerHandle {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let hits = Arc::new(Hits::default());
    let hits_srv = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = opts.clone();
            let hits = Arc::clone(&hits_srv);
            thread::spawn(move || handle(stream, &body, &opts, &hits));
        }
    });
    ServerHandle {
        url: format!("http://127.0.0.1:{}/data.bin", port),
        hits,
    }
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: &ServerOptions, hits: &Hits) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    let total = body.len() as u64;

    let extra: String = opts
        .extra_headers
        .iter()
        .map(|(k, v)| format!("{}: {}\r\n", k, v))
        .collect();

    if method.eq_ignore_ascii_case("HEAD") {
        hits.heads.fetch_add(1, Ordering::SeqCst);
        let length = if opts.no_length || opts.no_length_head {
            String::new()
        } else {
            format!("Content-Length: {}\r\n", total)
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\n{}{}Connection: close\r\n\r\n",
            length, extra
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if method.eq_ignore_ascii_case("GET") {
        let get_index = hits.gets.fetch_add(1, Ordering::SeqCst);

        // Error-status fault: serve an HTML error page instead of the body.
        if let Some((code, count)) = opts.error_status_gets {
            if get_index < count {
                let page = b"<html>Service Unavailable</html>";
                let response = format!(
                    "HTTP/1.1 {} Error\r\nContent-Length: {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n",
                    code,
                    page.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.write_all(page);
                return;
            }
        }

        let start = match range {
            Some((start, _)) => {
                hits.ranged_gets.fetch_add(1, Ordering::SeqCst);
                start.min(total)
            }
            None => 0,
        };

        // Inconsistent-total fault: resumed requests see a different total.
        if let Some(lied_total) = opts.lie_total_on_resume {
            if start > 0 {
                let remaining = lied_total.saturating_sub(start);
                let response = format!(
                    "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\n{}Connection: close\r\n\r\n",
                    remaining,
                    start,
                    lied_total.saturating_sub(1),
                    lied_total,
                    extra
                );
                let _ = stream.write_all(response.as_bytes());
                // A few bytes so the client reaches its consistency check.
                let slice = body.get(start as usize..).unwrap_or(&[]);
                let _ = stream.write_all(&slice[..slice.len().min(1024)]);
                return;
            }
        }

        let slice = &body[start as usize..];
        let (status, range_header) = if start > 0 {
            (
                "206 Partial Content",
                format!(
                    "Content-Range: bytes {}-{}/{}\r\n",
                    start,
                    total.saturating_sub(1),
                    total
                ),
            )
        } else {
            ("200 OK", String::new())
        };
        let length = if opts.no_length {
            String::new()
        } else {
            format!("Content-Length: {}\r\n", slice.len())
        };
        let response = format!(
            "HTTP/1.1 {}\r\n{}{}{}Connection: close\r\n\r\n",
            status, length, range_header, extra
        );
        let _ = stream.write_all(response.as_bytes());

        // Drop fault: close mid-body on the very first GET.
        if get_index == 0 {
            if let Some(cut) = opts.truncate_first_get_after {
                let cut = (cut as usize).min(slice.len());
                let _ = stream.write_all(&slice[..cut]);
                return;
            }
        }
        let _ = stream.write_all(slice);
        return;
    }

    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
}

/// Returns (method, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, b)) = part.trim().split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
