//! Single ranged HTTP GET attempt appending to the part file.

use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;

use crate::retry::TransferError;
use crate::storage::PartFile;

/// ≈512 KiB body chunks.
const CHUNK_SIZE: usize = 512 * 1024;

/// Why a single request attempt stopped.
pub(super) enum AttemptError {
    /// Resumed offset + server-reported remaining disagreed with the probed
    /// total; the partial file must be discarded.
    Mismatch { reported: u64 },
    /// Transport or HTTP failure; bytes appended before the failure are kept.
    Transfer(TransferError),
}

impl From<TransferError> for AttemptError {
    fn from(e: TransferError) -> Self {
        AttemptError::Transfer(e)
    }
}

/// Issues one GET from `offset` (a `Range` request when `offset > 0`),
/// appending the body to `part` and reporting progress.
///
/// When resuming, the first body bytes trigger a consistency check:
/// `offset + remaining` (from `Content-Range`, else `Content-Length`) must
/// equal `probed_total`; on mismatch the response is aborted and
/// `AttemptError::Mismatch` returned. A server that ignores the `Range`
/// header and replies 200 with the full body fails this check and restarts
/// the transfer from zero.
///
/// Non-2xx responses are rejected before their body can touch the part file,
/// so an error page from a flaky server is never mistaken for content.
pub(super) fn ranged_attempt(
    url: &str,
    custom_headers: &HashMap<String, String>,
    offset: u64,
    probed_total: Option<u64>,
    part: &PartFile,
    progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<(), AttemptError> {
    let status: Cell<u32> = Cell::new(0);
    let remaining: Cell<Option<u64>> = Cell::new(None);
    let validated = Cell::new(false);
    let mismatch: Cell<Option<u64>> = Cell::new(None);
    let http_error: Cell<Option<u32>> = Cell::new(None);
    let storage_error: Cell<Option<std::io::Error>> = Cell::new(None);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(TransferError::Curl)?;
    easy.follow_location(true).map_err(TransferError::Curl)?;
    easy.max_redirections(10).map_err(TransferError::Curl)?;
    easy.buffer_size(CHUNK_SIZE).map_err(TransferError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(TransferError::Curl)?;
    // Low-speed timeout instead of a short wall-clock one: abort only when
    // throughput drops below 1 KiB/s for 60s.
    easy.low_speed_limit(1024).map_err(TransferError::Curl)?;
    easy.low_speed_time(Duration::from_secs(60))
        .map_err(TransferError::Curl)?;
    easy.timeout(Duration::from_secs(3600))
        .map_err(TransferError::Curl)?;

    if offset > 0 {
        easy.range(&format!("{}-", offset))
            .map_err(TransferError::Curl)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(TransferError::Curl)?;
    }
    if !custom_headers.is_empty() {
        easy.http_headers(list).map_err(TransferError::Curl)?;
    }

    {
        let part = part.clone();
        let status = &status;
        let remaining = &remaining;
        let validated = &validated;
        let mismatch = &mismatch;
        let http_error = &http_error;
        let storage_error = &storage_error;

        let mut transfer = easy.transfer();
        transfer
            .header_function(move |data| {
                if let Ok(line) = std::str::from_utf8(data) {
                    if let Some(code) = parse_status_code(line) {
                        status.set(code);
                    } else if let Some(r) = parse_remaining(line) {
                        remaining.set(Some(r));
                    }
                }
                true
            })
            .map_err(TransferError::Curl)?;
        transfer
            .write_function(move |data| {
                // Error-response bodies (e.g. a 503 page) must never reach
                // the part file: abort before the first append.
                let code = status.get();
                if !(200..300).contains(&code) {
                    http_error.set(Some(code));
                    return Ok(0);
                }
                if !validated.get() {
                    validated.set(true);
                    if offset > 0 {
                        if let (Some(total), Some(rem)) = (probed_total, remaining.get()) {
                            if offset + rem != total {
                                mismatch.set(Some(offset + rem));
                                return Ok(0); // abort this response
                            }
                        }
                    }
                }
                match part.append(data) {
                    Ok(()) => {
                        if let Some(cb) = progress {
                            cb(part.len(), probed_total);
                        }
                        Ok(data.len())
                    }
                    Err(e) => {
                        storage_error.set(Some(e));
                        Ok(0)
                    }
                }
            })
            .map_err(TransferError::Curl)?;

        if let Err(e) = transfer.perform() {
            if e.is_write_error() {
                if let Some(reported) = mismatch.get() {
                    return Err(AttemptError::Mismatch { reported });
                }
                if let Some(code) = http_error.get() {
                    return Err(TransferError::Http(code).into());
                }
                if let Some(io_err) = storage_error.take() {
                    return Err(TransferError::Storage(io_err).into());
                }
            }
            return Err(TransferError::Curl(e).into());
        }
    }

    let code = easy.response_code().map_err(TransferError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code).into());
    }

    Ok(())
}

/// Status code from an `HTTP/x.y NNN ...` status line, `None` for ordinary
/// header lines. Each redirect hop starts a new status line, so the last one
/// seen is the status of the response whose body follows.
fn parse_status_code(line: &str) -> Option<u32> {
    let line = line.trim();
    if !line.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("http/")) {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Bytes the server says are left in this response: `Content-Range`
/// `bytes start-end/total` yields `total - start`, else `Content-Length`.
fn parse_remaining(line: &str) -> Option<u64> {
    let (name, value) = line.trim().split_once(':')?;
    let name = name.trim();
    let value = value.trim();
    if name.eq_ignore_ascii_case("content-range") {
        let spec = value.strip_prefix("bytes").map(str::trim_start)?;
        let (range, total) = spec.split_once('/')?;
        let (start, _end) = range.split_once('-')?;
        let start = start.trim().parse::<u64>().ok()?;
        let total = total.trim().parse::<u64>().ok()?;
        Some(total.saturating_sub(start))
    } else if name.eq_ignore_ascii_case("content-length") {
        value.parse::<u64>().ok()
    } else {
        None
    }
}
