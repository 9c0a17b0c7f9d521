//! HTTP metadata probing.
//!
//! Issues a HEAD request (following redirects) to learn the expected total
//! size, filename hints, and the final post-redirect URL before a download
//! starts.

mod parse;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::str;
use std::time::Duration;

use crate::retry::{run_with_retry, RetryPolicy, TransferError};

/// Metadata needed to set up a download: size, filename hints, final URL.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Total size in bytes if `Content-Length` is present; `None` means the
    /// transfer is unbounded.
    pub content_length: Option<u64>,
    /// `Content-Type` value if present (extension hint).
    pub content_type: Option<String>,
    /// `Content-Disposition` value if present (filename hint).
    pub content_disposition: Option<String>,
    /// Final URL after redirects (filename hint).
    pub effective_url: String,
}

/// Performs a HEAD request with transport retry and returns parsed metadata.
///
/// Follows redirects. Optional custom headers can be passed (e.g. from a
/// resolver family).
pub fn probe(
    url: &str,
    custom_headers: &HashMap<String, String>,
    policy: &RetryPolicy,
) -> Result<ProbeResult> {
    run_with_retry(policy, || probe_once(url, custom_headers))
        .with_context(|| format!("probe failed for {}", url))
}

fn probe_once(
    url: &str,
    custom_headers: &HashMap<String, String>,
) -> Result<ProbeResult, TransferError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(TransferError::Curl)?;
    easy.nobody(true).map_err(TransferError::Curl)?; // HEAD request
    easy.follow_location(true).map_err(TransferError::Curl)?;
    easy.max_redirections(10).map_err(TransferError::Curl)?;
    easy.connect_timeout(Duration::from_secs(15))
        .map_err(TransferError::Curl)?;
    easy.timeout(Duration::from_secs(30))
        .map_err(TransferError::Curl)?;

    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(TransferError::Curl)?;
    }
    if !custom_headers.is_empty() {
        easy.http_headers(list).map_err(TransferError::Curl)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    headers.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(TransferError::Curl)?;
        transfer.perform().map_err(TransferError::Curl)?;
    }

    let code = easy.response_code().map_err(TransferError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }

    let effective_url = easy
        .effective_url()
        .ok()
        .flatten()
        .unwrap_or(url)
        .to_string();

    Ok(parse::parse_headers(&headers, effective_url))
}
