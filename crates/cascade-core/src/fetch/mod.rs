//! Whole-body content fetching for metadata and API calls.
//!
//! Fetches an entire response body with transport retry, decompresses it per
//! `Content-Encoding`, and decodes it to text per the `Content-Type` charset.

mod decode;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;

use crate::retry::{run_with_retry, RetryPolicy, TransferError};

pub use decode::{decode_text, decompress};

/// Raw fetched response: undecoded body plus the headers needed to decode it.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_encoding: Option<String>,
    pub content_type: Option<String>,
}

/// Fetches `url` and returns the decompressed, charset-decoded body text.
pub fn fetch_text(
    url: &str,
    custom_headers: &HashMap<String, String>,
    policy: &RetryPolicy,
) -> Result<String> {
    let body = fetch_bytes(url, custom_headers, policy)?;
    let raw = decompress(body.content_encoding.as_deref(), body.bytes)
        .with_context(|| format!("failed to decompress response from {}", url))?;
    Ok(decode_text(body.content_type.as_deref(), &raw))
}

/// Fetches `url` with transport retry, returning the raw body and the
/// decoding-relevant headers. Advertises gzip/deflate support; decompression
/// is the caller's job (see [`fetch_text`]).
pub fn fetch_bytes(
    url: &str,
    custom_headers: &HashMap<String, String>,
    policy: &RetryPolicy,
) -> Result<FetchedBody> {
    run_with_retry(policy, || fetch_once(url, custom_headers))
        .with_context(|| format!("fetch failed for {}", url))
}

fn fetch_once(
    url: &str,
    custom_headers: &HashMap<String, String>,
) -> Result<FetchedBody, TransferError> {
    let mut bytes: Vec<u8> = Vec::new();
    let mut content_encoding: Option<String> = None;
    let mut content_type: Option<String> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(TransferError::Curl)?;
    easy.follow_location(true).map_err(TransferError::Curl)?;
    easy.max_redirections(10).map_err(TransferError::Curl)?;
    easy.connect_timeout(Duration::from_secs(15))
        .map_err(TransferError::Curl)?;
    easy.timeout(Duration::from_secs(120))
        .map_err(TransferError::Curl)?;

    let mut list = curl::easy::List::new();
    if !custom_headers
        .keys()
        .any(|k| k.eq_ignore_ascii_case("accept-encoding"))
    {
        list.append("Accept-Encoding: gzip, deflate")
            .map_err(TransferError::Curl)?;
    }
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(TransferError::Curl)?;
    }
    easy.http_headers(list).map_err(TransferError::Curl)?;

    {
        let bytes = &mut bytes;
        let content_encoding = &mut content_encoding;
        let content_type = &mut content_type;

        let mut transfer = easy.transfer();
        transfer
            .header_function(move |data| {
                if let Ok(line) = std::str::from_utf8(data) {
                    let line = line.trim();
                    if line.to_ascii_uppercase().starts_with("HTTP/") {
                        // New response block (redirect hop): earlier headers
                        // no longer apply.
                        *content_encoding = None;
                        *content_type = None;
                    } else if let Some((name, value)) = line.split_once(':') {
                        let name = name.trim();
                        if name.eq_ignore_ascii_case("content-encoding") {
                            *content_encoding = Some(value.trim().to_string());
                        } else if name.eq_ignore_ascii_case("content-type") {
                            *content_type = Some(value.trim().to_string());
                        }
                    }
                }
                true
            })
            .map_err(TransferError::Curl)?;
        transfer
            .write_function(move |data| {
                bytes.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(TransferError::Curl)?;
        transfer.perform().map_err(TransferError::Curl)?;
    }

    let code = easy.response_code().map_err(TransferError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }

    Ok(FetchedBody {
        bytes,
        content_encoding,
        content_type,
    })
}
