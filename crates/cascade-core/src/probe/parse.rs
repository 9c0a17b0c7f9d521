//! Parse HTTP response header lines into ProbeResult fields.

use super::ProbeResult;

/// Parse collected header lines. Each `HTTP/` status line starts a new
/// response block (redirect hops), so only the final response's headers
/// survive.
pub(crate) fn parse_headers(lines: &[String], effective_url: String) -> ProbeResult {
    let mut result = ProbeResult {
        content_length: None,
        content_type: None,
        content_disposition: None,
        effective_url,
    };

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.to_ascii_uppercase().starts_with("HTTP/") {
            result.content_length = None;
            result.content_type = None;
            result.content_disposition = None;
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                result.content_length = value.parse::<u64>().ok();
            } else if name.eq_ignore_ascii_case("content-type") {
                result.content_type = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("content-disposition") {
                result.content_disposition = Some(value.to_string());
            }
        }
    }

    result
}
