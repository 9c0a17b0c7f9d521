//! Filename extraction from URL path.

/// Extracts the last path segment from a URL for use as a filename hint,
/// percent-decoded.
///
/// Returns `None` if the URL cannot be parsed or the path has no usable
/// segment.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()?;
    if segment == "." || segment == ".." {
        return None;
    }
    let decoded = percent_encoding_decode(segment);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// Minimal percent-decoding for path segments; invalid escapes pass through.
fn percent_encoding_decode(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    let mut bytes = s.as_bytes().iter().copied();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let pair = [bytes.next(), bytes.next()];
            match pair {
                [Some(h), Some(l)] => {
                    let hex = [h, l];
                    match u8::from_str_radix(std::str::from_utf8(&hex).unwrap_or(""), 16) {
                        Ok(v) => out.push(v),
                        Err(_) => {
                            out.push(b'%');
                            out.extend_from_slice(&hex);
                        }
                    }
                }
                _ => out.push(b'%'),
            }
        } else {
            out.push(b);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
