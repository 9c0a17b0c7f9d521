//! Content-Disposition header parsing (filename and filename*).

/// Extracts the filename from a raw Content-Disposition header value.
///
/// Supports `filename="value"` (quoted), `filename=value` (token), and
/// `filename*=UTF-8''percent-encoded` (RFC 5987). When both forms are
/// present, `filename*` wins.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut filename_from_token: Option<String> = None;

    for param in header_value.trim().split(';') {
        let Some((name, v)) = param.trim().split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let v = v.trim();

        if name == "filename*" {
            if let Some(rest) = v.strip_prefix("utf-8''").or_else(|| v.strip_prefix("UTF-8''")) {
                let decoded = unescape_quoted(&percent_decode(rest));
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        }

        if name == "filename" {
            let unquoted = if v.starts_with('"') && v.ends_with('"') && v.len() >= 2 {
                unescape_quoted(&v[1..v.len() - 1])
            } else {
                v.to_string()
            };
            if !unquoted.is_empty() {
                filename_from_token = Some(unquoted);
            }
        }
    }

    filename_from_token
}

/// Decode backslash-escaped quotes and backslashes in a quoted-string value.
fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if matches!(chars.peek(), Some('"') | Some('\\')) {
                out.push(chars.next().unwrap());
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Percent-decode for the filename* value (RFC 5987). Malformed escapes are
/// passed through literally.
fn percent_decode(input: &str) -> String {
    let mut out = Vec::new();
    let mut bytes = input.as_bytes().iter().copied();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let h = bytes.next().and_then(hex_digit);
            let l = bytes.next().and_then(hex_digit);
            match (h, l) {
                (Some(high), Some(low)) => out.push(high << 4 | low),
                _ => out.push(b'%'),
            }
        } else {
            out.push(b);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quoted() {
        let r = parse_content_disposition_filename("attachment; filename=\"subtitles.xml\"");
        assert_eq!(r.as_deref(), Some("subtitles.xml"));
    }

    #[test]
    fn parse_token() {
        let r = parse_content_disposition_filename("attachment; filename=plain.bin");
        assert_eq!(r.as_deref(), Some("plain.bin"));
    }

    #[test]
    fn parse_filename_star_utf8() {
        let r = parse_content_disposition_filename("attachment; filename*=UTF-8''caf%C3%A9.txt");
        assert_eq!(r.as_deref(), Some("café.txt"));
    }

    #[test]
    fn filename_star_wins_over_token() {
        let r = parse_content_disposition_filename(
            "attachment; filename=\"fallback.bin\"; filename*=UTF-8''real%20name.dat",
        );
        assert_eq!(r.as_deref(), Some("real name.dat"));
    }

    #[test]
    fn no_filename_param() {
        assert_eq!(parse_content_disposition_filename("inline"), None);
    }
}
