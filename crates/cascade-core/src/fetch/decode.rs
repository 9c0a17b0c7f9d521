//! Body decompression and charset decoding.

use anyhow::{Context, Result};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use std::io::Read;

/// Decompresses `data` per the declared `Content-Encoding`.
///
/// `gzip` and `deflate` are supported; for `deflate` a raw-inflate fallback
/// is attempted when standard zlib framing fails (some servers send bare
/// deflate streams). Unknown encodings are an error.
pub fn decompress(content_encoding: Option<&str>, data: Vec<u8>) -> Result<Vec<u8>> {
    let encoding = match content_encoding.map(str::trim) {
        None | Some("") | Some("identity") => return Ok(data),
        Some(e) => e.to_ascii_lowercase(),
    };
    match encoding.as_str() {
        "gzip" => {
            let mut out = Vec::new();
            GzDecoder::new(data.as_slice())
                .read_to_end(&mut out)
                .context("gzip decompression failed")?;
            Ok(out)
        }
        "deflate" => {
            let mut out = Vec::new();
            match ZlibDecoder::new(data.as_slice()).read_to_end(&mut out) {
                Ok(_) => Ok(out),
                Err(_) => {
                    tracing::debug!("zlib framing rejected, treating as raw deflate");
                    let mut out = Vec::new();
                    DeflateDecoder::new(data.as_slice())
                        .read_to_end(&mut out)
                        .context("deflate decompression failed")?;
                    Ok(out)
                }
            }
        }
        other => anyhow::bail!("unsupported content encoding: {}", other),
    }
}

/// Decodes `bytes` to text using the charset parameter of `Content-Type`,
/// falling back to lossy UTF-8 when absent or unknown.
pub fn decode_text(content_type: Option<&str>, bytes: &[u8]) -> String {
    if let Some(label) = content_type.and_then(charset_label) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
            let (text, _, _) = encoding.decode(bytes);
            return text.into_owned();
        }
        tracing::debug!(charset = %label, "unknown charset, falling back to utf-8");
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Extracts the `charset=` parameter from a Content-Type value.
fn charset_label(content_type: &str) -> Option<String> {
    for param in content_type.split(';').skip(1) {
        if let Some((name, value)) = param.trim().split_once('=') {
            if name.trim().eq_ignore_ascii_case("charset") {
                return Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut e = GzEncoder::new(Vec::new(), Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    #[test]
    fn identity_passthrough() {
        assert_eq!(decompress(None, b"abc".to_vec()).unwrap(), b"abc");
        assert_eq!(decompress(Some("identity"), b"abc".to_vec()).unwrap(), b"abc");
    }

    #[test]
    fn gzip_roundtrip() {
        let out = decompress(Some("gzip"), gzip(b"<xml>subtitles</xml>")).unwrap();
        assert_eq!(out, b"<xml>subtitles</xml>");
    }

    #[test]
    fn deflate_zlib_framed() {
        let mut e = ZlibEncoder::new(Vec::new(), Compression::default());
        e.write_all(b"payload").unwrap();
        let data = e.finish().unwrap();
        assert_eq!(decompress(Some("deflate"), data).unwrap(), b"payload");
    }

    #[test]
    fn deflate_raw_fallback() {
        let mut e = DeflateEncoder::new(Vec::new(), Compression::default());
        e.write_all(b"payload").unwrap();
        let data = e.finish().unwrap();
        assert_eq!(decompress(Some("deflate"), data).unwrap(), b"payload");
    }

    #[test]
    fn unknown_encoding_errors() {
        assert!(decompress(Some("br"), vec![1, 2, 3]).is_err());
    }

    #[test]
    fn decodes_declared_charset() {
        let gbk_bytes = encoding_rs::GBK.encode("字幕").0.into_owned();
        let text = decode_text(Some("text/xml; charset=GBK"), &gbk_bytes);
        assert_eq!(text, "字幕");
    }

    #[test]
    fn defaults_to_lossy_utf8() {
        assert_eq!(decode_text(None, b"plain"), "plain");
        let text = decode_text(Some("text/plain"), &[0x68, 0x69, 0xff]);
        assert!(text.starts_with("hi"));
    }

    #[test]
    fn charset_label_parsing() {
        assert_eq!(
            charset_label("text/html; charset=utf-8").as_deref(),
            Some("utf-8")
        );
        assert_eq!(
            charset_label("text/html; boundary=x; charset=\"gbk\"").as_deref(),
            Some("gbk")
        );
        assert_eq!(charset_label("text/html"), None);
    }
}
