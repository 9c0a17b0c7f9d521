//! Filename derivation and destination paths.
//!
//! Derives local filenames from Content-Disposition, the (post-redirect) URL
//! path, or the declared content type, sanitized for the local filesystem,
//! with collision-free placement under the output directory.

mod content_disposition;
mod path;
mod sanitize;
mod unique;

pub use content_disposition::parse_content_disposition_filename;
pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename;
pub use unique::ensure_unique_path;

/// Fallback stem when nothing else yields a name.
const DEFAULT_FILENAME: &str = "file";

/// Derives a filename for saving a download.
///
/// Precedence: `content_disposition` filename, then the last path segment of
/// `effective_url` (the final URL after redirects), then `"file"` with an
/// extension guessed from `content_type`.
///
/// The result is a raw candidate; sanitization happens when the destination
/// path is built.
pub fn derive_filename(
    effective_url: &str,
    content_disposition: Option<&str>,
    content_type: Option<&str>,
) -> String {
    let candidate = content_disposition
        .and_then(parse_content_disposition_filename)
        .filter(|s| !s.is_empty())
        .or_else(|| filename_from_url_path(effective_url));

    match candidate {
        Some(name) => name,
        None => match content_type.and_then(extension_for_mime) {
            Some(ext) => format!("{}.{}", DEFAULT_FILENAME, ext),
            None => DEFAULT_FILENAME.to_string(),
        },
    }
}

/// Picks a file extension for a `Content-Type` value (parameters stripped).
fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim();
    mime_guess::get_mime_extensions_str(essence)?.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_url_path() {
        assert_eq!(derive_filename("https://example.com/a/123.xml", None, None), "123.xml");
    }

    #[test]
    fn content_disposition_overrides_url() {
        assert_eq!(
            derive_filename(
                "https://example.com/a/123.xml",
                Some("attachment; filename=\"real.xml\""),
                None
            ),
            "real.xml"
        );
    }

    #[test]
    fn falls_back_to_content_type_extension() {
        let name = derive_filename("https://example.com/", None, Some("text/xml; charset=utf-8"));
        assert!(name.starts_with("file."), "got {}", name);
    }

    #[test]
    fn bare_fallback() {
        assert_eq!(derive_filename("https://example.com/", None, None), "file");
        assert_eq!(
            derive_filename("https://example.com/", None, Some("application/x-unknown-thing")),
            "file"
        );
    }
}
