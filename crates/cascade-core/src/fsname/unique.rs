//! Collision-free destination paths.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::sanitize::sanitize_filename;

/// Returns a writable path for `file` under `dir`, creating `dir` (and
/// parents) on demand and sanitizing `file`.
///
/// With `force` the plain path is returned even if it exists (the caller
/// overwrites). Otherwise a trailing ` (n)` counter is appended before the
/// extension and incremented until the path is free, e.g. `title (1).xml`.
pub fn ensure_unique_path(dir: &Path, file: &str, force: bool) -> Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    }

    let mut file = sanitize_filename(file);
    if file.is_empty() {
        file = "file".to_string();
    }

    let mut path = dir.join(&file);
    if force {
        return Ok(path);
    }

    while path.exists() {
        let (stem, ext) = match file.rsplit_once('.') {
            Some((s, e)) if !s.is_empty() => (s.to_string(), Some(e.to_string())),
            _ => (file.clone(), None),
        };
        file = match ext {
            Some(e) => format!("{}.{}", bump_counter(&stem), e),
            None => bump_counter(&stem),
        };
        path = dir.join(&file);
    }
    Ok(path)
}

/// Appends ` (1)` to `stem`, or increments an existing trailing `(n)`.
fn bump_counter(stem: &str) -> String {
    if let Some(open) = stem.rfind('(') {
        if stem.ends_with(')') {
            let inner = &stem[open + 1..stem.len() - 1];
            if !inner.is_empty() && !inner.starts_with('0') && inner.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(n) = inner.parse::<u64>() {
                    return format!("{}({})", &stem[..open], n + 1);
                }
            }
        }
    }
    format!("{} (1)", stem)
}
