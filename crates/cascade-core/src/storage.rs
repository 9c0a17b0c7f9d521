//! Append writer for in-progress download files.
//!
//! Wraps the `.part` file (or the destination itself for unbounded
//! transfers). Safe to clone into curl write callbacks; writes are
//! sequential appends tracked by a shared byte counter.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Writer for an in-progress download file.
#[derive(Clone)]
pub struct PartFile {
    file: Arc<File>,
    path: PathBuf,
    len: Arc<AtomicU64>,
}

impl PartFile {
    /// Opens `path` for appending. With `resume` the existing contents are
    /// kept and the counter starts at the on-disk size; otherwise the file is
    /// truncated (fresh transfer).
    pub fn open(path: &Path, resume: bool) -> Result<Self> {
        let file = File::options()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("failed to open part file: {}", path.display()))?;
        let len = if resume {
            file.metadata()
                .with_context(|| format!("failed to stat part file: {}", path.display()))?
                .len()
        } else {
            file.set_len(0)
                .with_context(|| format!("failed to truncate part file: {}", path.display()))?;
            0
        };
        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
            len: Arc::new(AtomicU64::new(len)),
        })
    }

    /// Appends `data` and advances the byte counter.
    pub fn append(&self, data: &[u8]) -> std::io::Result<()> {
        (&*self.file).write_all(data)?;
        self.len.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Discards all written bytes (integrity-mismatch restart).
    pub fn reset(&self) -> Result<()> {
        self.file
            .set_len(0)
            .with_context(|| format!("failed to reset part file: {}", self.path.display()))?;
        self.len.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Bytes written so far (resume offset for the next ranged request).
    pub fn len(&self) -> u64 {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path to the in-progress file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verifies the on-disk size matches the counter, then moves the file to
    /// `final_path` with remove-then-rename semantics (a true atomic replace
    /// cannot be assumed cross-platform).
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let expected = self.len();
        let path = self.path.clone();
        self.file.sync_all().context("part file sync failed")?;
        drop(self.file);

        let on_disk = std::fs::metadata(&path)
            .with_context(|| format!("failed to stat part file: {}", path.display()))?
            .len();
        if on_disk != expected {
            anyhow::bail!(
                "part file {} has {} bytes on disk, expected {}",
                path.display(),
                on_disk,
                expected
            );
        }

        if final_path.exists() {
            std::fs::remove_file(final_path)
                .with_context(|| format!("failed to remove {}", final_path.display()))?;
        }
        std::fs::rename(&path, final_path).with_context(|| {
            format!("failed to rename {} to {}", path.display(), final_path.display())
        })?;
        Ok(())
    }
}
