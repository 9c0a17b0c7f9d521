//! Resumable, integrity-checked download of one remote resource to one file.
//!
//! Probes the resource for size and filename, resumes a `.part` file when its
//! size is strictly between zero and the expected total, verifies resumed
//! responses against the probed total (discarding stale partials), and
//! survives mid-body drops by re-issuing ranged requests from the current
//! offset. Completed transfers replace the destination with
//! remove-then-rename semantics.

mod transfer;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::fsname::{derive_filename, ensure_unique_path};
use crate::probe::probe;
use crate::retry::{classify, ErrorKind, RetryDecision, RetryPolicy};
use crate::storage::PartFile;

use transfer::{ranged_attempt, AttemptError};

/// Progress callback: bytes transferred so far and the expected total
/// (`None` = unbounded).
pub type ProgressFn<'a> = &'a dyn Fn(u64, Option<u64>);

/// Options for a single download.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Destination filename; derived from the response when `None`.
    pub filename: Option<String>,
    /// Overwrite an existing destination instead of appending a counter.
    pub force: bool,
    /// Extra request headers (e.g. from a resolver family).
    pub headers: HashMap<String, String>,
    /// Transport retry policy.
    pub retry: RetryPolicy,
}

/// Downloads `url` into `out_dir` and returns the final path and byte size.
///
/// See the module docs for resume, integrity, and retry behavior.
pub fn download(
    url: &str,
    out_dir: &Path,
    opts: &DownloadOptions,
    progress: Option<ProgressFn<'_>>,
) -> Result<(PathBuf, u64)> {
    let probed = probe(url, &opts.headers, &opts.retry)?;
    let total = probed.content_length;

    let filename = match &opts.filename {
        Some(f) => f.clone(),
        None => derive_filename(
            &probed.effective_url,
            probed.content_disposition.as_deref(),
            probed.content_type.as_deref(),
        ),
    };
    let final_path = ensure_unique_path(out_dir, &filename, opts.force)?;
    tracing::debug!(url, dest = %final_path.display(), ?total, "starting download");

    match total {
        Some(total) => {
            let part_path = part_path_for(&final_path);
            let resume = match std::fs::metadata(&part_path) {
                Ok(m) => m.len() > 0 && m.len() < total,
                Err(_) => false,
            };
            if resume {
                tracing::info!(part = %part_path.display(), "partial file exists, resuming");
            }
            let part = PartFile::open(&part_path, resume)?;
            run_bounded(url, opts, total, &part, progress)?;
            part.finalize(&final_path)
                .context("failed to finalize download")?;
        }
        None => {
            // No declared length: stream the destination directly until the
            // body ends. No .part file and no rename; written exactly once.
            let part = PartFile::open(&final_path, false)?;
            run_unbounded(url, opts, &part, progress)?;
        }
    }

    let size = std::fs::metadata(&final_path)
        .with_context(|| format!("failed to stat {}", final_path.display()))?
        .len();
    tracing::debug!(dest = %final_path.display(), size, "download completed");
    Ok((final_path, size))
}

/// `<dest>.part` alongside the destination.
fn part_path_for(final_path: &Path) -> PathBuf {
    let mut os = final_path.as_os_str().to_os_string();
    os.push(".part");
    PathBuf::from(os)
}

/// Transfer loop for a known total size.
///
/// Re-issues ranged requests from the current offset after mid-body drops;
/// only attempts that make no progress count against the retry bound. An
/// integrity mismatch discards the partial and restarts from zero, once per
/// detection, without a bound (a persistently inconsistent server keeps this
/// loop alive; each detection is logged).
fn run_bounded(
    url: &str,
    opts: &DownloadOptions,
    total: u64,
    part: &PartFile,
    progress: Option<ProgressFn<'_>>,
) -> Result<()> {
    let mut attempt = 1u32;
    while part.len() < total {
        let offset = part.len();
        match ranged_attempt(url, &opts.headers, offset, Some(total), part, progress) {
            Ok(()) => {
                if part.len() == offset {
                    // Success status with an empty body; bound this like a
                    // no-progress failure so a degenerate server cannot spin
                    // the loop forever.
                    match opts.retry.decide(attempt, ErrorKind::Connection) {
                        RetryDecision::NoRetry => {
                            anyhow::bail!("server kept returning empty responses for {}", url);
                        }
                        RetryDecision::RetryAfter(d) => {
                            if !d.is_zero() {
                                std::thread::sleep(d);
                            }
                            attempt += 1;
                        }
                    }
                } else if part.len() < total {
                    // Body ended early with a success status; ask for the
                    // rest from the new offset.
                    tracing::info!(
                        got = part.len(),
                        total,
                        "response ended short of total, requesting remainder"
                    );
                    attempt = 1;
                }
            }
            Err(AttemptError::Mismatch { reported }) => {
                tracing::warn!(
                    offset,
                    reported,
                    total,
                    "partial file inconsistent with server, restarting from zero"
                );
                part.reset()?;
                attempt = 1;
            }
            Err(AttemptError::Transfer(e)) => {
                if part.len() > offset {
                    // Progress was made; this is a mid-body drop, not a
                    // failed request. Resume from the new offset.
                    tracing::info!(offset = part.len(), error = %e, "transfer interrupted, resuming");
                    attempt = 1;
                    continue;
                }
                match opts.retry.decide(attempt, classify(&e)) {
                    RetryDecision::NoRetry => {
                        return Err(anyhow::Error::new(e))
                            .with_context(|| format!("download failed for {}", url));
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::info!(attempt, error = %e, "request failed, retrying");
                        if !d.is_zero() {
                            std::thread::sleep(d);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }

    if part.len() > total {
        anyhow::bail!(
            "server sent more data than expected: {} of {} bytes",
            part.len(),
            total
        );
    }
    Ok(())
}

/// Transfer loop for an unbounded (no Content-Length) stream: read until the
/// body ends cleanly. Never issues a range-restart; without a declared total
/// there is no offset to resume from, so an error after data arrived fails
/// the download instead of passing off a truncated file as complete.
fn run_unbounded(
    url: &str,
    opts: &DownloadOptions,
    part: &PartFile,
    progress: Option<ProgressFn<'_>>,
) -> Result<()> {
    let mut attempt = 1u32;
    loop {
        match ranged_attempt(url, &opts.headers, 0, None, part, progress) {
            Ok(()) => return Ok(()),
            Err(AttemptError::Mismatch { .. }) => {
                unreachable!("consistency check requires a resume offset")
            }
            Err(AttemptError::Transfer(e)) => {
                if !part.is_empty() {
                    return Err(anyhow::Error::new(e))
                        .with_context(|| format!("stream interrupted for {}", url));
                }
                match opts.retry.decide(attempt, classify(&e)) {
                    RetryDecision::NoRetry => {
                        return Err(anyhow::Error::new(e))
                            .with_context(|| format!("download failed for {}", url));
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::info!(attempt, error = %e, "request failed, retrying");
                        if !d.is_zero() {
                            std::thread::sleep(d);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path_for(Path::new("/tmp/out/title.xml")),
            PathBuf::from("/tmp/out/title.xml.part")
        );
    }
}
