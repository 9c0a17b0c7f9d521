//! `cascade get`: single resumable download.

use anyhow::Result;
use cascade_core::config::CascadeConfig;
use cascade_core::download::{download, DownloadOptions};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use super::readable_size;

pub fn run_get(
    cfg: &CascadeConfig,
    url: &str,
    out_dir: &Path,
    filename: Option<String>,
    force: bool,
) -> Result<()> {
    let opts = DownloadOptions {
        filename,
        force,
        headers: HashMap::new(),
        retry: cfg.retry_policy(),
    };

    let progress = |done: u64, total: Option<u64>| {
        match total {
            Some(total) if total > 0 => print!(
                "\r{:>3.0}% {} / {}",
                done as f64 * 100.0 / total as f64,
                readable_size(done),
                readable_size(total)
            ),
            _ => print!("\r{}", readable_size(done)),
        }
        let _ = std::io::stdout().flush();
    };

    let (path, size) = download(url, out_dir, &opts, Some(&progress))?;
    println!();
    println!("saved {} ({})", path.display(), readable_size(size));
    Ok(())
}
