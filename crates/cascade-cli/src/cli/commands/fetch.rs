//! `cascade fetch`: run a coordinator over the given seeds.

use anyhow::Result;
use cascade_core::config::CascadeConfig;
use cascade_core::coordinator::{Coordinator, CoordinatorOptions, RunProgress};
use cascade_core::source::DirectSource;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;

pub fn run_fetch(
    cfg: &CascadeConfig,
    seeds: Vec<String>,
    out_dir: PathBuf,
    workers: Option<usize>,
    no_raw: bool,
    no_convert: bool,
    force: bool,
) -> Result<()> {
    let opts = CoordinatorOptions {
        out_dir,
        save_raw: cfg.save_raw && !no_raw,
        convert: cfg.convert && !no_convert,
        force,
        workers: workers.unwrap_or(cfg.workers),
        retry: cfg.retry_policy(),
    };

    let (tx, rx) = mpsc::channel::<RunProgress>();
    let printer = std::thread::spawn(move || {
        let mut printed = false;
        for p in rx {
            print!(
                "\r{:>3.0}% {} / {} item(s)",
                p.fraction() * 100.0,
                p.completed,
                p.expected
            );
            let _ = std::io::stdout().flush();
            printed = true;
        }
        if printed {
            println!();
        }
    });

    let coordinator = Coordinator::with_progress(DirectSource, opts, tx);
    let summary = coordinator.run(seeds);

    // Dropping the coordinator closes the snapshot channel.
    drop(coordinator);
    let _ = printer.join();

    println!(
        "processed {} of {} item(s)",
        summary.completed, summary.expected
    );
    Ok(())
}
