//! Fanout coordinator: expands opaque seeds into deduplicated entities and
//! drives their processing on the dispatcher.
//!
//! Remote seeds go to the family's resolver, which may fan out into many
//! entities (each enqueued as it is produced); local seeds load exactly one.
//! Every accepted entity is persisted and/or converted according to the
//! options, with the two actions independently fault-isolated.

mod progress;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::dispatch::{Dispatcher, Submitter};
use crate::download::{download, DownloadOptions};
use crate::entity::{BoxedEntity, ContentSource, Entity};
use crate::fetch::fetch_text;
use crate::fsname::ensure_unique_path;
use crate::retry::RetryPolicy;
use crate::source::SeedSource;

pub use progress::RunProgress;

/// Unit of work on the dispatcher queue.
pub enum WorkItem {
    /// Opaque caller-supplied reference, not yet expanded.
    Seed(String),
    /// Resolved entity ready for processing.
    Entity(BoxedEntity),
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Seed(s) => write!(f, "seed {}", s),
            WorkItem::Entity(e) => write!(f, "{}", e.title()),
        }
    }
}

/// Options for one coordinator run.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Output directory, created on demand.
    pub out_dir: PathBuf,
    /// Persist raw content for each entity.
    pub save_raw: bool,
    /// Produce the derived artifact for each entity.
    pub convert: bool,
    /// Overwrite existing files instead of appending a counter.
    pub force: bool,
    /// Worker thread count.
    pub workers: usize,
    /// Transport retry policy for downloads and fetches.
    pub retry: RetryPolicy,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            save_raw: true,
            convert: true,
            force: false,
            workers: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// Aggregated result of a run. Individual failures are visible in logs only.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Distinct entities discovered (seed-level duplicates excluded).
    pub expected: u64,
    /// Entities processed to completion (including isolated failures).
    pub completed: u64,
}

/// True if the seed parses as an absolute http(s) URL with a host; anything
/// else is treated as a local reference.
pub fn is_remote_locator(seed: &str) -> bool {
    match url::Url::parse(seed) {
        Ok(u) => {
            matches!(u.scheme(), "http" | "https")
                && u.host_str().map(|h| !h.is_empty()).unwrap_or(false)
        }
        Err(_) => false,
    }
}

struct Inner<S> {
    source: S,
    opts: CoordinatorOptions,
    /// Seed strings and entity identity keys already accepted this run.
    /// Locked only for check-and-insert, never across I/O.
    seen_seeds: Mutex<HashSet<String>>,
    dedup: Mutex<HashSet<String>>,
    progress: progress::ProgressCounters,
}

/// Drives one run: seeds in, deduplicated processed entities out.
pub struct Coordinator<S> {
    inner: Arc<Inner<S>>,
}

impl<S: SeedSource + 'static> Coordinator<S> {
    pub fn new(source: S, opts: CoordinatorOptions) -> Self {
        Self::build(source, opts, None)
    }

    /// Like [`Coordinator::new`] but with a best-effort progress snapshot
    /// channel (one snapshot per counter change).
    pub fn with_progress(source: S, opts: CoordinatorOptions, tx: Sender<RunProgress>) -> Self {
        Self::build(source, opts, Some(tx))
    }

    fn build(source: S, opts: CoordinatorOptions, tx: Option<Sender<RunProgress>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                opts,
                seen_seeds: Mutex::new(HashSet::new()),
                dedup: Mutex::new(HashSet::new()),
                progress: progress::ProgressCounters::new(tx),
            }),
        }
    }

    /// Processes `seeds` and everything they transitively fan out into.
    /// Always returns once the queue drains; per-item failures never abort
    /// the run.
    pub fn run<I>(&self, seeds: I) -> RunSummary
    where
        I: IntoIterator<Item = String>,
    {
        let inner = Arc::clone(&self.inner);
        let mut dispatcher =
            Dispatcher::new(move |item, submitter: &Submitter<WorkItem>| inner.handle(item, submitter));

        for seed in seeds {
            let fresh = self.inner.seen_seeds.lock().unwrap().insert(seed.clone());
            if fresh {
                dispatcher.submit(WorkItem::Seed(seed));
            } else {
                tracing::debug!(seed, "duplicate seed dropped");
            }
        }

        dispatcher.start(self.inner.opts.workers);
        dispatcher.join();

        let p = self.inner.progress.snapshot();
        RunSummary {
            expected: p.expected,
            completed: p.completed,
        }
    }
}

impl<S: SeedSource> Inner<S> {
    fn handle(&self, item: WorkItem, submitter: &Submitter<WorkItem>) -> Result<()> {
        match item {
            WorkItem::Seed(seed) if is_remote_locator(&seed) => {
                let stream = self
                    .source
                    .resolve(&seed)
                    .with_context(|| format!("failed to resolve {}", seed))?;
                for entry in stream {
                    let entity =
                        entry.with_context(|| format!("resolver failed while expanding {}", seed))?;
                    self.accept(entity, submitter);
                }
                Ok(())
            }
            WorkItem::Seed(seed) => {
                let entity = self
                    .source
                    .load(Path::new(&seed))
                    .with_context(|| format!("failed to load {}", seed))?;
                self.accept(entity, submitter);
                Ok(())
            }
            WorkItem::Entity(entity) => {
                self.process(entity.as_ref());
                self.progress.entity_completed();
                Ok(())
            }
        }
    }

    /// Check-and-insert into the dedup set; duplicates are silently dropped
    /// (already pending or completed this run).
    fn accept(&self, entity: BoxedEntity, submitter: &Submitter<WorkItem>) {
        let key = entity.identity_key();
        let fresh = self.dedup.lock().unwrap().insert(key.clone());
        if !fresh {
            tracing::debug!(key, "duplicate entity dropped");
            return;
        }
        self.progress.entity_accepted();
        submitter.submit(WorkItem::Entity(entity));
    }

    /// Runs the persist and convert actions for one entity. Each action's
    /// failure is logged and does not affect the other.
    fn process(&self, entity: &dyn Entity) {
        let mut raw_path: Option<PathBuf> = None;

        if self.opts.save_raw {
            match self.persist_raw(entity) {
                Ok(path) => raw_path = Some(path),
                Err(e) => {
                    tracing::error!(
                        title = entity.title(),
                        error = format!("{:#}", e),
                        "failed to persist raw content"
                    );
                }
            }
        }

        if self.opts.convert {
            if let Err(e) = self.convert(entity, raw_path.as_deref()) {
                tracing::error!(
                    title = entity.title(),
                    error = format!("{:#}", e),
                    "failed to produce derived artifact"
                );
            }
        }
    }

    fn persist_raw(&self, entity: &dyn Entity) -> Result<PathBuf> {
        let filename = format!("{}.{}", entity.title(), entity.raw_extension());
        match entity.source() {
            ContentSource::Remote(url) => {
                let opts = DownloadOptions {
                    filename: Some(filename),
                    force: self.opts.force,
                    headers: entity.request_headers(),
                    retry: self.opts.retry,
                };
                let (path, _) = download(&url, &self.opts.out_dir, &opts, None)?;
                Ok(path)
            }
            ContentSource::Local(src) => {
                let content = std::fs::read(&src)
                    .with_context(|| format!("failed to read {}", src.display()))?;
                let dest = ensure_unique_path(&self.opts.out_dir, &filename, self.opts.force)?;
                std::fs::write(&dest, content)
                    .with_context(|| format!("failed to write {}", dest.display()))?;
                Ok(dest)
            }
        }
    }

    /// Obtains the raw content (preferring the just-persisted file), renders
    /// the derived format, and writes it next to the raw file.
    fn convert(&self, entity: &dyn Entity, raw_path: Option<&Path>) -> Result<()> {
        let raw = match raw_path {
            Some(p) => std::fs::read_to_string(p)
                .with_context(|| format!("failed to read {}", p.display()))?,
            None => match entity.source() {
                ContentSource::Local(p) => std::fs::read_to_string(&p)
                    .with_context(|| format!("failed to read {}", p.display()))?,
                ContentSource::Remote(url) => {
                    fetch_text(&url, &entity.request_headers(), &self.opts.retry)?
                }
            },
        };

        let derived = entity.render_derived(&raw)?;
        let filename = format!("{}.{}", entity.title(), entity.derived_extension());
        let dest = ensure_unique_path(&self.opts.out_dir, &filename, self.opts.force)?;
        std::fs::write(&dest, derived)
            .with_context(|| format!("failed to write {}", dest.display()))?;
        Ok(())
    }
}
