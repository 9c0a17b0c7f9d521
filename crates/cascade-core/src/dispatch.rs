//! Fixed-size worker pool draining a growable work queue.
//!
//! Workers are OS threads blocking on a shared queue; handlers may submit new
//! items while processing one (fan-out). `join` waits until the pending
//! counter (which counts items discovered mid-run too) reaches zero, then
//! closes the queue and broadcasts the condvar so every worker observes the
//! shutdown exactly once. A handler error is logged and the item counted as
//! complete; it never stalls drain detection or the pool.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// Per-item handler. Receives the item and a [`Submitter`] for fan-out.
pub type Handler<T> = Arc<dyn Fn(T, &Submitter<T>) -> anyhow::Result<()> + Send + Sync>;

struct QueueState<T> {
    queue: VecDeque<T>,
    /// Items enqueued but not yet completed, including fan-out discoveries.
    pending: usize,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    /// Signaled when an item is enqueued or the queue closes.
    available: Condvar,
    /// Signaled when the pending counter reaches zero.
    drained: Condvar,
}

/// Cloneable enqueue handle, usable from handlers for fan-out.
pub struct Submitter<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Submitter<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Submitter<T> {
    /// Enqueues one item, incrementing the pending counter.
    pub fn submit(&self, item: T) {
        let mut st = self.shared.state.lock().unwrap();
        st.queue.push_back(item);
        st.pending += 1;
        drop(st);
        self.shared.available.notify_one();
    }
}

/// Worker pool over a shared, growable queue.
pub struct Dispatcher<T> {
    shared: Arc<Shared<T>>,
    handler: Handler<T>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + fmt::Display + 'static> Dispatcher<T> {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(T, &Submitter<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    pending: 0,
                    closed: false,
                }),
                available: Condvar::new(),
                drained: Condvar::new(),
            }),
            handler: Arc::new(handler),
            workers: Vec::new(),
        }
    }

    /// Handle for enqueueing items (cheaply cloneable, thread-safe).
    pub fn submitter(&self) -> Submitter<T> {
        Submitter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Enqueues one item.
    pub fn submit(&self, item: T) {
        self.submitter().submit(item);
    }

    /// Spawns `worker_count` worker threads.
    pub fn start(&mut self, worker_count: usize) {
        let worker_count = worker_count.max(1);
        for _ in 0..worker_count {
            let shared = Arc::clone(&self.shared);
            let handler = Arc::clone(&self.handler);
            self.workers.push(std::thread::spawn(move || {
                worker_loop(shared, handler);
            }));
        }
    }

    /// Blocks until the queue, including everything discovered by fan-out,
    /// is drained, then shuts the workers down and waits for them to exit.
    pub fn join(&mut self) {
        {
            let mut st = self.shared.state.lock().unwrap();
            while st.pending > 0 {
                st = self.shared.drained.wait(st).unwrap();
            }
            st.closed = true;
        }
        self.shared.available.notify_all();

        for h in self.workers.drain(..) {
            h.join().expect("worker thread panicked");
        }
    }
}

fn worker_loop<T: Send + fmt::Display + 'static>(shared: Arc<Shared<T>>, handler: Handler<T>) {
    let submitter = Submitter {
        shared: Arc::clone(&shared),
    };
    loop {
        let item = {
            let mut st = shared.state.lock().unwrap();
            loop {
                if let Some(item) = st.queue.pop_front() {
                    break Some(item);
                }
                if st.closed {
                    break None;
                }
                st = shared.available.wait(st).unwrap();
            }
        };
        let Some(item) = item else {
            return;
        };

        let desc = item.to_string();
        let outcome = catch_unwind(AssertUnwindSafe(|| (handler)(item, &submitter)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(item = %desc, error = format!("{:#}", e), "error processing item, skipping");
            }
            Err(_) => {
                tracing::error!(item = %desc, "handler panicked, skipping item");
            }
        }

        let mut st = shared.state.lock().unwrap();
        st.pending -= 1;
        if st.pending == 0 {
            drop(st);
            shared.drained.notify_all();
        }
    }
}
