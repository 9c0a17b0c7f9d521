//! Run progress accounting (expected vs completed entities).

use std::sync::mpsc::Sender;
use std::sync::Mutex;

/// Snapshot of a coordinator run's progress. `expected` grows as fan-out
/// discovers new entities; only finished entities move `completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunProgress {
    /// Distinct entities accepted so far (duplicates excluded).
    pub expected: u64,
    /// Entities that finished processing (success or isolated failure).
    pub completed: u64,
}

impl RunProgress {
    /// Fraction complete in [0.0, 1.0]; 1.0 when nothing is expected.
    pub fn fraction(&self) -> f64 {
        if self.expected == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.expected as f64).min(1.0)
    }
}

/// Shared counters with an optional best-effort snapshot channel. Snapshots
/// are dropped when the receiver lags or is gone; delivery order under truly
/// simultaneous updates is not guaranteed.
pub(super) struct ProgressCounters {
    state: Mutex<RunProgress>,
    tx: Option<Sender<RunProgress>>,
}

impl ProgressCounters {
    pub(super) fn new(tx: Option<Sender<RunProgress>>) -> Self {
        Self {
            state: Mutex::new(RunProgress::default()),
            tx,
        }
    }

    pub(super) fn entity_accepted(&self) {
        let snapshot = {
            let mut st = self.state.lock().unwrap();
            st.expected += 1;
            *st
        };
        self.publish(snapshot);
    }

    pub(super) fn entity_completed(&self) {
        let snapshot = {
            let mut st = self.state.lock().unwrap();
            st.completed += 1;
            *st
        };
        self.publish(snapshot);
    }

    pub(super) fn snapshot(&self) -> RunProgress {
        *self.state.lock().unwrap()
    }

    fn publish(&self, snapshot: RunProgress) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(snapshot);
        }
    }
}
