//! Bounded worker pool for per-file pipelines.
//!
//! ## Design
//!
//! ```text
//! inputs ──► crossbeam channel ──► N scoped worker threads ──► results
//!                                      │
//!                              CancelHandle (AtomicBool)
//! ```
//!
//! Every file's pipeline is independent, so the pool needs no shared mutable
//! state beyond the result sink. A failing file is logged and counted, never
//! propagated to siblings. Cancellation stops dispatch (queued files are
//! counted as skipped) while files already being processed run to
//! completion. `cancel()` is idempotent.

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::Result;

/// Shared cancellation flag for one batch.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Stop dispatching new files. Safe to call any number of times, from
    /// any thread.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one batch run.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Successful results, in input order.
    pub completed: Vec<T>,
    /// Files whose pipeline returned an error.
    pub failed: usize,
    /// Files never dispatched because the batch was cancelled.
    pub skipped: usize,
}

/// Fans per-file jobs out over a bounded pool of worker threads.
pub struct BatchRunner {
    workers: usize,
    cancelled: Arc<AtomicBool>,
}

impl BatchRunner {
    /// Create a runner with `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for cancelling this runner's batches.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    /// Process every input through `job` concurrently.
    ///
    /// Per-file errors are logged and counted; they never abort the batch.
    /// Results come back in input order regardless of completion order.
    pub fn run<T, F>(&self, inputs: Vec<PathBuf>, job: F) -> BatchOutcome<T>
    where
        T: Send,
        F: Fn(&Path) -> Result<T> + Sync,
    {
        let total = inputs.len();
        let (tx, rx) = crossbeam_channel::unbounded::<(usize, PathBuf)>();
        for item in inputs.into_iter().enumerate() {
            // Unbounded channel and the sender is dropped below: send cannot fail.
            let _ = tx.send(item);
        }
        drop(tx);

        let results: Mutex<Vec<(usize, T)>> = Mutex::new(Vec::with_capacity(total));
        let failed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let job = &job;
        let results_ref = &results;
        let failed_ref = &failed;
        let skipped_ref = &skipped;
        let cancelled = &self.cancelled;

        std::thread::scope(|scope| {
            for _ in 0..self.workers {
                let rx = rx.clone();
                scope.spawn(move || {
                    while let Ok((index, path)) = rx.recv() {
                        if cancelled.load(Ordering::SeqCst) {
                            skipped_ref.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                        match job(&path) {
                            Ok(value) => results_ref.lock().push((index, value)),
                            Err(e) => {
                                warn!(file = %path.display(), "batch item failed: {e}");
                                failed_ref.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
        });

        let mut completed = results.into_inner();
        completed.sort_by_key(|(index, _)| *index);

        let outcome = BatchOutcome {
            completed: completed.into_iter().map(|(_, value)| value).collect(),
            failed: failed.into_inner(),
            skipped: skipped.into_inner(),
        };
        info!(
            total,
            completed = outcome.completed.len(),
            failed = outcome.failed,
            skipped = outcome.skipped,
            "batch finished"
        );
        outcome
    }
}
