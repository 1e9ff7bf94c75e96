//! Batch coordination: submit every path, then count completions.

use super::completion::Completion;
use super::task::{self, TaskContext};
use super::{IngestSummary, TaskOutcome};
use crate::core::buffer::BufferPool;
use crate::core::hasher::{DifferenceHasher, HashAlgorithm};
use crate::core::pool::WorkerPool;
use crate::core::store::FingerprintStore;
use crate::error::{DupeHunterError, PoolError};
use crate::events::{null_sender, Event, EventSender, IngestEvent, IngestProgress};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Ingests batches of paths into a fingerprint store
pub struct Ingestor {
    store: Arc<dyn FingerprintStore>,
    pool: WorkerPool,
    hasher: Arc<dyn HashAlgorithm>,
    buffers: BufferPool,
}

impl Ingestor {
    /// Create an ingestor using the default 64-bit difference hash
    pub fn new(store: Arc<dyn FingerprintStore>, pool: WorkerPool) -> Self {
        Self {
            store,
            pool,
            hasher: Arc::new(DifferenceHasher::default()),
            buffers: BufferPool::new(),
        }
    }

    /// Use a different fingerprint algorithm
    pub fn with_hasher(mut self, hasher: Arc<dyn HashAlgorithm>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Share an existing buffer pool
    pub fn with_buffers(mut self, buffers: BufferPool) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn store(&self) -> &Arc<dyn FingerprintStore> {
        &self.store
    }

    /// Ingest `paths` without progress reporting
    pub fn ingest(&self, paths: &[PathBuf]) -> Result<IngestSummary, DupeHunterError> {
        self.ingest_with_events(paths, &null_sender())
    }

    /// Ingest `paths`, returning once every task has reported and the store
    /// has been flushed.
    ///
    /// Per-file problems are tallied in the summary. Errors returned here
    /// are fatal: the pool refused work, the completion channel broke, or
    /// the final store flush failed.
    pub fn ingest_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<IngestSummary, DupeHunterError> {
        let total = paths.len();
        events.send(Event::Ingest(IngestEvent::Started { total_files: total }));

        let ctx = TaskContext {
            store: Arc::clone(&self.store),
            hasher: Arc::clone(&self.hasher),
            buffers: self.buffers.clone(),
            ingested: Arc::new(Mutex::new(Vec::with_capacity(total))),
        };

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut seen = HashSet::with_capacity(total);
        for path in paths {
            let completion = Completion::new(tx.clone(), path.clone());

            // Paths that cannot be resolved are left for the task to reject
            let resolved = std::path::absolute(path).unwrap_or_else(|_| path.clone());
            if !seen.insert(resolved) {
                tracing::debug!(path = %path.display(), "duplicate input");
                completion.complete(TaskOutcome::Skipped {
                    reason: "duplicate input".to_string(),
                });
                continue;
            }

            let ctx = ctx.clone();
            let path = path.clone();
            self.pool
                .submit(move || completion.complete(task::run(&path, &ctx)))?;
        }
        drop(tx);

        let mut summary = IngestSummary::default();
        for completed in 1..=total {
            let report = rx.recv().map_err(|_| PoolError::Disconnected {
                completed: completed - 1,
                expected: total,
            })?;

            events.send(Event::Ingest(IngestEvent::Progress(IngestProgress {
                completed,
                total,
                current_path: report.path.clone(),
                outcome: report.outcome.clone(),
            })));
            summary.record(report);
        }

        self.store.sync_all()?;

        summary.ingested = std::mem::take(
            &mut *ctx.ingested.lock().unwrap_or_else(PoisonError::into_inner),
        );

        if summary.processed > 0 {
            tracing::info!(processed = summary.processed, "finished");
        }

        events.send(Event::Ingest(IngestEvent::Completed {
            processed: summary.processed,
            ingested: summary.ingested.len(),
            skipped: summary.skipped,
            failed: summary.failed,
        }));

        Ok(summary)
    }
}
