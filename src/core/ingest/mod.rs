//! # Ingest Module
//!
//! Fans a batch of paths out to the [`WorkerPool`](crate::core::pool::WorkerPool),
//! fingerprints each image and persists it, then waits until every task
//! has reported before flushing the store.
//!
//! Each task runs the stages in [`TaskStage`] order and may stop early:
//! - already ingested and unchanged → skipped
//! - not JPEG, PNG or GIF → skipped
//! - unreadable, undecodable, or a store write fails → failed
//!
//! None of these stop the batch. Every task reports exactly once.

mod completion;
mod coordinator;
mod task;

pub use coordinator::Ingestor;
pub use task::{stat_file, TaskStage};

use crate::core::record::FingerprintRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a single ingestion task ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// A new or updated record was persisted
    Ingested,
    /// Nothing to do for this file
    Skipped { reason: String },
    /// The file could not be ingested
    Failed { reason: String },
}

/// Completion signal sent by each task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub path: PathBuf,
    pub outcome: TaskOutcome,
}

/// Result of ingesting a batch of paths
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    /// Number of tasks that reported (equals the number of input paths)
    pub processed: usize,
    /// Tasks that ended with nothing to do
    pub skipped: usize,
    /// Tasks that ended with an error
    pub failed: usize,
    /// Records persisted during this batch
    pub ingested: Vec<FingerprintRecord>,
    /// One report per task, in completion order
    pub reports: Vec<TaskReport>,
}

impl IngestSummary {
    fn record(&mut self, report: TaskReport) {
        self.processed += 1;
        match report.outcome {
            TaskOutcome::Ingested => {}
            TaskOutcome::Skipped { .. } => self.skipped += 1,
            TaskOutcome::Failed { .. } => self.failed += 1,
        }
        self.reports.push(report);
    }

    /// Reports for tasks that failed
    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, TaskOutcome::Failed { .. }))
    }
}
