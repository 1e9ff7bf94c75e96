//! One-shot completion signal for ingestion tasks.

use super::{TaskOutcome, TaskReport};
use crossbeam_channel::Sender;
use std::path::PathBuf;

/// Reports a task's completion to the coordinator exactly once.
///
/// Call [`Completion::complete`] with the outcome. If the guard is dropped
/// without completing (early return, panic unwinding through the task, or a
/// job that never ran), it reports `Failed` so the coordinator's count still
/// reaches its total.
pub(crate) struct Completion {
    tx: Option<Sender<TaskReport>>,
    path: PathBuf,
}

impl Completion {
    pub(crate) fn new(tx: Sender<TaskReport>, path: PathBuf) -> Self {
        Self { tx: Some(tx), path }
    }

    pub(crate) fn complete(mut self, outcome: TaskOutcome) {
        self.signal(outcome);
    }

    fn signal(&mut self, outcome: TaskOutcome) {
        if let Some(tx) = self.tx.take() {
            // The coordinator only disconnects once it has stopped counting
            let _ = tx.send(TaskReport {
                path: std::mem::take(&mut self.path),
                outcome,
            });
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.signal(TaskOutcome::Failed {
            reason: "task ended without reporting".to_string(),
        });
    }
}
