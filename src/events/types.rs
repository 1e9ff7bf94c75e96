//! Event type definitions for progress reporting.

use crate::core::ingest::TaskOutcome;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Ingestion phase events
    Ingest(IngestEvent),
    /// Duplicate detection phase events
    Detect(DetectEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the ingestion phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IngestEvent {
    /// Tasks are being submitted
    Started { total_files: usize },
    /// One task reported completion
    Progress(IngestProgress),
    /// Every task has reported and the store is flushed
    Completed {
        processed: usize,
        ingested: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Progress information during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestProgress {
    /// Tasks completed so far
    pub completed: usize,
    /// Total tasks submitted
    pub total: usize,
    /// Path of the task that just completed
    pub current_path: PathBuf,
    /// How it ended
    pub outcome: TaskOutcome,
}

/// Events during duplicate detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DetectEvent {
    /// Fingerprints are loaded and comparison begins
    Started { total_records: usize },
    /// Two paths are within the threshold
    DuplicateFound {
        outer: PathBuf,
        inner: PathBuf,
        distance: u32,
    },
    /// Comparison finished
    Completed {
        comparisons: usize,
        flagged: usize,
    },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Ingesting,
    Detecting,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Input paths processed this run
    pub processed: usize,
    /// Fingerprints in the store during detection
    pub total_records: usize,
    /// Paths flagged as duplicates
    pub flagged: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Ingesting => write!(f, "Ingesting"),
            PipelinePhase::Detecting => write!(f, "Detecting"),
        }
    }
}
