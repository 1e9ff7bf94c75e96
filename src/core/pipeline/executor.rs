//! Pipeline execution implementation.

use crate::core::buffer::BufferPool;
use crate::core::detector::{DuplicateDetector, DuplicateReport, DEFAULT_THRESHOLD};
use crate::core::hasher::{DifferenceHasher, HashAlgorithm};
use crate::core::ingest::{IngestSummary, Ingestor};
use crate::core::pool::{WorkerPool, DEFAULT_WORKERS};
use crate::core::store::{FingerprintStore, InMemoryStore};
use crate::error::DupeHunterError;
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, PipelineSummary,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// What happened to each input path
    pub ingest: IngestSummary,
    /// Duplicates across the whole store
    pub report: DuplicateReport,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of concurrent ingestion workers
    pub workers: usize,
    /// Hamming distance below which two images are duplicates
    pub threshold: u32,
    /// Keep every evaluated pair in the report
    pub keep_evaluations: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            threshold: DEFAULT_THRESHOLD,
            keep_evaluations: true,
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    store: Option<Arc<dyn FingerprintStore>>,
    hasher: Option<Arc<dyn HashAlgorithm>>,
    buffers: Option<BufferPool>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            store: None,
            hasher: None,
            buffers: None,
        }
    }

    /// Set the store backend
    pub fn store(mut self, store: Arc<dyn FingerprintStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the number of ingestion workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the duplicate threshold
    pub fn threshold(mut self, threshold: u32) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Set the fingerprint algorithm
    pub fn hasher(mut self, hasher: Arc<dyn HashAlgorithm>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Share an existing buffer pool
    pub fn buffers(mut self, buffers: BufferPool) -> Self {
        self.buffers = Some(buffers);
        self
    }

    /// Keep every evaluated pair in the report
    pub fn keep_evaluations(mut self, keep: bool) -> Self {
        self.config.keep_evaluations = keep;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline, DupeHunterError> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let pool = WorkerPool::new(self.config.workers)?;
        let hasher = self
            .hasher
            .unwrap_or_else(|| Arc::new(DifferenceHasher::default()));

        let ingestor = Ingestor::new(store, pool)
            .with_hasher(hasher)
            .with_buffers(self.buffers.unwrap_or_default());

        let detector = DuplicateDetector::new(self.config.threshold)
            .keep_evaluations(self.config.keep_evaluations);

        Ok(Pipeline {
            config: self.config,
            ingestor,
            detector,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ingest a batch, then detect duplicates across the whole store
pub struct Pipeline {
    config: PipelineConfig,
    ingestor: Ingestor,
    detector: DuplicateDetector,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The store the pipeline reads and writes
    pub fn store(&self) -> &Arc<dyn FingerprintStore> {
        self.ingestor.store()
    }

    /// Run the pipeline without events
    pub fn run(&self, paths: &[PathBuf]) -> Result<PipelineResult, DupeHunterError> {
        self.run_with_events(paths, &null_sender())
    }

    /// Run the pipeline with event reporting
    ///
    /// Detection starts only after every ingestion task has reported and
    /// the store has been flushed.
    pub fn run_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<PipelineResult, DupeHunterError> {
        let start_time = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Ingesting
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Ingesting,
        }));
        let ingest = self.ingestor.ingest_with_events(paths, events)?;

        // Phase 2: Detecting
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Detecting,
        }));
        let report = self
            .detector
            .detect_with_events(self.store().as_ref(), events)?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                processed: ingest.processed,
                total_records: report.total_records,
                flagged: report.flagged.len(),
                duration_ms,
            },
        }));

        Ok(PipelineResult {
            ingest,
            report,
            duration_ms,
        })
    }
}
