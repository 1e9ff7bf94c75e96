//! # Core Module
//!
//! The fingerprinting and duplicate detection engine.
//!
//! ## Modules
//! - `record` - The persisted fingerprint record
//! - `store` - Durable key-value storage for records
//! - `buffer` - Reusable byte buffers for hashing and serialization
//! - `hasher` - Image decoding and perceptual hashing
//! - `pool` - Fixed-size worker pool with panic isolation
//! - `ingest` - Per-file tasks and batch coordination
//! - `detector` - All-pairs near-duplicate detection
//! - `pipeline` - Ingest then detect

pub mod buffer;
pub mod detector;
pub mod hasher;
pub mod ingest;
pub mod pipeline;
pub mod pool;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use detector::{DuplicateDetector, DuplicateReport, PairEvaluation};
pub use hasher::{ImageHashValue, PerceptualHash};
pub use ingest::{IngestSummary, Ingestor, TaskOutcome};
pub use record::{FingerprintRecord, ImageKind};
pub use store::{FingerprintStore, SqliteStore};
