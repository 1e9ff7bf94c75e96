//! # Error Module
//!
//! Error types for the ingestion pipeline and duplicate detector.
//!
//! ## Design Principles
//! - **Per-task errors stay per-task** - an `IngestError` never aborts a run
//! - **Include context** - paths and store keys, what went wrong
//! - **Infrastructure errors are fatal** - the binary decides, the library returns them

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum DupeHunterError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Duplicate detection error: {0}")]
    Detect(#[from] DetectError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by a fingerprint store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to create store directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store path {path} exists but is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to open store at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Invalid namespace name: {name:?}")]
    InvalidNamespace { name: String },

    #[error("Store query failed: {0}")]
    QueryFailed(String),

    #[error("Store corruption detected at {path}. Delete this directory and re-ingest.")]
    Corrupted { path: PathBuf },

    #[error("Store is closed")]
    Closed,

    #[error("Could not determine the per-user data directory")]
    NoDataDirectory,
}

/// Errors from image decoding and fingerprint computation
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Unsupported image format: {reason}")]
    UnsupportedFormat { reason: String },

    #[error("Failed to decode image: {reason}")]
    Decode { reason: String },

    #[error("Hash computation failed: {0}")]
    ComputationFailed(String),

    #[error("Fingerprint widths differ: {left} vs {right} bytes")]
    LengthMismatch { left: usize, right: usize },
}

/// Errors that end a single ingestion task early
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Target is a directory: {path}")]
    IsDirectory { path: PathBuf },

    #[error("Failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already ingested and unchanged: {path}")]
    AlreadyIngested { path: PathBuf },

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: HashError,
    },

    #[error("Skipping image of unknown kind: {path}")]
    UnknownKind { path: PathBuf },

    #[error("Failed to fingerprint {path}: {source}")]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: HashError,
    },

    #[error("Failed to serialize record for {path}: {reason}")]
    Serialize { path: PathBuf, reason: String },

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    /// Soft skips are expected outcomes, not failures.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            IngestError::AlreadyIngested { .. } | IngestError::UnknownKind { .. }
        )
    }
}

/// Errors from the ingestion worker pool and coordinator
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Worker pool size must be at least 1")]
    InvalidSize,

    #[error("Failed to build worker pool: {0}")]
    BuildFailed(String),

    #[error("Worker pool is shut down and rejects new tasks")]
    Closed,

    #[error("Completion channel closed after {completed} of {expected} tasks")]
    Disconnected { completed: usize, expected: usize },
}

/// Errors that abort the duplicate detection pass
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Failed to load fingerprints: {0}")]
    Store(#[from] StoreError),

    #[error("Key {key} was listed but has no value")]
    MissingRecord { key: String },

    #[error("Failed to deserialize record {key}: {reason}")]
    Deserialize { key: String, reason: String },

    #[error("Record {path} has an empty fingerprint")]
    EmptyFingerprint { path: PathBuf },

    #[error("Failed to compare {a} and {b}: {source}")]
    Distance {
        a: PathBuf,
        b: PathBuf,
        #[source]
        source: HashError,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DupeHunterError>;
