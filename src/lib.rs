//! # dupehunter
//!
//! Fingerprints images with a perceptual hash, keeps the fingerprints in a
//! durable store, and reports which stored images are near-duplicates.
//!
//! ## Core Philosophy
//! - **Never touch files** - Inputs are only read; results are a report
//! - **Incremental** - Unchanged files are not fingerprinted twice
//! - **Isolated failures** - One bad file never stops a batch
//!
//! ## Architecture
//! - `core` - Store, hashing, worker pool, ingestion and detection
//! - `events` - Event-driven progress reporting
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{DupeHunterError, Result};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the binary
///
/// `RUST_LOG` takes precedence. Otherwise logs at `info`, or `trace` when
/// `verbose` is set. Output goes to stderr.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "trace" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| DupeHunterError::Config(format!("failed to install logger: {e}")))
}
