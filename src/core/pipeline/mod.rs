//! # Pipeline Module
//!
//! Orchestrates a full run.
//!
//! ## Pipeline Stages
//! 1. **Ingest** - Fingerprint the input paths on the worker pool and persist them
//! 2. **Detect** - Compare every fingerprint in the store against every other
//!
//! The store is shared by both stages, so detection also sees records
//! ingested by earlier runs.

mod executor;

pub use executor::{Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
