//! # Detector Module
//!
//! All-pairs near-duplicate detection over every fingerprint in the store.
//!
//! ## How It Works
//! 1. Load every record, ordered by store key
//! 2. For each record not already flagged, compare it against every other record
//! 3. A pair whose Hamming distance is strictly below the threshold flags both paths
//!
//! Flagging is transitive only through shared neighbours: if A~B and B~C,
//! all three are flagged even when A and C are far apart.
//!
//! | Distance | With the default threshold (12) |
//! |----------|---------------------------------|
//! | 0-11     | Duplicate                       |
//! | 12+      | Distinct                        |

use crate::core::hasher::{ImageHashValue, PerceptualHash};
use crate::core::record::{path_serde, FingerprintRecord};
use crate::core::store::FingerprintStore;
use crate::error::DetectError;
use crate::events::{null_sender, DetectEvent, Event, EventSender};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Default Hamming distance threshold
pub const DEFAULT_THRESHOLD: u32 = 12;

/// One evaluated pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairEvaluation {
    #[serde(with = "path_serde")]
    pub outer: PathBuf,
    #[serde(with = "path_serde")]
    pub inner: PathBuf,
    pub distance: u32,
}

/// Result of a detection pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    /// Threshold the pass ran with
    pub threshold: u32,
    /// Records loaded from the store
    pub total_records: usize,
    /// Paths with at least one near neighbour
    pub flagged: BTreeSet<PathBuf>,
    /// Pairs that fell under the threshold, in evaluation order
    pub duplicates: Vec<PairEvaluation>,
    /// Every evaluated pair, when requested
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evaluations: Vec<PairEvaluation>,
    /// Number of distance computations
    pub comparisons: usize,
}

impl DuplicateReport {
    pub fn is_flagged(&self, path: &std::path::Path) -> bool {
        self.flagged.contains(path)
    }
}

/// All-pairs duplicate detector
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    threshold: u32,
    keep_evaluations: bool,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DuplicateDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            keep_evaluations: true,
        }
    }

    /// Whether to keep every evaluated pair in the report.
    ///
    /// The list grows quadratically with the store; turn it off for large
    /// stores when only the flagged set is needed.
    pub fn keep_evaluations(mut self, keep: bool) -> Self {
        self.keep_evaluations = keep;
        self
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Load every record from `store` and compare all pairs
    pub fn detect(&self, store: &dyn FingerprintStore) -> Result<DuplicateReport, DetectError> {
        self.detect_with_events(store, &null_sender())
    }

    pub fn detect_with_events(
        &self,
        store: &dyn FingerprintStore,
        events: &EventSender,
    ) -> Result<DuplicateReport, DetectError> {
        let entries = load_fingerprints(store)?;
        events.send(Event::Detect(DetectEvent::Started {
            total_records: entries.len(),
        }));

        let report = self.compare_with_events(&entries, events)?;

        events.send(Event::Detect(DetectEvent::Completed {
            comparisons: report.comparisons,
            flagged: report.flagged.len(),
        }));
        Ok(report)
    }

    /// Compare every pair in `entries`, which should already be in a stable order
    pub fn compare(
        &self,
        entries: &[(PathBuf, ImageHashValue)],
    ) -> Result<DuplicateReport, DetectError> {
        self.compare_with_events(entries, &null_sender())
    }

    fn compare_with_events(
        &self,
        entries: &[(PathBuf, ImageHashValue)],
        events: &EventSender,
    ) -> Result<DuplicateReport, DetectError> {
        let mut report = DuplicateReport {
            threshold: self.threshold,
            total_records: entries.len(),
            ..Default::default()
        };

        for (i, (outer, outer_hash)) in entries.iter().enumerate() {
            if report.flagged.contains(outer) {
                continue;
            }

            for (j, (inner, inner_hash)) in entries.iter().enumerate() {
                if i == j {
                    continue;
                }

                let distance = outer_hash.distance(inner_hash).map_err(|e| DetectError::Distance {
                    a: outer.clone(),
                    b: inner.clone(),
                    source: e,
                })?;
                report.comparisons += 1;

                tracing::trace!(
                    outer = %outer.display(),
                    inner = %inner.display(),
                    distance,
                    "evaluated"
                );

                let evaluation = PairEvaluation {
                    outer: outer.clone(),
                    inner: inner.clone(),
                    distance,
                };

                if distance < self.threshold {
                    tracing::info!(
                        a = %outer.display(),
                        b = %inner.display(),
                        distance,
                        "duplicate found"
                    );
                    events.send(Event::Detect(DetectEvent::DuplicateFound {
                        outer: outer.clone(),
                        inner: inner.clone(),
                        distance,
                    }));
                    report.flagged.insert(outer.clone());
                    report.flagged.insert(inner.clone());
                    report.duplicates.push(evaluation.clone());
                }

                if self.keep_evaluations {
                    report.evaluations.push(evaluation);
                }
            }
        }

        Ok(report)
    }
}

/// Read every record from `store`, sorted by key.
///
/// Any unreadable or malformed record aborts the load.
pub fn load_fingerprints(
    store: &dyn FingerprintStore,
) -> Result<Vec<(PathBuf, ImageHashValue)>, DetectError> {
    let mut keys = store.keys()?;
    keys.sort_unstable();

    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let bytes = store
            .get(&key)?
            .ok_or_else(|| DetectError::MissingRecord { key: key.clone() })?;

        let record =
            FingerprintRecord::from_slice(&bytes).map_err(|e| DetectError::Deserialize {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        if record.fingerprint.is_empty() {
            return Err(DetectError::EmptyFingerprint { path: record.path });
        }

        let hash = ImageHashValue::new(record.fingerprint);
        entries.push((record.path, hash));
    }

    Ok(entries)
}
