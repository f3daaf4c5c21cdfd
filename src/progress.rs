//! Weighted progress aggregation across concurrently-imported sources.
//!
//! Each source moves through the import phases at its own speed; the tracker
//! folds per-phase completion ratios into one monotonic overall ratio a
//! presentation layer can poll or receive through import events.

use std::collections::HashMap;

use serde::Serialize;

/// Phase of the per-source import pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    Download,
    Resolve,
    Apply,
    Complete,
}

/// Share of a source's progress each phase accounts for. Policy constants,
/// kept as data so they stay independently testable; they sum to 1.0.
pub const PHASE_WEIGHTS: [(ImportPhase, f64); 4] = [
    (ImportPhase::Download, 0.70),
    (ImportPhase::Resolve, 0.10),
    (ImportPhase::Apply, 0.10),
    (ImportPhase::Complete, 0.10),
];

fn phase_offset(phase: ImportPhase) -> f64 {
    PHASE_WEIGHTS
        .iter()
        .take_while(|(p, _)| *p != phase)
        .map(|(_, w)| w)
        .sum()
}

fn phase_weight(phase: ImportPhase) -> f64 {
    PHASE_WEIGHTS
        .iter()
        .find(|(p, _)| *p == phase)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

/// Accumulates weighted progress for a fixed number of sources.
///
/// Per-source progress is monotonically non-decreasing: once a source has
/// advanced into a later phase's weight band, stale reports for an earlier
/// phase are ignored. Mutated only from the batch task; no internal locking.
#[derive(Debug)]
pub struct ProgressTracker {
    accumulated: HashMap<String, f64>,
    source_count: usize,
}

impl ProgressTracker {
    pub fn new(source_count: usize) -> Self {
        Self {
            accumulated: HashMap::new(),
            source_count,
        }
    }

    /// Record a completion ratio for one phase of one source and return the
    /// updated overall ratio. Out-of-range input is clamped to `[0, 1]`.
    pub fn report(&mut self, source_id: &str, phase: ImportPhase, ratio: f64) -> f64 {
        let ratio = ratio.clamp(0.0, 1.0);
        let candidate = phase_offset(phase) + phase_weight(phase) * ratio;
        let slot = self
            .accumulated
            .entry(source_id.to_string())
            .or_insert(0.0);
        if candidate > *slot {
            *slot = candidate;
        }
        self.overall()
    }

    /// Force a source to its full weight share regardless of prior reports,
    /// and return the updated overall ratio.
    pub fn complete(&mut self, source_id: &str) -> f64 {
        self.accumulated.insert(source_id.to_string(), 1.0);
        self.overall()
    }

    /// Mean of the per-source accumulated ratios; every source weighs the
    /// same regardless of individual phase weights. An empty batch is done.
    pub fn overall(&self) -> f64 {
        if self.source_count == 0 {
            return 1.0;
        }
        self.accumulated.values().sum::<f64>() / self.source_count as f64
    }
}
