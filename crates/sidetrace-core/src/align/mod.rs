//! Acquisition / simulation alignment
//!
//! Builds model-training datasets by aligning a real cycle-rate acquisition
//! trace against a simulated per-instruction execution trace. Dynamic time
//! warping reconciles the two axes: instructions that take several cycles
//! absorb several acquisition samples, and the alignment back-annotates each
//! instruction with its observed power and cycle count.

pub mod dtw;

pub use dtw::{asymmetric_dtw, DtwAlignment};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::exec_trace::ExecutionTrace;
use crate::types::{ScaResult, Trace};

/// How the acquisition samples absorbed by one instruction reduce to its
/// observed power value.
///
/// `First` keeps the first active cycle's sample, matching the physical
/// model that the first cycle dominates observed power. The alternatives
/// exist for experimentation; `First` reproduces the reference pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CycleAggregation {
    /// Power of the first acquisition sample mapped to the instruction
    #[default]
    First,
    /// Mean over all mapped acquisition samples
    Mean,
    /// Maximum over all mapped acquisition samples
    Max,
}

/// Result of aligning an acquisition against a simulation.
#[derive(Debug, Clone)]
pub struct AlignmentSummary {
    /// The simulated trace with `power` and `nb_cycles` back-annotated;
    /// instructions the alignment never visited are removed
    pub annotated: ExecutionTrace,
    /// Instructions dropped because the warping path skipped them
    pub dropped: usize,
    /// DTW distance normalized by the acquisition length
    pub normalized_distance: f64,
}

/// Trace/simulation aligner.
#[derive(Debug, Clone, Copy)]
pub struct Aligner {
    /// Slanted-band half-width in reference indexes
    window: usize,
    /// Per-instruction power reduction policy
    aggregation: CycleAggregation,
}

impl Default for Aligner {
    fn default() -> Self {
        Self {
            window: 10,
            aggregation: CycleAggregation::First,
        }
    }
}

impl Aligner {
    /// Aligner with the default band width (10) and first-sample power.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slanted-band half-width.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the per-instruction power aggregation policy.
    pub fn with_aggregation(mut self, aggregation: CycleAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Align `acquisition` against `simulation` and back-annotate it.
    ///
    /// The simulation's power column (one estimate per instruction, cycle
    /// counts ignored) is the warping reference. Walking the path in order:
    /// each time the reference advances, that instruction's cycle counter
    /// starts at 1 and its power comes from the mapped acquisition samples
    /// per the aggregation policy; each repeat of the same reference index
    /// adds one cycle. Instructions the path skips cannot be annotated and
    /// are dropped from the output; the drop count is reported and logged.
    pub fn align(
        &self,
        acquisition: &Trace,
        simulation: &ExecutionTrace,
    ) -> ScaResult<AlignmentSummary> {
        let reference = simulation.power_trace()?;
        let alignment = asymmetric_dtw(acquisition, &reference, self.window)?;

        debug!(
            normalized_distance = alignment.normalized_distance,
            "aligned acquisition against simulation"
        );

        // Group the path by reference index; the path is in query order and
        // the reference index never decreases.
        let mut annotated = ExecutionTrace::new();
        let mut visited = 0usize;
        let mut group: Option<(usize, Vec<f64>)> = None;

        let flush =
            |annotated: &mut ExecutionTrace, group: Option<(usize, Vec<f64>)>| {
                if let Some((ref_index, samples)) = group {
                    let mut record = simulation.records()[ref_index].clone();
                    record.nb_cycles = samples.len() as u32;
                    record.power = Some(match self.aggregation {
                        CycleAggregation::First => samples[0],
                        CycleAggregation::Mean => {
                            samples.iter().sum::<f64>() / samples.len() as f64
                        }
                        CycleAggregation::Max => {
                            samples.iter().copied().fold(f64::NEG_INFINITY, f64::max)
                        }
                    });
                    annotated.push(record);
                }
            };

        for &(query_index, ref_index) in &alignment.path {
            match &mut group {
                Some((current, samples)) if *current == ref_index => {
                    samples.push(acquisition[query_index]);
                }
                _ => {
                    flush(&mut annotated, group.take());
                    visited += 1;
                    group = Some((ref_index, vec![acquisition[query_index]]));
                }
            }
        }
        flush(&mut annotated, group.take());

        let dropped = simulation.len() - visited;
        if dropped > 0 {
            warn!(
                dropped,
                total = simulation.len(),
                "alignment skipped instructions; they are absent from the dataset"
            );
        }

        Ok(AlignmentSummary {
            annotated,
            dropped,
            normalized_distance: alignment.normalized_distance,
        })
    }
}
