//! Quiet-padding crop
//!
//! Firmware injects 500 `NOP` instructions before and after the cipher
//! execution for alignment and debug purposes. This module locates those two
//! quiet padding regions by amplitude threshold alone (no clock input) and
//! returns the region of interest between them.

use tracing::debug;

use crate::types::{CropSide, ScaError, ScaResult, Trace};

/// Quiet instruction-equivalents a run must span to count as padding.
///
/// Deliberately below the nominal 500 padding instructions so that clock
/// jitter at the region boundary cannot split a padding run below the
/// detection length.
pub const DEFAULT_GUARD_CYCLES: usize = 450;

/// Threshold-based padding crop configuration.
#[derive(Debug, Clone, Copy)]
pub struct CycleCropper {
    /// Amplitude at or below which a sample counts as quiet
    threshold: f64,
    /// Samples per clock cycle in the trace
    samples_per_cycle: usize,
    /// Quiet cycles a run must span to qualify as padding
    guard_cycles: usize,
}

impl CycleCropper {
    /// Create a cropper with the given quiet threshold, one sample per cycle
    /// and the default guard length.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            samples_per_cycle: 1,
            guard_cycles: DEFAULT_GUARD_CYCLES,
        }
    }

    /// Set the number of samples per clock cycle.
    pub fn with_samples_per_cycle(mut self, samples_per_cycle: usize) -> Self {
        self.samples_per_cycle = samples_per_cycle;
        self
    }

    /// Override the guard length in quiet cycles.
    pub fn with_guard_cycles(mut self, guard_cycles: usize) -> Self {
        self.guard_cycles = guard_cycles;
        self
    }

    /// Crop the quiet padding regions surrounding the region of interest.
    ///
    /// Every index starting a run of at least `guard_cycles *
    /// samples_per_cycle` quiet samples (runs truncated by the end of the
    /// trace included) is a padding candidate. Candidates are split at their
    /// mean index into a leading and a trailing group; the crop keeps
    /// `(max(leading) + guard, min(trailing))`.
    ///
    /// Fails with [`ScaError::CropBoundaryNotFound`] when either group is
    /// empty: the padding assumption was violated and the result would be
    /// meaningless. Re-cropping an already-cropped trace fails this way
    /// instead of returning a corrupted trace.
    pub fn crop(&self, trace: &Trace) -> ScaResult<Trace> {
        let guard = self.guard_cycles * self.samples_per_cycle;
        let n = trace.len();

        // run[i] = length of the quiet run starting at i
        let mut run = vec![0usize; n + 1];
        for i in (0..n).rev() {
            if trace[i].abs() <= self.threshold {
                run[i] = run[i + 1] + 1;
            }
        }

        // A run truncated by the end of the trace still qualifies
        let candidates: Vec<usize> = (0..n)
            .filter(|&i| run[i] >= guard.min(n - i))
            .collect();

        if candidates.is_empty() {
            return Err(ScaError::CropBoundaryNotFound {
                side: CropSide::Before,
                min_len: guard,
            });
        }

        let mean =
            candidates.iter().sum::<usize>() as f64 / candidates.len() as f64;

        let leading = candidates
            .iter()
            .copied()
            .filter(|&i| (i as f64) < mean)
            .max()
            .ok_or(ScaError::CropBoundaryNotFound {
                side: CropSide::Before,
                min_len: guard,
            })?;
        let trailing = candidates
            .iter()
            .copied()
            .filter(|&i| (i as f64) > mean)
            .min()
            .ok_or(ScaError::CropBoundaryNotFound {
                side: CropSide::After,
                min_len: guard,
            })?;

        let start = leading + guard;
        let end = trailing;
        if start > end {
            // Interleaved boundaries: the padding assumption does not hold
            return Err(ScaError::CropBoundaryNotFound {
                side: CropSide::After,
                min_len: guard,
            });
        }

        debug!(start, end, samples = n, "cropped quiet padding");
        Ok(trace[start..end].to_vec())
    }
}

/// Crop quiet padding at the beginning and end of a trace.
///
/// Convenience wrapper over [`CycleCropper`] with the default guard length.
pub fn crop_cycles(
    trace: &Trace,
    threshold: f64,
    samples_per_cycle: usize,
) -> ScaResult<Trace> {
    CycleCropper::new(threshold)
        .with_samples_per_cycle(samples_per_cycle)
        .crop(trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded_trace() -> Trace {
        let mut trace = vec![1.0; 500];
        trace.extend(vec![0.0; 500]);
        trace.extend(vec![1.0; 10]);
        trace.extend(vec![0.0; 500]);
        trace.extend(vec![1.0; 500]);
        trace
    }

    #[test]
    fn test_crop_cycles() {
        // Neither overcrop nor undercrop: exactly the 10 active samples stay
        let result = crop_cycles(&padded_trace(), 0.5, 1).unwrap();
        assert_eq!(result.len(), 10);
        assert!(result.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_crop_is_not_idempotent() {
        // The cropped trace has no quiet run left, so a second crop must
        // fail loudly instead of returning a corrupted trace
        let cropped = crop_cycles(&padded_trace(), 0.5, 1).unwrap();
        let err = crop_cycles(&cropped, 0.5, 1).unwrap_err();
        assert!(matches!(err, ScaError::CropBoundaryNotFound { .. }));
    }

    #[test]
    fn test_crop_missing_trailing_padding() {
        let mut trace = vec![1.0; 500];
        trace.extend(vec![0.0; 500]);
        trace.extend(vec![1.0; 600]);

        let err = crop_cycles(&trace, 0.5, 1).unwrap_err();
        assert!(matches!(
            err,
            ScaError::CropBoundaryNotFound {
                side: CropSide::After,
                ..
            }
        ));
    }

    #[test]
    fn test_crop_scaled_guard() {
        // Two samples per cycle: padding runs must span 900 samples
        let mut trace = vec![1.0; 100];
        trace.extend(vec![0.0; 1000]);
        trace.extend(vec![1.0; 20]);
        trace.extend(vec![0.0; 1000]);
        trace.extend(vec![1.0; 100]);

        let result = crop_cycles(&trace, 0.5, 2).unwrap();
        assert_eq!(result.len(), 20);
        assert!(result.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_crop_empty_trace() {
        let err = crop_cycles(&Vec::new(), 0.5, 1).unwrap_err();
        assert!(matches!(err, ScaError::CropBoundaryNotFound { .. }));
    }
}
