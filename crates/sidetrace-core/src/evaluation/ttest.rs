//! Welch's t-test for leakage assessment
//!
//! Computes the unequal-variance two-sample t-statistic independently at
//! every sample index across two sets of traces (TVLA fixed-vs-random
//! methodology). Statistics accumulate one trace at a time, so batch jobs
//! can stream trace files through without materializing a whole corpus.
//!
//! When a set is constant at an index the variance is null and the ratio is
//! undefined; such indexes report 0, as no leakage is detected there. This
//! is common when traces come from models.

use crate::types::{ScaError, ScaResult, Trace};

/// Conventional TVLA pass/fail threshold on |t|.
pub const TVLA_THRESHOLD: f64 = 4.5;

/// Streaming per-index mean/variance accumulator (Welford updates).
///
/// Feed traces one at a time with [`add`](Self::add); every trace must have
/// the width fixed by the first one.
#[derive(Debug, Clone, Default)]
pub struct WelchAccumulator {
    count: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl WelchAccumulator {
    /// Create an empty accumulator; width is fixed by the first trace added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of traces accumulated.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Trace width (sample count per trace), 0 before the first add.
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Accumulate one trace.
    pub fn add(&mut self, trace: &[f64]) -> ScaResult<()> {
        if self.count == 0 {
            self.mean = vec![0.0; trace.len()];
            self.m2 = vec![0.0; trace.len()];
        } else if trace.len() != self.mean.len() {
            return Err(ScaError::DimensionMismatch {
                context: "trace width",
                expected: self.mean.len(),
                actual: trace.len(),
            });
        }

        self.count += 1;
        let n = self.count as f64;
        for (i, &x) in trace.iter().enumerate() {
            let delta = x - self.mean[i];
            self.mean[i] += delta / n;
            self.m2[i] += delta * (x - self.mean[i]);
        }
        Ok(())
    }

    /// Sample variance (ddof = 1) at one index; NaN with fewer than two
    /// traces.
    pub fn sample_variance(&self, index: usize) -> f64 {
        self.m2[index] / (self.count as f64 - 1.0)
    }

    /// Per-index mean values.
    pub fn means(&self) -> &[f64] {
        &self.mean
    }
}

/// Welch's t-statistic per sample index from two accumulated sets.
///
/// Indexes where the pooled variance term is zero or undefined report 0.
pub fn ttest_from_accumulators(
    set_a: &WelchAccumulator,
    set_b: &WelchAccumulator,
) -> ScaResult<Vec<f64>> {
    if set_a.count() == 0 || set_b.count() == 0 {
        return Err(ScaError::EmptyInput("trace set"));
    }
    if set_a.width() != set_b.width() {
        return Err(ScaError::DimensionMismatch {
            context: "trace set widths",
            expected: set_a.width(),
            actual: set_b.width(),
        });
    }

    let na = set_a.count() as f64;
    let nb = set_b.count() as f64;
    let stats = (0..set_a.width())
        .map(|i| {
            let se2 = set_a.sample_variance(i) / na + set_b.sample_variance(i) / nb;
            let t = (set_a.means()[i] - set_b.means()[i]) / se2.sqrt();
            if t.is_finite() {
                t
            } else {
                0.0
            }
        })
        .collect();
    Ok(stats)
}

/// Compute Welch's t-test between two sets of traces.
///
/// Sets are rows of equal width; the result has one statistic per sample
/// index.
///
/// # Example
///
/// ```rust
/// use sidetrace_core::evaluation::ttest;
///
/// let set_a = vec![vec![0., 0., 0., 1., 0., 0.], vec![0., 0., 1., 0., 0., 1.]];
/// let set_b = vec![vec![0., 0., 0., 1., 1., 0.], vec![0., 0., 1., 0., 0., 0.]];
/// let t = ttest(&set_a, &set_b).unwrap();
/// assert_eq!(t, vec![0.0, 0.0, 0.0, 0.0, -1.0, 1.0]);
/// ```
pub fn ttest(set_a: &[Trace], set_b: &[Trace]) -> ScaResult<Vec<f64>> {
    let mut acc_a = WelchAccumulator::new();
    for trace in set_a {
        acc_a.add(trace)?;
    }
    let mut acc_b = WelchAccumulator::new();
    for trace in set_b {
        acc_b.add(trace)?;
    }
    ttest_from_accumulators(&acc_a, &acc_b)
}

/// Count sample indexes whose |statistic| exceeds `threshold`.
pub fn count_leaky_samples(stats: &[f64], threshold: f64) -> usize {
    stats.iter().filter(|t| t.abs() > threshold).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ttest_reference_vectors() {
        // Constant columns must report exactly 0, not NaN
        let set_a = vec![
            vec![0., 0., 0., 1., 0., 0.],
            vec![0., 0., 1., 0., 0., 1.],
        ];
        let set_b = vec![
            vec![0., 0., 0., 1., 1., 0.],
            vec![0., 0., 1., 0., 0., 0.],
        ];
        let t = ttest(&set_a, &set_b).unwrap();
        assert_eq!(t.len(), 6);
        let expected = [0.0, 0.0, 0.0, 0.0, -1.0, 1.0];
        for (got, want) in t.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ttest_constant_different_means() {
        // Both sets constant but at different levels: still 0, never inf
        let set_a = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let set_b = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let t = ttest(&set_a, &set_b).unwrap();
        assert_eq!(t, vec![0.0, 0.0]);
    }

    #[test]
    fn test_ttest_width_mismatch() {
        let set_a = vec![vec![0.0, 1.0]];
        let set_b = vec![vec![0.0, 1.0, 2.0]];
        let err = ttest(&set_a, &set_b).unwrap_err();
        assert!(matches!(err, ScaError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_ttest_empty_set() {
        let set_a: Vec<Trace> = vec![];
        let set_b = vec![vec![0.0]];
        let err = ttest(&set_a, &set_b).unwrap_err();
        assert!(matches!(err, ScaError::EmptyInput(_)));
    }

    #[test]
    fn test_streaming_matches_batch() {
        let set_a = vec![
            vec![0.1, 0.9, 0.3],
            vec![0.2, 0.7, 0.1],
            vec![0.4, 0.8, 0.2],
        ];
        let set_b = vec![vec![0.5, 0.1, 0.3], vec![0.3, 0.2, 0.4]];

        let mut acc_a = WelchAccumulator::new();
        let mut acc_b = WelchAccumulator::new();
        for t in &set_a {
            acc_a.add(t).unwrap();
        }
        for t in &set_b {
            acc_b.add(t).unwrap();
        }

        let streamed = ttest_from_accumulators(&acc_a, &acc_b).unwrap();
        let batch = ttest(&set_a, &set_b).unwrap();
        for (s, b) in streamed.iter().zip(&batch) {
            assert_relative_eq!(s, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_count_leaky_samples() {
        let stats = [0.0, 5.0, -6.2, 4.4, 4.6];
        assert_eq!(count_leaky_samples(&stats, TVLA_THRESHOLD), 3);
    }
}
