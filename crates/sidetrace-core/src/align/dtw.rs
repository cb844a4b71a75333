//! Dynamic time warping, asymmetric step pattern
//!
//! Aligns an acquisition trace (query) against a simulated per-instruction
//! trace (reference). The asymmetric step pattern advances the query index
//! by exactly one at every step while the reference index advances by 0, 1
//! or 2, so every query sample maps to exactly one reference index, while a
//! reference index may absorb zero, one or many query samples.
//!
//! The search is restricted to a slanted band around the straight-line
//! alignment, which bounds both runtime and memory to `O(len * window)`.

use crate::types::{ScaError, ScaResult};

/// A computed alignment between a query and a reference sequence.
#[derive(Debug, Clone)]
pub struct DtwAlignment {
    /// `(query_index, reference_index)` pairs in query order; every query
    /// index appears exactly once
    pub path: Vec<(usize, usize)>,
    /// Cumulative distance along the path
    pub distance: f64,
    /// Cumulative distance divided by the query length
    pub normalized_distance: f64,
}

/// Banded cost storage: one row per query index, holding only the bins
/// inside the slanted window.
struct BandedCost {
    rows: Vec<Vec<f64>>,
    offsets: Vec<usize>,
}

impl BandedCost {
    fn get(&self, i: usize, j: usize) -> f64 {
        let lo = self.offsets[i];
        let row = &self.rows[i];
        if j < lo || j >= lo + row.len() {
            f64::INFINITY
        } else {
            row[j - lo]
        }
    }
}

/// Align `query` against `reference` with the asymmetric step pattern and a
/// slanted band of half-width `window`.
///
/// The local cost is the Euclidean (absolute) distance between scalar
/// samples; the path runs from `(0, 0)` to the last index of both
/// sequences. Fails with [`ScaError::AlignmentInfeasible`] when no path
/// exists, which happens when the reference is more than twice the query
/// length or the band is too narrow for the required slope.
pub fn asymmetric_dtw(
    query: &[f64],
    reference: &[f64],
    window: usize,
) -> ScaResult<DtwAlignment> {
    let n = query.len();
    let m = reference.len();
    if n == 0 {
        return Err(ScaError::EmptyInput("alignment query"));
    }
    if m == 0 {
        return Err(ScaError::EmptyInput("alignment reference"));
    }

    let infeasible = || ScaError::AlignmentInfeasible {
        query_len: n,
        reference_len: m,
        window,
    };

    let slope = m as f64 / n as f64;
    let mut rows = Vec::with_capacity(n);
    let mut offsets = Vec::with_capacity(n);
    for i in 0..n {
        let center = i as f64 * slope;
        let lo = (center - window as f64).ceil().max(0.0) as usize;
        let hi = ((center + window as f64).floor() as usize).min(m - 1);
        if lo > hi {
            return Err(infeasible());
        }
        offsets.push(lo);
        rows.push(vec![f64::INFINITY; hi - lo + 1]);
    }
    let mut cost = BandedCost { rows, offsets };

    // First query sample must match the first reference sample
    if cost.offsets[0] != 0 {
        return Err(infeasible());
    }
    cost.rows[0][0] = (query[0] - reference[0]).abs();

    for i in 1..n {
        let lo = cost.offsets[i];
        for k in 0..cost.rows[i].len() {
            let j = lo + k;
            let best = cost
                .get(i - 1, j)
                .min(if j >= 1 { cost.get(i - 1, j - 1) } else { f64::INFINITY })
                .min(if j >= 2 { cost.get(i - 1, j - 2) } else { f64::INFINITY });
            if best.is_finite() {
                cost.rows[i][k] = (query[i] - reference[j]).abs() + best;
            }
        }
    }

    let distance = cost.get(n - 1, m - 1);
    if !distance.is_finite() {
        return Err(infeasible());
    }

    // Backtrack, preferring the diagonal step on ties
    let mut path = Vec::with_capacity(n);
    let mut j = m - 1;
    path.push((n - 1, j));
    for i in (1..n).rev() {
        let mut best_j = None;
        let mut best_cost = f64::INFINITY;
        for step in [1usize, 2, 0] {
            if step > j {
                continue;
            }
            let candidate = j - step;
            let c = cost.get(i - 1, candidate);
            if c < best_cost {
                best_cost = c;
                best_j = Some(candidate);
            }
        }
        // A finite cell always has a finite predecessor
        j = best_j.ok_or_else(infeasible)?;
        path.push((i - 1, j));
    }
    path.reverse();

    Ok(DtwAlignment {
        distance,
        normalized_distance: distance / n as f64,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_sequences_align_diagonally() {
        let series = vec![0.5, 2.0, -1.0, 3.5, 0.0];
        let alignment = asymmetric_dtw(&series, &series, 10).unwrap();

        assert_relative_eq!(alignment.distance, 0.0);
        let expected: Vec<(usize, usize)> = (0..series.len()).map(|i| (i, i)).collect();
        assert_eq!(alignment.path, expected);
    }

    #[test]
    fn test_query_covers_each_index_once() {
        let query = vec![1.0, 1.1, 5.0, 5.1, 9.0];
        let reference = vec![1.0, 5.0, 9.0];
        let alignment = asymmetric_dtw(&query, &reference, 10).unwrap();

        let query_indexes: Vec<usize> = alignment.path.iter().map(|p| p.0).collect();
        assert_eq!(query_indexes, vec![0, 1, 2, 3, 4]);

        // Reference index is non-decreasing, advancing by at most 2
        for pair in alignment.path.windows(2) {
            let step = pair[1].1 as i64 - pair[0].1 as i64;
            assert!((0..=2).contains(&step));
        }
        assert_eq!(alignment.path.last().unwrap().1, reference.len() - 1);
    }

    #[test]
    fn test_reference_index_can_be_skipped() {
        // The middle reference value matches nothing; the cheapest path
        // jumps over it
        let query = vec![1.0, 5.0];
        let reference = vec![1.0, 9.0, 5.0];
        let alignment = asymmetric_dtw(&query, &reference, 10).unwrap();

        assert_eq!(alignment.path, vec![(0, 0), (1, 2)]);
        assert_relative_eq!(alignment.distance, 0.0);
    }

    #[test]
    fn test_reference_too_long_is_infeasible() {
        let query = vec![1.0, 2.0];
        let reference = vec![0.0; 10];
        let err = asymmetric_dtw(&query, &reference, 20).unwrap_err();
        assert!(matches!(err, ScaError::AlignmentInfeasible { .. }));
    }

    #[test]
    fn test_band_too_narrow_is_infeasible() {
        // Slope 1 alignment shifted outside a zero-width band cannot close
        let query = vec![0.0; 4];
        let reference = vec![0.0; 8];
        let err = asymmetric_dtw(&query, &reference, 0).unwrap_err();
        assert!(matches!(err, ScaError::AlignmentInfeasible { .. }));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(matches!(
            asymmetric_dtw(&[], &[1.0], 5).unwrap_err(),
            ScaError::EmptyInput(_)
        ));
        assert!(matches!(
            asymmetric_dtw(&[1.0], &[], 5).unwrap_err(),
            ScaError::EmptyInput(_)
        ));
    }

    #[test]
    fn test_normalized_distance() {
        let query = vec![1.0, 2.0, 3.0, 4.0];
        let reference = vec![1.5, 2.5, 3.5, 4.5];
        let alignment = asymmetric_dtw(&query, &reference, 5).unwrap();
        assert_relative_eq!(alignment.distance, 2.0);
        assert_relative_eq!(alignment.normalized_distance, 0.5);
    }
}
