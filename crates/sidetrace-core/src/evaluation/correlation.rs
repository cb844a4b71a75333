//! Pearson correlation and correlation-based key recovery
//!
//! Correlates trace columns against a reference vector, typically the
//! Hamming weight of a secret-dependent intermediate value. The key-byte
//! bruteforce repeats the correlation for all 256 candidate byte values;
//! the candidate with the highest-magnitude correlation is the most likely
//! key byte.
//!
//! Undefined correlations (zero variance in either operand) report 0:
//! a constant column carries no evidence of leakage.

use crate::types::{ScaError, ScaResult, Trace};

/// Pearson correlation coefficient between two equal-length slices.
///
/// Returns 0 when either operand has zero variance. The result is clamped
/// to [-1, 1] against floating-point drift.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    let r = cov / denom;
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Pearson correlation at each sample index of a trace set.
///
/// `reference` must hold one value per trace; the result has one
/// coefficient per sample index (trace width).
///
/// # Example
///
/// ```rust
/// use sidetrace_core::evaluation::correlation;
///
/// let traces = vec![
///     vec![0., 1., 0., 1., 0., 0.],
///     vec![1., 0., 1., 1., 1., 0.],
///     vec![0., 0., 1., 0., 0., 1.],
/// ];
/// let reference = vec![0.0, 0.0, 1.0];
/// let corr = correlation(&traces, &reference).unwrap();
/// assert!((corr[3] - -1.0).abs() < 1e-12);
/// assert!((corr[5] - 1.0).abs() < 1e-12);
/// ```
pub fn correlation(traces: &[Trace], reference: &[f64]) -> ScaResult<Vec<f64>> {
    if traces.is_empty() {
        return Err(ScaError::EmptyInput("trace set"));
    }
    if traces.len() != reference.len() {
        return Err(ScaError::DimensionMismatch {
            context: "reference length vs trace count",
            expected: traces.len(),
            actual: reference.len(),
        });
    }
    let width = traces[0].len();
    for trace in traces {
        if trace.len() != width {
            return Err(ScaError::DimensionMismatch {
                context: "trace width",
                expected: width,
                actual: trace.len(),
            });
        }
    }

    let mut column = vec![0.0; traces.len()];
    let corr = (0..width)
        .map(|i| {
            for (row, trace) in traces.iter().enumerate() {
                column[row] = trace[i];
            }
            pearson(&column, reference)
        })
        .collect();
    Ok(corr)
}

/// Hamming weight of the lower 16 bits of a value.
///
/// The 16-bit width matches the power model: bus and ALU transitions on the
/// profiled targets leak over a 16-bit datapath.
#[inline]
pub fn hamming_weight_16(value: u32) -> u32 {
    (value & 0xFFFF).count_ones()
}

/// Correlate leakage samples against all 256 candidate values of a key byte.
///
/// `samples` holds one scalar per trace (a leakage point already located);
/// `input_data` holds the public per-trace input handed to
/// `intermediate_fn` together with each candidate byte. Each candidate's
/// intermediate values are reduced to their lower-16-bit Hamming weight and
/// correlated against `samples`.
///
/// The candidate index with the highest |correlation| is the statistically
/// most likely key byte; ties are left to the caller.
pub fn correlation_bruteforce_key_byte<I, F>(
    samples: &[f64],
    input_data: &[I],
    intermediate_fn: F,
) -> ScaResult<[f64; 256]>
where
    F: Fn(&I, u8) -> u32,
{
    if samples.len() != input_data.len() {
        return Err(ScaError::DimensionMismatch {
            context: "samples vs input data",
            expected: samples.len(),
            actual: input_data.len(),
        });
    }
    if samples.is_empty() {
        return Err(ScaError::EmptyInput("leakage samples"));
    }

    let mut corr = [0.0; 256];
    let mut reference = vec![0.0; samples.len()];
    for (key_byte, slot) in corr.iter_mut().enumerate() {
        for (i, input) in input_data.iter().enumerate() {
            let inter = intermediate_fn(input, key_byte as u8);
            reference[i] = hamming_weight_16(inter) as f64;
        }
        *slot = pearson(samples, &reference);
    }
    Ok(corr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_correlation_reference_vectors() {
        let traces = vec![
            vec![0., 1., 0., 1., 0., 0.],
            vec![1., 0., 1., 1., 1., 0.],
            vec![0., 0., 1., 0., 0., 1.],
        ];
        let reference = vec![0.0, 0.0, 1.0];
        let corr = correlation(&traces, &reference).unwrap();

        let expected = [-0.5, -0.5, 0.5, -1.0, -0.5, 1.0];
        assert_eq!(corr.len(), expected.len());
        for (got, want) in corr.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_correlation_in_range() {
        let traces = vec![
            vec![0.3, -1.2, 4.5],
            vec![0.1, 2.2, -0.5],
            vec![0.9, 0.0, 1.5],
            vec![-0.4, 1.1, 2.5],
        ];
        let reference = vec![1.0, 2.0, 3.0, 4.0];
        let corr = correlation(&traces, &reference).unwrap();
        assert!(corr.iter().all(|r| (-1.0..=1.0).contains(r)));
    }

    #[test]
    fn test_correlation_degenerate_is_zero() {
        // Constant column and constant reference both report 0
        let traces = vec![vec![1.0, 0.5], vec![1.0, 0.7], vec![1.0, 0.9]];
        let corr = correlation(&traces, &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(corr[0], 0.0);
        assert_relative_eq!(corr[1], 1.0, epsilon = 1e-12);

        let constant_ref = correlation(&traces, &[3.0, 3.0, 3.0]).unwrap();
        assert_eq!(constant_ref, vec![0.0, 0.0]);
    }

    #[test]
    fn test_correlation_length_mismatch() {
        let traces = vec![vec![0.0], vec![1.0]];
        let err = correlation(&traces, &[0.0]).unwrap_err();
        assert!(matches!(err, ScaError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_hamming_weight_16() {
        assert_eq!(hamming_weight_16(0), 0);
        assert_eq!(hamming_weight_16(0xFFFF), 16);
        // Upper half-word is ignored
        assert_eq!(hamming_weight_16(0xFFFF_0000), 0);
        assert_eq!(hamming_weight_16(0b1011), 3);
    }

    #[test]
    fn test_bruteforce_xor_intermediate_structure() {
        // Noiseless Hamming-weight leakage of input XOR key. The linear XOR
        // intermediate correlates perfectly for the true key and perfectly
        // negatively for its complement; every other candidate sits strictly
        // between. (A nonlinear S-box intermediate breaks the complement
        // tie; that recovery property is exercised at the workspace level.)
        let true_key: u8 = 0x3C;
        let inputs: Vec<u8> = (0..=255).collect();
        let samples: Vec<f64> = inputs
            .iter()
            .map(|&p| hamming_weight_16((p ^ true_key) as u32) as f64)
            .collect();

        let corr = correlation_bruteforce_key_byte(&samples, &inputs, |&p, k| {
            (p ^ k) as u32
        })
        .unwrap();

        assert_relative_eq!(corr[true_key as usize], 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            corr[(true_key ^ 0xFF) as usize],
            -1.0,
            epsilon = 1e-12
        );
        for (k, &r) in corr.iter().enumerate() {
            if k != true_key as usize && k != (true_key ^ 0xFF) as usize {
                assert!(r.abs() < 1.0 - 1e-9, "key {k:#04x} correlates at {r}");
            }
        }

        // Positive argmax still pins the injected key
        let best = corr
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(best, true_key as usize);
    }

    #[test]
    fn test_bruteforce_length_mismatch() {
        let err =
            correlation_bruteforce_key_byte(&[1.0, 2.0], &[0u8], |&p, k| (p ^ k) as u32)
                .unwrap_err();
        assert!(matches!(err, ScaError::DimensionMismatch { .. }));
    }
}
