//! Digital filters for clock-channel conditioning
//!
//! Provides a biquad (second-order section) filter and a Butterworth
//! high-pass design. Cycle extraction runs the clock channel through a
//! single second-order section; the section form is numerically stable
//! where an expanded polynomial transfer function is not.
//!
//! Filtering is forward-only: no phase compensation is performed, cycle
//! boundaries are defined by the sign changes of the raw filtered output.

use std::f64::consts::PI;

use crate::types::Trace;

/// A single biquad (second-order section) filter.
///
/// Transfer function: `H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)`
///
/// Uses Direct Form II Transposed for better numerical properties.
#[derive(Debug, Clone)]
pub struct Biquad {
    /// Numerator coefficients [b0, b1, b2]
    b: [f64; 3],
    /// Denominator coefficients [a1, a2] (a0 is normalized to 1)
    a: [f64; 2],
    /// State variables for Direct Form II Transposed
    state: [f64; 2],
}

impl Biquad {
    /// Create a new biquad section with given coefficients.
    ///
    /// # Arguments
    /// * `b` - Numerator coefficients [b0, b1, b2]
    /// * `a` - Denominator coefficients [a1, a2] (a0 assumed to be 1)
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self {
            b,
            a,
            state: [0.0; 2],
        }
    }

    /// Design a 2nd-order Butterworth high-pass section.
    ///
    /// Bilinear transform of the analog Butterworth prototype with frequency
    /// prewarping at the cutoff, so the -3 dB point lands exactly on
    /// `cutoff_hz`.
    ///
    /// # Panics
    /// Panics if `cutoff_hz` is not strictly between 0 and Nyquist.
    pub fn butterworth_highpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        assert!(
            cutoff_hz > 0.0 && cutoff_hz < sample_rate / 2.0,
            "cutoff must be between 0 and Nyquist"
        );

        let omega = 2.0 * PI * cutoff_hz / sample_rate;
        let cos_w = omega.cos();
        let alpha = omega.sin() / 2.0_f64.sqrt();

        let a0 = 1.0 + alpha;
        let b = [
            (1.0 + cos_w) / (2.0 * a0),
            -(1.0 + cos_w) / a0,
            (1.0 + cos_w) / (2.0 * a0),
        ];
        let a = [-2.0 * cos_w / a0, (1.0 - alpha) / a0];

        Self::new(b, a)
    }

    /// Process a single sample using Direct Form II Transposed.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[0] * output + self.state[1];
        self.state[1] = self.b[2] * input - self.a[1] * output;
        output
    }

    /// Filter a whole trace forward, from zero initial state.
    pub fn process_block(&mut self, input: &[f64]) -> Trace {
        input.iter().map(|&x| self.process(x)).collect()
    }

    /// Reset the filter state.
    pub fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    /// Get the numerator coefficients.
    pub fn numerator(&self) -> &[f64; 3] {
        &self.b
    }

    /// Get the denominator coefficients.
    pub fn denominator(&self) -> &[f64; 2] {
        &self.a
    }

    /// Check if this biquad is stable (poles inside unit circle).
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }
}
