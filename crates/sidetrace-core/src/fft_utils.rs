//! FFT utilities for trace spectral analysis
//!
//! Wraps `rustfft` with cached plans and provides the length-normalized
//! real-input spectrum used by the clock analyzer.
//!
//! ## Spectrum convention
//!
//! For a real trace of length `N` sampled at `fs`, the spectrum keeps the
//! `N/2 + 1` non-negative frequency bins of the complex FFT, each divided
//! by `N`. Bin `k` sits at `k * fs / N` Hz, so the frequency resolution is
//! `fs / N`. A unit-amplitude sinusoid therefore shows up as a bin of
//! magnitude 0.5 (half the energy is in the mirrored negative bin).

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

use crate::types::Trace;

/// FFT processor with a cached plan for one transform size.
pub struct FftProcessor {
    /// FFT size
    size: usize,
    /// Forward FFT instance
    fft_forward: Arc<dyn Fft<f64>>,
    /// Scratch buffer for FFT operations
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftProcessor")
            .field("size", &self.size)
            .finish()
    }
}

impl FftProcessor {
    /// Create a new FFT processor for the given size.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::new(0.0, 0.0); fft_forward.get_inplace_scratch_len()];

        Self {
            size,
            fft_forward,
            scratch,
        }
    }

    /// Get the FFT size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Compute the forward FFT in-place.
    pub fn fft_inplace(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_forward
            .process_with_scratch(buffer, &mut self.scratch);
    }

    /// Compute the forward FFT of a real trace, returning the full complex
    /// spectrum.
    pub fn fft_real(&mut self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> =
            input.iter().map(|&x| Complex64::new(x, 0.0)).collect();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));
        self.fft_inplace(&mut buffer);
        buffer
    }
}

/// Length-normalized spectrum of a real trace (non-negative frequencies).
#[derive(Debug, Clone)]
pub struct RealSpectrum {
    /// Complex bin values, divided by the trace length
    pub bins: Vec<Complex64>,
    /// Frequency of each bin in Hz
    pub frequencies: Vec<f64>,
    /// Frequency resolution in Hz (`sample_rate / len`)
    pub resolution: f64,
    /// Sample rate the trace was acquired at
    pub sample_rate: f64,
}

impl RealSpectrum {
    /// Compute the normalized real spectrum of `trace`.
    ///
    /// The transform length equals the trace length; no zero padding or
    /// windowing is applied, so the result is bit-reproducible for a given
    /// input.
    pub fn compute(trace: &Trace, sample_rate: f64) -> Self {
        let n = trace.len();
        let mut processor = FftProcessor::new(n);
        let full = processor.fft_real(trace);

        let scale = 1.0 / n as f64;
        let half = n / 2 + 1;
        let bins: Vec<Complex64> = full[..half].iter().map(|&c| c * scale).collect();

        let resolution = sample_rate / n as f64;
        let frequencies: Vec<f64> = (0..half).map(|k| k as f64 * resolution).collect();

        Self {
            bins,
            frequencies,
            resolution,
            sample_rate,
        }
    }

    /// Number of frequency bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True when the spectrum holds no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Magnitude of each bin.
    pub fn magnitudes(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.norm()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_real_spectrum_single_tone() {
        let n = 1000;
        let sample_rate = 1000.0;
        let freq = 50.0;

        let trace: Trace = (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect();

        let spectrum = RealSpectrum::compute(&trace, sample_rate);
        assert_eq!(spectrum.len(), n / 2 + 1);
        assert_relative_eq!(spectrum.resolution, 1.0, epsilon = 1e-12);

        // Unit sinusoid: bin magnitude 0.5 at the tone, near zero elsewhere
        let mags = spectrum.magnitudes();
        assert_relative_eq!(mags[50], 0.5, epsilon = 1e-9);
        assert!(mags[49] < 1e-9);
        assert!(mags[51] < 1e-9);
    }

    #[test]
    fn test_real_spectrum_dc() {
        let trace: Trace = vec![2.0; 64];
        let spectrum = RealSpectrum::compute(&trace, 64.0);
        assert_relative_eq!(spectrum.bins[0].re, 2.0, epsilon = 1e-12);
        assert!(spectrum.magnitudes()[1] < 1e-12);
    }

    #[test]
    fn test_fft_processor_size() {
        let processor = FftProcessor::new(128);
        assert_eq!(processor.size(), 128);
    }
}
