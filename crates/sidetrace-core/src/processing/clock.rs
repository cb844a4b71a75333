//! Spectral clock recovery
//!
//! Find the CPU clock frequency and phase in an acquired trace by searching
//! the normalized real spectrum for the clock spike. The frequency and phase
//! of that spike let a caller align the trace with clock cycles.
//!
//! Spectral cycle cutting is imprecise when clock jitter occurs: with a
//! crystal oscillator, the observed clock frequency can differ between code
//! regions executing different instructions. When profiling a small region
//! surrounded by quiet padding, prefer [`crate::processing::crop_cycles`]
//! with `samples_per_cycle = sample_rate / freq_estimated`.

use tracing::debug;

use crate::fft_utils::RealSpectrum;
use crate::types::{ScaError, ScaResult, Trace};

/// A recovered clock frequency and phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockEstimate {
    /// Clock frequency in Hz
    pub frequency: f64,
    /// Phase of the clock spike in degrees
    pub phase_degrees: f64,
}

/// Spectral clock search configuration.
///
/// The search is deliberately strict: it fails unless exactly one spectral
/// peak survives the threshold and precision filters. Zero or multiple
/// survivors mean the parameters cannot disambiguate the clock, and the
/// caller must adjust them; averaging across peaks is never done silently.
#[derive(Debug, Clone, Copy)]
pub struct ClockFinder {
    /// Trace sample rate in Hz
    sample_rate: f64,
    /// Estimated clock frequency in Hz
    freq_estimated: f64,
    /// Accepted deviation from the estimate in Hz
    freq_precision: f64,
    /// Minimum normalized bin magnitude for a candidate peak
    threshold: f64,
}

impl ClockFinder {
    /// Create a clock finder with the acquisition defaults: 8 MHz clock
    /// estimate, 1 kHz precision, 2e-4 magnitude threshold.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            freq_estimated: 8e6,
            freq_precision: 1e3,
            threshold: 2e-4,
        }
    }

    /// Set the estimated clock frequency in Hz.
    pub fn with_estimate(mut self, freq_estimated: f64) -> Self {
        self.freq_estimated = freq_estimated;
        self
    }

    /// Set the accepted deviation from the estimate in Hz.
    pub fn with_precision(mut self, freq_precision: f64) -> Self {
        self.freq_precision = freq_precision;
        self
    }

    /// Set the minimum normalized magnitude for candidate peaks.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Search `trace` for the clock spike.
    pub fn find(&self, trace: &Trace) -> ScaResult<ClockEstimate> {
        if trace.is_empty() {
            return Err(ScaError::EmptyInput("clock search trace"));
        }

        let spectrum = RealSpectrum::compute(trace, self.sample_rate);

        // Candidate spikes: every bin at or above the magnitude threshold,
        // then narrowed to the estimate +/- precision band.
        let mut matches: Vec<(f64, f64)> = Vec::new();
        for (bin, &value) in spectrum.bins.iter().enumerate() {
            if value.norm() < self.threshold {
                continue;
            }
            let freq = spectrum.frequencies[bin];
            if (freq - self.freq_estimated).abs() <= self.freq_precision {
                matches.push((freq, value.arg().to_degrees()));
            }
        }

        debug!(
            candidates = matches.len(),
            resolution_hz = spectrum.resolution,
            "spectral clock search"
        );

        match matches.as_slice() {
            [(frequency, phase_degrees)] => Ok(ClockEstimate {
                frequency: *frequency,
                phase_degrees: *phase_degrees,
            }),
            _ => Err(ScaError::AmbiguousFrequency {
                estimated_hz: self.freq_estimated,
                precision_hz: self.freq_precision,
                candidates: matches.len(),
            }),
        }
    }
}

/// Find the CPU clock frequency and phase from a trace.
///
/// Convenience wrapper over [`ClockFinder`]; returns `(frequency_hz,
/// phase_degrees)`.
pub fn find_clock_freq_phase(
    trace: &Trace,
    freq_estimated: f64,
    freq_precision: f64,
    threshold: f64,
    sample_rate: f64,
) -> ScaResult<(f64, f64)> {
    let estimate = ClockFinder::new(sample_rate)
        .with_estimate(freq_estimated)
        .with_precision(freq_precision)
        .with_threshold(threshold)
        .find(trace)?;
    Ok((estimate.frequency, estimate.phase_degrees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sinusoid(freq: f64, sample_rate: f64, seconds: f64) -> Trace {
        let n = (seconds * sample_rate) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_find_clock_freq_phase() {
        // One second of a 1001 Hz sinusoid at 10 kHz: the spike must land on
        // 1001 Hz with a -90 degree phase (sine = cosine delayed by 90).
        let trace = sinusoid(1001.0, 1e4, 1.0);
        let (freq, phase) =
            find_clock_freq_phase(&trace, 1000.0, 10.0, 2e-4, 1e4).unwrap();
        assert_eq!(freq.round(), 1001.0);
        assert_eq!(phase.round(), -90.0);
    }

    #[test]
    fn test_no_peak_in_band() {
        let trace = sinusoid(5000.0, 1e5, 0.1);
        let err = ClockFinder::new(1e5)
            .with_estimate(1000.0)
            .with_precision(10.0)
            .find(&trace)
            .unwrap_err();
        assert!(matches!(
            err,
            ScaError::AmbiguousFrequency { candidates: 0, .. }
        ));
    }

    #[test]
    fn test_multiple_peaks_rejected() {
        // Two tones inside the acceptance band
        let sample_rate = 1e4;
        let a = sinusoid(995.0, sample_rate, 1.0);
        let b = sinusoid(1005.0, sample_rate, 1.0);
        let trace: Trace = a.iter().zip(&b).map(|(x, y)| x + y).collect();

        let err = ClockFinder::new(sample_rate)
            .with_estimate(1000.0)
            .with_precision(10.0)
            .find(&trace)
            .unwrap_err();
        assert!(matches!(
            err,
            ScaError::AmbiguousFrequency { candidates: 2, .. }
        ));
    }

    #[test]
    fn test_empty_trace() {
        let err = ClockFinder::new(1e4).find(&Vec::new()).unwrap_err();
        assert!(matches!(err, ScaError::EmptyInput(_)));
    }
}
