//! Clock-cycle extraction
//!
//! Derives per-cycle sample boundaries from a clock channel acquired in
//! parallel with the signal trace. The clock is high-pass filtered to
//! suppress low-frequency drift, then a cycle boundary is emitted at every
//! falling zero-crossing of the filtered signal.
//!
//! Boundaries are sample-quantized: no interpolation between samples.

use tracing::debug;

use crate::filters::Biquad;
use crate::types::{ScaError, ScaResult, Trace};

/// Find CPU cycle boundaries from a clock channel.
///
/// Applies a 2nd-order Butterworth high-pass (cutoff at the estimated clock
/// frequency) forward over the clock, then returns the index of every
/// transition from non-negative to negative. The result is monotonically
/// increasing, with length equal to the number of full clock periods
/// observed minus edge effects.
pub fn find_cycles(clock: &Trace, freq_estimated: f64, sample_rate: f64) -> Vec<usize> {
    let mut filter = Biquad::butterworth_highpass(freq_estimated, sample_rate);
    let filtered = filter.process_block(clock);

    let cycles: Vec<usize> = filtered
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] >= 0.0 && w[1] < 0.0)
        .map(|(i, _)| i)
        .collect();

    debug!(cycles = cycles.len(), samples = clock.len(), "cycle extraction");
    cycles
}

/// Downsample a trace to one sample per clock cycle.
///
/// Each cycle keeps the maximum sample in `[cycles[i], cycles[i + 1])`, then
/// the mean of the downsampled trace is subtracted. This is the acquisition
/// post-processing step that turns a raw oscilloscope capture into a
/// cycle-rate trace comparable with simulated per-instruction traces.
pub fn downsample_per_cycle(trace: &Trace, cycles: &[usize]) -> ScaResult<Trace> {
    if cycles.len() < 2 {
        return Err(ScaError::EmptyInput("cycle boundaries"));
    }

    let mut downsampled = Vec::with_capacity(cycles.len() - 1);
    for pair in cycles.windows(2) {
        let start = pair[0].min(trace.len());
        let end = pair[1].min(trace.len());
        let max = trace[start..end]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        downsampled.push(max);
    }

    let mean = downsampled.iter().sum::<f64>() / downsampled.len() as f64;
    for sample in downsampled.iter_mut() {
        *sample -= mean;
    }

    Ok(downsampled)
}
