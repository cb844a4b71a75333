//! Simulated acquisition bench
//!
//! Stands in for the oscilloscope-plus-target bench: an [`Emulator`] runs
//! the firmware protocol, and the bench synthesizes what the scope would
//! capture: a Hamming-weight power trace expanded to per-cycle samples
//! with additive white Gaussian noise, a sinusoidal clock channel in
//! parallel, and the trigger activity bursts that frame the acquisition
//! before the leading and after the trailing NOP padding.
//!
//! The output feeds the exact pipeline real captures do: cycle extraction,
//! per-cycle downsampling and quiet-padding crop.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use sidetrace_core::Trace;

use crate::device::{Acquisition, Oscilloscope, SimError, SimResult};
use crate::emulator::Emulator;

/// Bench configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Target clock frequency in Hz
    pub clock_freq: f64,
    /// Oscilloscope samples per clock cycle
    pub samples_per_cycle: usize,
    /// Standard deviation of the additive noise, in Hamming-weight units
    pub noise_std: f64,
    /// Trigger-activity cycles framing the capture on each side
    pub trigger_cycles: usize,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            clock_freq: 8e6,
            samples_per_cycle: 25,
            noise_std: 0.05,
            trigger_cycles: 16,
            seed: None,
        }
    }
}

impl BenchConfig {
    /// Effective oscilloscope sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.clock_freq * self.samples_per_cycle as f64
    }
}

/// Amplitude of the trigger activity bursts, well above any kernel power.
const TRIGGER_AMPLITUDE: f64 = 12.0;

/// Simulated oscilloscope-plus-target bench.
pub struct SimulatedBench<E: Emulator> {
    emulator: E,
    config: BenchConfig,
    rng: StdRng,
    noise: Normal<f64>,
    armed: bool,
    pending: Option<Acquisition>,
}

impl<E: Emulator> SimulatedBench<E> {
    /// Create a bench around an emulated target.
    pub fn new(emulator: E, config: BenchConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        // Zero noise must stay exactly zero
        let noise = Normal::new(0.0, config.noise_std.max(f64::MIN_POSITIVE))
            .expect("noise std is non-negative");

        Self {
            emulator,
            config,
            rng,
            noise,
            armed: false,
            pending: None,
        }
    }

    /// The bench configuration.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run the target on one input text.
    ///
    /// When the scope is armed, the capture is recorded and can be fetched
    /// with [`Oscilloscope::get_trace`]; an unarmed run only returns the
    /// target's output bytes.
    pub fn execute(&mut self, input: &[u8]) -> SimResult<Vec<u8>> {
        let (output, exec_trace) = self.emulator.run(input)?;

        if self.armed {
            // One power level per instruction, held for nb_cycles cycles
            let mut cycle_powers = Vec::new();
            cycle_powers
                .extend((0..self.config.trigger_cycles).map(|_| TRIGGER_AMPLITUDE));
            for record in exec_trace.records() {
                let power = record.op2_value_current.count_ones() as f64;
                cycle_powers.extend((0..record.nb_cycles).map(|_| power));
            }
            cycle_powers
                .extend((0..self.config.trigger_cycles).map(|_| TRIGGER_AMPLITUDE));

            let spc = self.config.samples_per_cycle;
            let mut trace = Vec::with_capacity(cycle_powers.len() * spc);
            let mut clock = Vec::with_capacity(cycle_powers.len() * spc);
            for (cycle, power) in cycle_powers.iter().enumerate() {
                for s in 0..spc {
                    trace.push(power + if self.config.noise_std > 0.0 {
                        self.noise.sample(&mut self.rng)
                    } else {
                        0.0
                    });
                    let n = (cycle * spc + s) as f64;
                    clock.push((2.0 * PI * n / spc as f64).sin());
                }
            }

            debug!(
                samples = trace.len(),
                cycles = cycle_powers.len(),
                "bench capture"
            );
            self.pending = Some(Acquisition {
                trace,
                clock,
                sample_rate: self.config.sample_rate(),
            });
            self.armed = false;
        }

        Ok(output)
    }

    /// Arm, run and download, `average` times, element-wise averaging the
    /// captures (truncated to the shortest).
    ///
    /// Averaging repeated acquisitions of the same input reduces noise.
    pub fn run_and_acquire(
        &mut self,
        input: &[u8],
        average: usize,
    ) -> SimResult<(Vec<u8>, Trace, Trace)> {
        if average == 0 {
            return Err(SimError::InvalidInput("average must be at least 1".into()));
        }

        let mut traces: Vec<Trace> = Vec::with_capacity(average);
        let mut clocks: Vec<Trace> = Vec::with_capacity(average);
        let mut output = Vec::new();
        for _ in 0..average {
            self.arm()?;
            output = self.execute(input)?;
            let acquisition = self.get_trace()?;
            traces.push(acquisition.trace);
            clocks.push(acquisition.clock);
        }

        let min_len = traces.iter().map(Vec::len).min().unwrap_or(0);
        let scale = 1.0 / average as f64;
        let mut avg_trace = vec![0.0; min_len];
        let mut avg_clock = vec![0.0; min_len];
        for (trace, clock) in traces.iter().zip(&clocks) {
            for i in 0..min_len {
                avg_trace[i] += trace[i] * scale;
                avg_clock[i] += clock[i] * scale;
            }
        }

        Ok((output, avg_trace, avg_clock))
    }
}

impl<E: Emulator> Oscilloscope for SimulatedBench<E> {
    fn arm(&mut self) -> SimResult<()> {
        self.armed = true;
        self.pending = None;
        Ok(())
    }

    fn get_trace(&mut self) -> SimResult<Acquisition> {
        self.pending.take().ok_or(SimError::NotArmed)
    }

    fn close(&mut self) -> SimResult<()> {
        self.armed = false;
        self.pending = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::PipelineEmulator;
    use crate::firmware::Cipher;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiet_bench(padding: usize) -> SimulatedBench<PipelineEmulator> {
        let emulator = PipelineEmulator::new(Cipher::TinyAes).with_padding(padding);
        SimulatedBench::new(
            emulator,
            BenchConfig {
                samples_per_cycle: 10,
                noise_std: 0.0,
                seed: Some(3),
                ..Default::default()
            },
        )
    }

    fn any_input() -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(5);
        Cipher::TinyAes.generate_input(&mut rng, None).unwrap()
    }

    #[test]
    fn test_capture_shape() {
        let mut bench = quiet_bench(30);
        bench.arm().unwrap();
        bench.execute(&any_input()).unwrap();
        let acquisition = bench.get_trace().unwrap();

        assert_eq!(acquisition.trace.len(), acquisition.clock.len());
        // 2*30 padding + 16*(2+1+2+2) kernel cycles + 2*16 trigger cycles
        let cycles = 60 + 112 + 32;
        assert_eq!(acquisition.trace.len(), cycles * 10);
        assert_eq!(acquisition.sample_rate, 8e6 * 10.0);
    }

    #[test]
    fn test_get_trace_requires_arm() {
        let mut bench = quiet_bench(4);
        bench.execute(&any_input()).unwrap();
        assert!(matches!(
            bench.get_trace().unwrap_err(),
            SimError::NotArmed
        ));
    }

    #[test]
    fn test_trigger_bursts_frame_the_capture() {
        let mut bench = quiet_bench(30);
        bench.arm().unwrap();
        bench.execute(&any_input()).unwrap();
        let acquisition = bench.get_trace().unwrap();

        let spc = 10;
        let lead = &acquisition.trace[..16 * spc];
        assert!(lead.iter().all(|&x| x == TRIGGER_AMPLITUDE));
        // Padding right after the lead burst is quiet
        let pad = &acquisition.trace[16 * spc..(16 + 30) * spc];
        assert!(pad.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_averaging_reduces_noise() {
        let make = |seed| {
            let emulator =
                PipelineEmulator::new(Cipher::TinyAes).with_padding(10);
            SimulatedBench::new(
                emulator,
                BenchConfig {
                    samples_per_cycle: 4,
                    noise_std: 0.5,
                    seed: Some(seed),
                    ..Default::default()
                },
            )
        };
        let input = any_input();

        let (_, single, _) = make(1).run_and_acquire(&input, 1).unwrap();
        let (_, averaged, _) = make(2).run_and_acquire(&input, 64).unwrap();

        // Compare noise power over the quiet padding region
        let spc = 4;
        let quiet = |t: &[f64]| {
            t[16 * spc..(16 + 10) * spc]
                .iter()
                .map(|x| x * x)
                .sum::<f64>()
        };
        assert!(quiet(&averaged) < quiet(&single) / 4.0);
    }
}
