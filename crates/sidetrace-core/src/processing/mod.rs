//! Trace processing
//!
//! Turns raw acquisitions into cycle-rate traces ready for evaluation:
//! spectral clock recovery, cycle boundary extraction from a clock channel,
//! per-cycle downsampling and quiet-padding crop.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sidetrace_core::processing::{crop_cycles, find_cycles, downsample_per_cycle};
//!
//! let trace: Vec<f64> = vec![]; // acquired power trace
//! let clock: Vec<f64> = vec![]; // acquired clock channel
//!
//! let cycles = find_cycles(&clock, 8e6, 250e6);
//! let per_cycle = downsample_per_cycle(&trace, &cycles)?;
//! let cropped = crop_cycles(&per_cycle, 0.005, 1)?;
//! # Ok::<(), sidetrace_core::ScaError>(())
//! ```

pub mod clock;
pub mod crop;
pub mod cycles;

pub use clock::{find_clock_freq_phase, ClockEstimate, ClockFinder};
pub use crop::{crop_cycles, CycleCropper, DEFAULT_GUARD_CYCLES};
pub use cycles::{downsample_per_cycle, find_cycles};
