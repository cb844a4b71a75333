//! Acquisition device boundary
//!
//! Common interface for oscilloscopes. Hardware drivers live outside this
//! workspace; anything that can arm, deliver a trace-plus-clock pair and
//! close conforms here, and the rest of the pipeline never knows the
//! difference between a bench instrument and the simulator.

use sidetrace_core::{ScaError, Trace};
use thiserror::Error;

/// Result type for acquisition and emulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors from the acquisition/emulation boundary.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// `get_trace` was called with no armed acquisition pending.
    #[error("oscilloscope is not armed")]
    NotArmed,

    /// The input text does not match the cipher's expected layout.
    #[error("invalid input text: {0}")]
    InvalidInput(String),

    /// The emulated target failed.
    #[error("emulation failed: {0}")]
    Emulation(String),

    /// A core processing error bubbled up.
    #[error(transparent)]
    Core(#[from] ScaError),
}

/// One armed-and-triggered capture: power trace and clock channel acquired
/// in parallel, same length and sample rate.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Side-channel power trace
    pub trace: Trace,
    /// Clock channel, used only to derive cycle boundaries
    pub clock: Trace,
    /// Sample rate of both channels in Hz
    pub sample_rate: f64,
}

/// Common interface for oscilloscopes.
pub trait Oscilloscope {
    /// Arm to acquire the next trigger.
    fn arm(&mut self) -> SimResult<()>;

    /// Download the acquired data.
    fn get_trace(&mut self) -> SimResult<Acquisition>;

    /// Close the connection.
    fn close(&mut self) -> SimResult<()>;
}
