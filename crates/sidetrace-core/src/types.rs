//! Core types for side-channel trace processing
//!
//! This module defines the fundamental types used throughout the sidetrace
//! library: sample and trace aliases, and the error taxonomy shared by the
//! processing, evaluation and alignment modules.
//!
//! ## Traces
//!
//! A trace is an ordered sequence of `f64` samples at a fixed sample rate.
//! There are no timestamps: `index / sample_rate` is the time of a sample.
//! Hardware acquisitions are raw voltage-like floats; simulated traces hold
//! one power estimate per instruction.

use thiserror::Error;

/// A single power or voltage sample.
pub type Sample = f64;

/// A time-ordered buffer of samples at a fixed sample rate.
pub type Trace = Vec<Sample>;

/// Result type for trace processing and evaluation operations.
pub type ScaResult<T> = Result<T, ScaError>;

/// Errors that can occur during trace processing, evaluation or alignment.
///
/// Degenerate statistics (zero variance) are deliberately NOT part of this
/// taxonomy: they are a defined numeric policy (the statistic is reported as
/// 0, meaning "no detected leakage"), not a failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaError {
    /// Spectral clock search found zero or multiple candidate peaks.
    ///
    /// The caller must narrow the frequency precision or raise the magnitude
    /// threshold; averaging across multiple peaks is never done silently.
    #[error(
        "expected exactly one spectral peak within {precision_hz} Hz of \
         {estimated_hz} Hz, found {candidates}"
    )]
    AmbiguousFrequency {
        estimated_hz: f64,
        precision_hz: f64,
        candidates: usize,
    },

    /// No qualifying quiet run was found on one side of the trace.
    ///
    /// Signals that the firmware padding assumption was violated; never
    /// silently approximated.
    #[error("no quiet run of {min_len} samples found {side} the region of interest")]
    CropBoundaryNotFound {
        side: CropSide,
        min_len: usize,
    },

    /// Two inputs that must agree in length or width do not.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// No valid warping path exists for the given sequences and band.
    #[error(
        "no feasible alignment path for {query_len} acquisition samples against \
         {reference_len} instructions (window {window})"
    )]
    AlignmentInfeasible {
        query_len: usize,
        reference_len: usize,
        window: usize,
    },

    /// An operation was handed an empty trace or trace set.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Malformed execution-trace CSV.
    #[error("execution trace parse error at line {line}: {reason}")]
    ExecutionTraceParse { line: usize, reason: String },

    /// An execution trace is missing its NOP padding on one side.
    #[error("no NOP padding found {side} the execution trace midpoint")]
    NopPaddingNotFound { side: CropSide },

    /// Underlying I/O failure while reading or writing an execution trace.
    #[error("execution trace I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ScaError {
    fn from(err: std::io::Error) -> Self {
        ScaError::Io(err.to_string())
    }
}

/// Which side of the region of interest a crop search failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropSide {
    Before,
    After,
}

impl std::fmt::Display for CropSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CropSide::Before => write!(f, "before"),
            CropSide::After => write!(f, "after"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_frequency_display() {
        let err = ScaError::AmbiguousFrequency {
            estimated_hz: 8e6,
            precision_hz: 1e3,
            candidates: 3,
        };
        assert!(err.to_string().contains("found 3"));
    }

    #[test]
    fn test_crop_side_display() {
        assert_eq!(CropSide::Before.to_string(), "before");
        assert_eq!(CropSide::After.to_string(), "after");
    }
}
