//! Leakage evaluation
//!
//! Statistical tests quantifying how much a set of traces depends on
//! secret-dependent intermediate values: Welch's t-test (TVLA
//! fixed-vs-random), Pearson correlation against a reference vector, and
//! single-key-byte correlation bruteforce.
//!
//! All statistics are pure functions of their inputs and always finite:
//! degenerate zero-variance cases report 0 ("no detected leakage") rather
//! than NaN.

pub mod correlation;
pub mod ttest;

pub use correlation::{
    correlation, correlation_bruteforce_key_byte, hamming_weight_16, pearson,
};
pub use ttest::{
    count_leaky_samples, ttest, ttest_from_accumulators, WelchAccumulator,
    TVLA_THRESHOLD,
};
