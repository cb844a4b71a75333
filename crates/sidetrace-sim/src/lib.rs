//! # sidetrace-sim
//!
//! Simulated acquisition bench for side-channel research without hardware.
//!
//! This crate provides the collaborator boundaries the core pipeline
//! depends on, plus simulated implementations of each:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Analysis / CLI layer                    │
//! └─────────────────────────────────────────────────────────┘
//!            │                 │                  │
//!            ▼                 ▼                  ▼
//! ┌──────────────────┐ ┌───────────────┐ ┌─────────────────┐
//! │ Oscilloscope     │ │ Emulator      │ │ FirmwareConfig  │
//! │ arm/get/close    │ │ run           │ │ board + cipher  │
//! └──────────────────┘ └───────────────┘ └─────────────────┘
//!            ▲                 ▲
//!   ┌────────────────┐ ┌──────────────────┐
//!   │ SimulatedBench │ │ PipelineEmulator │
//!   └────────────────┘ └──────────────────┘
//! ```
//!
//! Concrete variants are selected at configuration time; anything
//! conforming to the traits plugs in without the pipeline noticing.

pub mod bench;
pub mod device;
pub mod emulator;
pub mod firmware;

// Re-exports
pub use bench::{BenchConfig, SimulatedBench};
pub use device::{Acquisition, Oscilloscope, SimError, SimResult};
pub use emulator::{Emulator, PipelineEmulator};
pub use firmware::{
    sbox_output, Board, Cipher, FirmwareConfig, AES_SBOX, NOP_PADDING, START_BYTE,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bench::{BenchConfig, SimulatedBench};
    pub use crate::device::{Acquisition, Oscilloscope};
    pub use crate::emulator::{Emulator, PipelineEmulator};
    pub use crate::firmware::{Board, Cipher, FirmwareConfig};
}
