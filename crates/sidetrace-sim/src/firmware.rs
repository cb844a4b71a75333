//! Firmware and cipher descriptors
//!
//! The profiling firmware runs on the target board, reads an input text
//! over serial, executes the selected block cipher between two runs of 500
//! `NOP` instructions, and writes the result back. Building and flashing
//! happen outside this workspace; what the pipeline needs from firmware is
//! captured here: the per-cipher input layout, the artifact path a build
//! produces, and the first-round intermediate used for key-recovery
//! evaluation.
//!
//! ## Input text layout
//!
//! ```text
//! ┌──────┬─────────┬────────┬─────────┬───────────┐
//! │ 0xAE │   key   │   iv   │  mask   │  message  │
//! └──────┴─────────┴────────┴─────────┴───────────┘
//! ```
//!
//! The leading start byte triggers the firmware; all lengths are per-cipher.

use std::fmt;
use std::path::PathBuf;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::device::{SimError, SimResult};

/// Start byte every input text leads with.
pub const START_BYTE: u8 = 0xAE;

/// Nominal NOP padding instruction count on each side of the cipher.
pub const NOP_PADDING: usize = 500;

/// Supported target boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Board {
    /// ST Discovery STM32F051
    #[default]
    DiscoF051R8,
    /// ST Discovery STM32F100
    DiscoF100RB,
    /// BBC Micro:bit v1 (nRF51822)
    BbcMicrobit,
    /// Host-native build, emulation only
    Native,
}

impl Board {
    /// Build-environment name of the board.
    pub fn name(&self) -> &'static str {
        match self {
            Board::DiscoF051R8 => "disco_f051r8",
            Board::DiscoF100RB => "disco_f100rb",
            Board::BbcMicrobit => "bbcmicrobit",
            Board::Native => "native",
        }
    }

    /// Parse a build-environment name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "disco_f051r8" => Some(Board::DiscoF051R8),
            "disco_f100rb" => Some(Board::DiscoF100RB),
            "bbcmicrobit" => Some(Board::BbcMicrobit),
            "native" => Some(Board::Native),
            _ => None,
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Block ciphers the firmware can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Cipher {
    /// Unmasked AES-128
    #[default]
    TinyAes,
    /// Byte-masked AES-128
    ByteMaskedAes,
    /// Xoodoo permutation
    Xoodoo,
    /// Randomly generated straight-line code, reseeded per input
    GeneratedCode,
}

impl Cipher {
    /// All supported ciphers.
    pub const ALL: [Cipher; 4] = [
        Cipher::TinyAes,
        Cipher::ByteMaskedAes,
        Cipher::Xoodoo,
        Cipher::GeneratedCode,
    ];

    /// Firmware name of the cipher.
    pub fn name(&self) -> &'static str {
        match self {
            Cipher::TinyAes => "tinyaes",
            Cipher::ByteMaskedAes => "byte-masked-aes",
            Cipher::Xoodoo => "xoodoo",
            Cipher::GeneratedCode => "generated-code",
        }
    }

    /// Parse a firmware cipher name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "tinyaes" => Some(Cipher::TinyAes),
            "byte-masked-aes" | "bytemaskedaes" => Some(Cipher::ByteMaskedAes),
            "xoodoo" => Some(Cipher::Xoodoo),
            "generated-code" | "generatedcode" => Some(Cipher::GeneratedCode),
            _ => None,
        }
    }

    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        16
    }

    /// Initialization-value length in bytes.
    pub fn iv_length(&self) -> usize {
        match self {
            Cipher::Xoodoo => 16,
            _ => 0,
        }
    }

    /// Mask length in bytes.
    pub fn mask_length(&self) -> usize {
        match self {
            Cipher::ByteMaskedAes => 10,
            _ => 0,
        }
    }

    /// Message length in bytes.
    pub fn msg_length(&self) -> usize {
        16
    }

    /// Total input length, excluding the start byte.
    pub fn input_length(&self) -> usize {
        self.key_length() + self.iv_length() + self.mask_length() + self.msg_length()
    }

    /// Byte offset of the message inside the input text (after the start
    /// byte).
    pub fn msg_offset(&self) -> usize {
        1 + self.key_length() + self.iv_length() + self.mask_length()
    }

    /// Generate an input text: start byte, key (fixed or random), random
    /// iv/mask/message.
    pub fn generate_input<R: Rng>(
        &self,
        rng: &mut R,
        fixed_key: Option<&[u8]>,
    ) -> SimResult<Vec<u8>> {
        let mut input = Vec::with_capacity(1 + self.input_length());
        input.push(START_BYTE);

        match fixed_key {
            Some(key) => {
                if key.len() < self.key_length() {
                    return Err(SimError::InvalidInput(format!(
                        "key too short: {} < {}",
                        key.len(),
                        self.key_length()
                    )));
                }
                input.extend_from_slice(&key[..self.key_length()]);
            }
            None => {
                input.extend((0..self.key_length()).map(|_| rng.gen::<u8>()));
            }
        }

        let random_tail =
            self.iv_length() + self.mask_length() + self.msg_length();
        input.extend((0..random_tail).map(|_| rng.gen::<u8>()));
        Ok(input)
    }

    /// Validate an input text against this cipher's layout.
    pub fn check_input(&self, input: &[u8]) -> SimResult<()> {
        if input.len() != 1 + self.input_length() {
            return Err(SimError::InvalidInput(format!(
                "expected {} bytes, got {}",
                1 + self.input_length(),
                input.len()
            )));
        }
        if input[0] != START_BYTE {
            return Err(SimError::InvalidInput(format!(
                "missing start byte {START_BYTE:#04x}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicit firmware build configuration.
///
/// Replaces environment-variable plumbing into the external build tool:
/// everything the build needs travels in this struct, and the only thing
/// the pipeline gets back is the artifact path.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FirmwareConfig {
    /// Target board / build environment
    pub board: Board,
    /// Cipher the firmware embeds
    pub cipher: Cipher,
    /// Compile with power-model instrumentation hooks
    pub model_hooks: bool,
    /// Compile without clock-tree init, for emulators that lack RCC
    pub qemu: bool,
}

impl FirmwareConfig {
    /// Path of the firmware artifact this configuration builds to.
    pub fn artifact_path(&self) -> PathBuf {
        let mut variant = String::new();
        if self.model_hooks {
            variant.push_str("-model");
        }
        if self.qemu {
            variant.push_str("-qemu");
        }
        PathBuf::from(format!(
            ".pio/build/{}/firmware-{}{variant}.elf",
            self.board, self.cipher
        ))
    }
}

/// AES S-box.
pub const AES_SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b,
    0xfe, 0xd7, 0xab, 0x76, 0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0,
    0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4, 0x72, 0xc0, 0xb7, 0xfd, 0x93, 0x26,
    0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71, 0xd8, 0x31, 0x15,
    0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2,
    0xeb, 0x27, 0xb2, 0x75, 0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0,
    0x52, 0x3b, 0xd6, 0xb3, 0x29, 0xe3, 0x2f, 0x84, 0x53, 0xd1, 0x00, 0xed,
    0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb, 0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf,
    0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45, 0xf9, 0x02, 0x7f,
    0x50, 0x3c, 0x9f, 0xa8, 0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5,
    0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2, 0xcd, 0x0c, 0x13, 0xec,
    0x5f, 0x97, 0x44, 0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73,
    0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a, 0x90, 0x88, 0x46, 0xee, 0xb8, 0x14,
    0xde, 0x5e, 0x0b, 0xdb, 0xe0, 0x32, 0x3a, 0x0a, 0x49, 0x06, 0x24, 0x5c,
    0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79, 0xe7, 0xc8, 0x37, 0x6d,
    0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08,
    0xba, 0x78, 0x25, 0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f,
    0x4b, 0xbd, 0x8b, 0x8a, 0x70, 0x3e, 0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e,
    0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e, 0xe1, 0xf8, 0x98, 0x11,
    0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f,
    0xb0, 0x54, 0xbb, 0x16,
];

/// First-round AES S-box output for one state byte.
///
/// The classic correlation-attack intermediate: nonlinear in the key, so a
/// wrong candidate decorrelates sharply.
#[inline]
pub fn sbox_output(plaintext: u8, key_byte: u8) -> u8 {
    AES_SBOX[(plaintext ^ key_byte) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_input_layout() {
        let mut rng = StdRng::seed_from_u64(7);
        let cipher = Cipher::ByteMaskedAes;

        let input = cipher.generate_input(&mut rng, None).unwrap();
        assert_eq!(input.len(), 1 + 16 + 10 + 16);
        assert_eq!(input[0], START_BYTE);
        cipher.check_input(&input).unwrap();
    }

    #[test]
    fn test_fixed_key_is_embedded() {
        let mut rng = StdRng::seed_from_u64(7);
        let key = [0x42u8; 16];
        let input = Cipher::TinyAes
            .generate_input(&mut rng, Some(&key))
            .unwrap();
        assert_eq!(&input[1..17], &key);
    }

    #[test]
    fn test_check_input_rejects_bad_start_byte() {
        let cipher = Cipher::TinyAes;
        let mut input = vec![0u8; 1 + cipher.input_length()];
        input[0] = 0x00;
        assert!(matches!(
            cipher.check_input(&input).unwrap_err(),
            SimError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_sbox_known_values() {
        assert_eq!(AES_SBOX[0x00], 0x63);
        assert_eq!(AES_SBOX[0x01], 0x7c);
        assert_eq!(AES_SBOX[0xff], 0x16);
        assert_eq!(sbox_output(0x53, 0x00), 0xed);
    }

    #[test]
    fn test_artifact_path_encodes_variant() {
        let config = FirmwareConfig {
            board: Board::DiscoF051R8,
            cipher: Cipher::TinyAes,
            model_hooks: true,
            qemu: false,
        };
        let path = config.artifact_path().display().to_string();
        assert!(path.contains("disco_f051r8"));
        assert!(path.contains("tinyaes"));
        assert!(path.contains("-model"));
    }

    #[test]
    fn test_board_and_cipher_parse() {
        assert_eq!(Board::parse("disco_f051r8"), Some(Board::DiscoF051R8));
        assert_eq!(Board::parse("unknown"), None);
        assert_eq!(Cipher::parse("byte-masked-aes"), Some(Cipher::ByteMaskedAes));
        assert_eq!(Cipher::parse("unknown"), None);
    }
}
