//! Byte-level encoding pipeline for serial command sequences.
//!
//! Every buffer exchanged with a serial device passes through some combination of three
//! stateless transformations:
//!
//! - [`TextFormat`] converts between raw bytes and the ASCII, HEX, DEC and BIN notations
//!   a user types and reads.
//! - [`CrcAlgorithm`] appends a checksum trailer to outbound data and verifies (then strips)
//!   it on inbound data.
//! - The [`cobs`] module frames a buffer so it contains no zero bytes other than a single
//!   trailing delimiter, and reverses that framing.
//!
//! Stored commands are kept as a [`CommandSequence`], a canonical upper-case hex string that
//! does not depend on the notation the command was authored in.

#![no_std]

extern crate alloc;

pub mod cobs;

mod checksum;
mod format;
mod sequence;

pub use checksum::{CRC8_MAXIM_DOW, CRC16_IBM_3740, CrcAlgorithm, CrcCheck, CrcStatus};
pub use cobs::{CobsError, CobsErrorKind, FrameAccumulator, RawFrame};
pub use format::{FormatError, LineEnding, ParseSettingError, TextFormat};
pub use sequence::{
    Command, CommandSequence, ValidationError, Violation, from_canonical_sequence,
    normalize_sequence, to_canonical_sequence,
};
