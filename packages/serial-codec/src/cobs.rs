//! [Consistent Overhead Byte Stuffing](https://en.wikipedia.org/wiki/Consistent_Overhead_Byte_Stuffing).
//!
//! COBS rewrites a buffer so that it contains no `0x00` bytes, which frees `0x00` to act as an
//! unambiguous frame delimiter on the wire. Every encoded frame is a sequence of blocks, each
//! introduced by a code byte giving the distance to the next code byte:
//!
//! | Code        | Meaning |
//! |-------------|---------|
//! | `0x00`      | Never valid inside a frame. |
//! | `0x01–0xFE` | `code - 1` data bytes follow, then an implied zero (unless the frame ends). |
//! | `0xFF`      | 254 data bytes follow with no implied zero. |
//!
//! The overhead is at most one byte per 254 bytes of input, plus the code byte and delimiter.

use alloc::{vec, vec::Vec};
use core::mem;
use thiserror::Error;

/// Terminates every encoded frame.
pub const DELIMITER: u8 = 0x00;

/// Largest code byte; marks a full block without an implied zero.
const MAX_CODE: u8 = 0xFF;

/// Upper bound on the encoded size of `len` input bytes, delimiter included.
pub const fn max_encoded_len(len: usize) -> usize {
    len + len.div_ceil(MAX_CODE as usize - 1) + 2
}

/// Encodes `data` into a single frame terminated by [`DELIMITER`].
///
/// An empty buffer encodes to the bare delimiter `[0x00]`.
pub fn encode(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return vec![DELIMITER];
    }

    let mut frame = vec![0; max_encoded_len(data.len())];
    let mut write = 1;
    let mut code_slot = 0;
    let mut code: u8 = 1;

    for &byte in data {
        // A full block is only closed once more input needs a home, so a final run of exactly
        // 254 bytes ends in its own 0xFF block instead of an empty trailing one.
        if code == MAX_CODE {
            frame[code_slot] = code;
            code = 1;
            code_slot = write;
            write += 1;
        }

        if byte == 0 {
            frame[code_slot] = code;
            code = 1;
            code_slot = write;
            write += 1;
        } else {
            frame[write] = byte;
            write += 1;
            code += 1;
        }
    }

    frame[code_slot] = code;
    frame[write] = DELIMITER;
    frame.truncate(write + 1);
    frame
}

/// Decodes a single frame back into the original bytes.
///
/// The trailing [`DELIMITER`] is optional. An empty frame decodes to an empty buffer.
///
/// # Errors
///
/// Returns a [`CobsError`] if a zero byte appears inside the frame body or a code byte
/// announces more data than the frame holds.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>, CobsError> {
    let body = frame.strip_suffix(&[DELIMITER]).unwrap_or(frame);
    let mut data = Vec::with_capacity(body.len());
    let mut cursor = 0;

    while let Some(&code) = body.get(cursor) {
        if code == 0 {
            return Err(CobsError::new(CobsErrorKind::UnexpectedZero { offset: cursor }));
        }

        let start = cursor + 1;
        let len = usize::from(code) - 1;
        let block = body.get(start..start + len).ok_or_else(|| {
            CobsError::new(CobsErrorKind::Truncated {
                offset: cursor,
                expected: len,
                available: body.len() - start,
            })
        })?;

        if let Some(zero) = block.iter().position(|&byte| byte == 0) {
            return Err(CobsError::new(CobsErrorKind::UnexpectedZero {
                offset: start + zero,
            }));
        }

        data.extend_from_slice(block);
        cursor = start + len;

        if code < MAX_CODE && cursor < body.len() {
            data.push(0);
        }
    }

    Ok(data)
}

/// Returned when a buffer is not a well-formed COBS frame.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("Invalid COBS frame: {kind}")]
pub struct CobsError {
    kind: CobsErrorKind,
}

impl CobsError {
    pub const fn new(kind: CobsErrorKind) -> Self {
        Self { kind }
    }

    pub const fn kind(&self) -> CobsErrorKind {
        self.kind
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CobsErrorKind {
    #[error("zero byte at offset {offset} inside the frame body.")]
    UnexpectedZero { offset: usize },

    #[error(
        "code byte at offset {offset} announces {expected} bytes but only {available} remain."
    )]
    Truncated {
        offset: usize,
        expected: usize,
        available: usize,
    },
}

/// A delimited chunk of an inbound byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame body without the delimiter.
    pub bytes: Vec<u8>,
    /// `false` if the frame was cut short by the length limit or a flush rather than ended
    /// by a delimiter.
    pub complete: bool,
}

/// Splits an inbound byte stream into COBS frames.
///
/// Serial ports deliver data in arbitrary chunks, so a frame may arrive across several reads
/// or several frames may arrive in one. The accumulator buffers bytes until a [`DELIMITER`]
/// arrives and yields each frame body for [`decode`].
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    buffer: Vec<u8>,
    max_len: usize,
}

impl FrameAccumulator {
    pub const DEFAULT_MAX_LEN: usize = 4096;

    pub fn new() -> Self {
        Self::with_max_len(Self::DEFAULT_MAX_LEN)
    }

    /// Creates an accumulator that gives up on a frame once `max_len` bytes arrive without a
    /// delimiter. The buffered bytes are then emitted as an incomplete frame.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_len: max_len.max(1),
        }
    }

    /// Feeds a chunk from the stream and returns every frame it completes.
    ///
    /// Empty frames (back-to-back delimiters) are skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        let mut frames = Vec::new();

        for &byte in chunk {
            if byte == DELIMITER {
                if !self.buffer.is_empty() {
                    frames.push(RawFrame {
                        bytes: mem::take(&mut self.buffer),
                        complete: true,
                    });
                }
                continue;
            }

            self.buffer.push(byte);

            if self.buffer.len() >= self.max_len {
                frames.push(RawFrame {
                    bytes: mem::take(&mut self.buffer),
                    complete: false,
                });
            }
        }

        frames
    }

    /// Returns whatever is buffered as an incomplete frame.
    pub fn flush(&mut self) -> Option<RawFrame> {
        if self.buffer.is_empty() {
            return None;
        }

        Some(RawFrame {
            bytes: mem::take(&mut self.buffer),
            complete: false,
        })
    }

    /// Discards any partially received frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
