use alloc::vec::Vec;
use core::{fmt, str::FromStr};
use crc::Crc;

use crate::format::ParseSettingError;

/// [CRC-8/MAXIM-DOW](https://reveng.sourceforge.io/crc-catalogue/1-15.htm#crc.cat.crc-8-maxim-dow),
/// the 1-Wire checksum.
pub const CRC8_MAXIM_DOW: Crc<u8> = Crc::<u8>::new(&crc::CRC_8_MAXIM_DOW);

/// [CRC-16/IBM-3740](https://reveng.sourceforge.io/crc-catalogue/16.htm#crc.cat.crc-16-ibm-3740),
/// commonly labelled CRC-16/CCITT-FALSE.
pub const CRC16_IBM_3740: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_IBM_3740);

/// A checksum trailer attached to outbound frames and verified on inbound ones.
///
/// | Algorithm | Width | Poly     | Init     | RefIn/RefOut | XorOut   |
/// |-----------|-------|----------|----------|--------------|----------|
/// | `Crc8`    | 8     | `0x31`   | `0x00`   | true/true    | `0x00`   |
/// | `Crc16`   | 16    | `0x1021` | `0xFFFF` | false/false  | `0x0000` |
///
/// Sixteen-bit checksums go on the wire most significant byte first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CrcAlgorithm {
    #[default]
    None,
    #[cfg_attr(feature = "serde", serde(rename = "CRC-8"))]
    Crc8,
    #[cfg_attr(feature = "serde", serde(rename = "CRC-16"))]
    Crc16,
}

impl CrcAlgorithm {
    pub const ALL: [CrcAlgorithm; 3] = [Self::None, Self::Crc8, Self::Crc16];

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Crc8 => "CRC-8",
            Self::Crc16 => "CRC-16",
        }
    }

    /// Number of trailer bytes this algorithm adds.
    pub const fn width(self) -> usize {
        match self {
            Self::None => 0,
            Self::Crc8 => 1,
            Self::Crc16 => 2,
        }
    }

    /// Computes the checksum of `data`, or `None` when no algorithm is selected.
    pub fn checksum(self, data: &[u8]) -> Option<u16> {
        match self {
            Self::None => None,
            Self::Crc8 => Some(CRC8_MAXIM_DOW.checksum(data).into()),
            Self::Crc16 => Some(CRC16_IBM_3740.checksum(data)),
        }
    }

    /// Returns `data` followed by its checksum trailer.
    pub fn append(self, data: &[u8]) -> Vec<u8> {
        let mut framed = Vec::with_capacity(data.len() + self.width());
        framed.extend_from_slice(data);

        match self {
            Self::None => {}
            Self::Crc8 => framed.push(CRC8_MAXIM_DOW.checksum(data)),
            Self::Crc16 => framed.extend_from_slice(&CRC16_IBM_3740.checksum(data).to_be_bytes()),
        }

        framed
    }

    /// Splits the checksum trailer off `data` and checks it against the remaining bytes.
    ///
    /// This never fails. A mismatch is reported through [`CrcCheck::status`] and the payload is
    /// still returned so corrupt data can be displayed. Buffers shorter than the trailer are
    /// returned whole.
    pub fn validate_and_strip(self, data: &[u8]) -> CrcCheck {
        if self == Self::None {
            return CrcCheck {
                payload: data.to_vec(),
                status: CrcStatus::Unchecked,
            };
        }

        let width = self.width();
        let Some(split) = data.len().checked_sub(width) else {
            return CrcCheck {
                payload: data.to_vec(),
                status: CrcStatus::TooShort {
                    len: data.len(),
                    width,
                },
            };
        };

        let (payload, trailer) = data.split_at(split);
        let found = trailer
            .iter()
            .fold(0u16, |value, &byte| value << 8 | u16::from(byte));
        let expected = self.checksum(payload).unwrap_or_default();

        CrcCheck {
            payload: payload.to_vec(),
            status: if found == expected {
                CrcStatus::Valid
            } else {
                CrcStatus::Mismatch { found, expected }
            },
        }
    }
}

impl fmt::Display for CrcAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CrcAlgorithm {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|algorithm| label_matches(algorithm.label(), s))
            .ok_or_else(|| ParseSettingError::new("CRC algorithm", s))
    }
}

/// Compares labels ignoring case and dashes, so `crc16` names `CRC-16`.
fn label_matches(label: &str, input: &str) -> bool {
    let fold = |b: u8| b.to_ascii_lowercase();
    label
        .bytes()
        .filter(|&b| b != b'-')
        .map(fold)
        .eq(input.bytes().filter(|&b| b != b'-').map(fold))
}

/// Outcome of [`CrcAlgorithm::validate_and_strip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrcCheck {
    /// The data with its trailer removed, or the untouched input if there was no trailer to remove.
    pub payload: Vec<u8>,
    pub status: CrcStatus,
}

impl CrcCheck {
    /// `Some(true)` on a match, `Some(false)` on any failure and `None` if nothing was checked.
    pub fn is_valid(&self) -> Option<bool> {
        self.status.is_valid()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcStatus {
    /// No algorithm was selected.
    Unchecked,
    Valid,
    Mismatch { found: u16, expected: u16 },
    /// The buffer could not even hold the trailer.
    TooShort { len: usize, width: usize },
}

impl CrcStatus {
    pub fn is_valid(&self) -> Option<bool> {
        match self {
            Self::Unchecked => None,
            Self::Valid => Some(true),
            Self::Mismatch { .. } | Self::TooShort { .. } => Some(false),
        }
    }
}
