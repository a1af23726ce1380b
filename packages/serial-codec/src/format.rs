use alloc::{
    borrow::Cow,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, str::FromStr};
use thiserror::Error;

/// A human-editable notation for a byte sequence.
///
/// # Parsing
///
/// | Format  | Accepted input |
/// |---------|----------------|
/// | `Ascii` | Any text. Encoded as UTF-8. |
/// | `Hex`   | Hex digits; every other character is ignored. Digits pair up most significant nibble first. |
/// | `Dec`   | Base-10 values separated by whitespace and/or commas. Tokens that are not all ASCII digits (`"4x"`, `"+5"`, `"-1"`) or fall outside `0..=255` are skipped. |
/// | `Bin`   | `0` and `1`; every other character is ignored. Bits group into bytes most significant bit first. |
///
/// A trailing partial group in `Hex` or `Bin` input is not discarded: it becomes a byte of its
/// own holding the leftover digits as its low bits, so `"ABC"` parses as `[0xAB, 0x0C]` and
/// `"101"` as `[0x05]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "UPPERCASE")
)]
pub enum TextFormat {
    #[default]
    Ascii,
    Hex,
    Dec,
    Bin,
}

impl TextFormat {
    /// Every notation, in the order they are usually offered.
    pub const ALL: [TextFormat; 4] = [Self::Ascii, Self::Hex, Self::Dec, Self::Bin];

    /// The label used when this format is stored in settings or shown in a picker.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ascii => "ASCII",
            Self::Hex => "HEX",
            Self::Dec => "DEC",
            Self::Bin => "BIN",
        }
    }

    /// Parses user text into raw bytes.
    ///
    /// Blank input yields an empty buffer, which callers should treat as "nothing to send".
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::NoTokens`] if `text` is not blank but contains nothing this
    /// format can parse, such as `"zz"` in `Hex` mode or `"300, -4"` in `Dec` mode.
    pub fn decode(self, text: &str) -> Result<Vec<u8>, FormatError> {
        let bytes = match self {
            Self::Ascii => return Ok(text.as_bytes().to_vec()),
            Self::Hex => parse_hex(text),
            Self::Dec => parse_dec(text),
            Self::Bin => parse_bin(text),
        };

        if bytes.is_empty() && !text.trim().is_empty() {
            return Err(FormatError::NoTokens { format: self });
        }

        Ok(bytes)
    }

    /// Renders raw bytes in this notation.
    ///
    /// `Hex`, `Dec` and `Bin` separate bytes with single spaces. `Ascii` decodes the buffer as
    /// UTF-8 and substitutes U+FFFD for invalid sequences instead of failing.
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            Self::Ascii => String::from_utf8_lossy(data).into_owned(),
            Self::Hex => join_bytes(data, |byte| format!("{byte:02X}")),
            Self::Dec => join_bytes(data, |byte| format!("{byte}")),
            Self::Bin => join_bytes(data, |byte| format!("{byte:08b}")),
        }
    }
}

impl fmt::Display for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextFormat {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSettingError::new("text format", s))
    }
}

/// Control characters appended to ASCII input before it is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineEnding {
    #[default]
    None,
    /// `\n`
    #[cfg_attr(feature = "serde", serde(rename = "NL"))]
    Nl,
    /// `\r`
    #[cfg_attr(feature = "serde", serde(rename = "CR"))]
    Cr,
    /// `\r\n`
    Both,
}

impl LineEnding {
    pub const ALL: [LineEnding; 4] = [Self::None, Self::Nl, Self::Cr, Self::Both];

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Nl => "NL",
            Self::Cr => "CR",
            Self::Both => "Both",
        }
    }

    /// The characters this ending appends.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Nl => "\n",
            Self::Cr => "\r",
            Self::Both => "\r\n",
        }
    }

    /// Returns `text` with this line ending appended.
    pub fn terminate(self, text: &str) -> Cow<'_, str> {
        match self {
            Self::None => Cow::Borrowed(text),
            _ => {
                let mut terminated = String::with_capacity(text.len() + 2);
                terminated.push_str(text);
                terminated.push_str(self.as_str());
                Cow::Owned(terminated)
            }
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LineEnding {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|ending| ending.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSettingError::new("line ending", s))
    }
}

/// Returned when text cannot be interpreted under the selected [`TextFormat`].
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("Input contains no {format} values.")]
    NoTokens { format: TextFormat },
}

/// Returned when a settings label does not name a known option.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("Unrecognized {setting}: {value:?}.")]
pub struct ParseSettingError {
    setting: &'static str,
    value: String,
}

impl ParseSettingError {
    pub(crate) fn new(setting: &'static str, value: &str) -> Self {
        Self {
            setting,
            value: value.to_string(),
        }
    }

    /// The label that failed to parse.
    pub fn value(&self) -> &str {
        &self.value
    }
}

fn parse_hex(text: &str) -> Vec<u8> {
    let nibbles: Vec<u8> = text
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|digit| digit as u8)
        .collect();

    nibbles
        .chunks(2)
        .map(|pair| pair.iter().fold(0u8, |byte, &nibble| byte << 4 | nibble))
        .collect()
}

fn parse_dec(text: &str) -> Vec<u8> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .filter(|token| token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse::<u8>().ok())
        .collect()
}

fn parse_bin(text: &str) -> Vec<u8> {
    let bits: Vec<u8> = text
        .bytes()
        .filter_map(|b| match b {
            b'0' => Some(0),
            b'1' => Some(1),
            _ => None,
        })
        .collect();

    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| byte << 1 | bit))
        .collect()
}

fn join_bytes(data: &[u8], render: impl Fn(u8) -> String) -> String {
    data.iter()
        .map(|&byte| render(byte))
        .collect::<Vec<_>>()
        .join(" ")
}
