use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, str::FromStr};
use thiserror::Error;

use crate::{
    checksum::CrcAlgorithm,
    format::{FormatError, LineEnding, TextFormat},
};

/// The canonical stored form of a byte sequence.
///
/// Upper-case two-digit hex bytes separated by single spaces, e.g. `"2D 2D 6F"`. A sequence is
/// stored this way no matter which [`TextFormat`] it was typed in, so it can be rendered in any
/// of them later.
///
/// # Invariants
///
/// - Every token matches `[0-9A-F]{2}`.
/// - Tokens are separated by exactly one space, with no leading or trailing whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct CommandSequence(String);

impl CommandSequence {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(TextFormat::Hex.encode(bytes))
    }

    /// Parses a hex sequence typed or stored by a user.
    ///
    /// Surrounding whitespace, lower-case digits and runs of whitespace between tokens are
    /// accepted and normalized away. An empty string is the empty sequence.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every token that is not exactly two hex digits.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let normalized = normalize_sequence(text);

        let violations: Vec<Violation> = normalized
            .split(' ')
            .filter(|token| !token.is_empty())
            .enumerate()
            .filter(|(_, token)| !is_hex_byte(token))
            .map(|(index, token)| Violation::InvalidToken {
                index,
                token: token.to_string(),
            })
            .collect();

        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the sequence into the bytes it represents.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.tokens()
            .filter_map(|token| u8::from_str_radix(token, 16).ok())
            .collect()
    }

    /// Number of bytes in the sequence.
    pub fn len(&self) -> usize {
        self.tokens().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|token| !token.is_empty())
    }
}

impl fmt::Display for CommandSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CommandSequence {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CommandSequence {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommandSequence> for String {
    fn from(value: CommandSequence) -> Self {
        value.0
    }
}

impl AsRef<str> for CommandSequence {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Formats bytes as a canonical [`CommandSequence`].
pub fn to_canonical_sequence(bytes: &[u8]) -> CommandSequence {
    CommandSequence::from_bytes(bytes)
}

/// Parses a canonical (or merely well-formed) hex sequence into bytes.
///
/// # Errors
///
/// See [`CommandSequence::parse`].
pub fn from_canonical_sequence(text: &str) -> Result<Vec<u8>, ValidationError> {
    Ok(CommandSequence::parse(text)?.to_bytes())
}

/// Trims `text`, upper-cases it and collapses every run of whitespace to a single space.
///
/// This is idempotent and does not validate the tokens.
pub fn normalize_sequence(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for token in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.extend(token.chars().map(|c| c.to_ascii_uppercase()));
    }
    normalized
}

fn is_hex_byte(token: &str) -> bool {
    token.len() == 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// A named, reusable byte sequence from the command library.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Command {
    pub name: String,
    pub sequence: CommandSequence,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub documentation: Option<String>,
    /// Notation the command was typed in, used to render it again for editing.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub input_format: Option<TextFormat>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub line_ending: Option<LineEnding>,
}

impl Command {
    pub fn new(name: impl Into<String>, sequence: CommandSequence) -> Self {
        Self {
            name: name.into(),
            sequence,
            documentation: None,
            input_format: None,
            line_ending: None,
        }
    }

    /// Builds a command from text typed in an editor.
    ///
    /// `text` is parsed in `format` (with `line_ending` appended when the format is ASCII), the
    /// `crc` trailer is appended and the result is stored canonically. Unlike the live send
    /// path, the trailer is applied regardless of `format`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] collecting every problem at once: a blank name, an empty
    /// sequence, or text that yields no bytes.
    pub fn author(
        name: &str,
        text: &str,
        format: TextFormat,
        line_ending: LineEnding,
        crc: CrcAlgorithm,
    ) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();

        let name = name.trim();
        if name.is_empty() {
            violations.push(Violation::MissingName);
        }

        let mut bytes = Vec::new();
        if text.is_empty() {
            violations.push(Violation::MissingSequence);
        } else {
            let source = match format {
                TextFormat::Ascii => line_ending.terminate(text),
                _ => text.into(),
            };
            match format.decode(&source) {
                Ok(decoded) if decoded.is_empty() => violations.push(Violation::MissingSequence),
                Ok(decoded) => bytes = decoded,
                Err(err) => violations.push(Violation::Unparseable(err)),
            }
        }

        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        Ok(Self {
            name: name.to_string(),
            sequence: CommandSequence::from_bytes(&crc.append(&bytes)),
            documentation: None,
            input_format: Some(format),
            line_ending: Some(line_ending),
        })
    }

    /// Checks a command loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the name is blank and/or the sequence is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if self.name.trim().is_empty() {
            violations.push(Violation::MissingName);
        }
        if self.sequence.is_empty() {
            violations.push(Violation::MissingSequence);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// The bytes this command transmits.
    pub fn bytes(&self) -> Vec<u8> {
        self.sequence.to_bytes()
    }

    /// Renders the stored bytes for editing.
    ///
    /// Falls back to the notation the command was authored in, then to HEX.
    pub fn render(&self, format: Option<TextFormat>) -> String {
        format
            .or(self.input_format)
            .unwrap_or(TextFormat::Hex)
            .encode(&self.bytes())
    }
}

/// One problem found while validating a sequence or command.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    #[error("Command name is required.")]
    MissingName,

    #[error("Command sequence is required.")]
    MissingSequence,

    #[error(transparent)]
    Unparseable(#[from] FormatError),

    #[error("Token {index} ({token:?}) is not a two-digit hex byte.")]
    InvalidToken { index: usize, token: String },
}

/// Every problem found while validating a sequence or command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use super::{
        Command, CommandSequence, Violation, from_canonical_sequence, normalize_sequence,
        to_canonical_sequence,
    };
    use crate::{CrcAlgorithm, FormatError, LineEnding, TextFormat};

    #[test]
    fn canonical_form() {
        assert_eq!(to_canonical_sequence(&[0x2D, 0x2D, 0x6F]).as_str(), "2D 2D 6F");
        assert_eq!(to_canonical_sequence(&[]).as_str(), "");
        assert_eq!(
            from_canonical_sequence("2D 2D 6F").unwrap(),
            [0x2D, 0x2D, 0x6F]
        );
    }

    #[test]
    fn parse_normalizes() {
        let sequence: CommandSequence = "  2d\t2D \n 6f ".parse().unwrap();
        assert_eq!(sequence.as_str(), "2D 2D 6F");
        assert_eq!(sequence.len(), 3);
        assert_eq!(normalize_sequence(sequence.as_str()), sequence.as_str());
    }

    #[test]
    fn parse_reports_every_bad_token() {
        let err = CommandSequence::parse("2D 2 6FF GG 0A").unwrap_err();

        assert_eq!(
            err.violations(),
            [
                Violation::InvalidToken {
                    index: 1,
                    token: "2".to_string()
                },
                Violation::InvalidToken {
                    index: 2,
                    token: "6FF".to_string()
                },
                Violation::InvalidToken {
                    index: 3,
                    token: "GG".to_string()
                },
            ]
        );
        assert_eq!(
            err.to_string(),
            "Token 1 (\"2\") is not a two-digit hex byte. \
             Token 2 (\"6FF\") is not a two-digit hex byte. \
             Token 3 (\"GG\") is not a two-digit hex byte."
        );
    }

    #[test]
    fn canonical_round_trip_is_identity() {
        for canonical in ["", "00", "2D 2D 6F", "FF 00 A5 5A"] {
            let bytes = from_canonical_sequence(canonical).unwrap();
            assert_eq!(to_canonical_sequence(&bytes).as_str(), canonical);
        }
    }

    #[test]
    fn author_hex_command() {
        let command = Command::author(
            " Reset ",
            "2d2d6f",
            TextFormat::Hex,
            LineEnding::None,
            CrcAlgorithm::None,
        )
        .unwrap();

        assert_eq!(command.name, "Reset");
        assert_eq!(command.sequence.as_str(), "2D 2D 6F");
        assert_eq!(command.input_format, Some(TextFormat::Hex));
        assert_eq!(command.bytes(), [0x2D, 0x2D, 0x6F]);
    }

    #[test]
    fn author_ascii_applies_line_ending_and_crc() {
        let command = Command::author(
            "AT",
            "AT",
            TextFormat::Ascii,
            LineEnding::Both,
            CrcAlgorithm::Crc8,
        )
        .unwrap();

        // CRC-8/MAXIM-DOW of "AT\r\n" is 0x7D.
        assert_eq!(command.sequence.as_str(), "41 54 0D 0A 7D");
        assert_eq!(command.render(None), "AT\r\n}");
        assert_eq!(command.render(Some(TextFormat::Dec)), "65 84 13 10 125");
    }

    #[test]
    fn line_ending_ignored_outside_ascii() {
        let command = Command::author(
            "Ping",
            "1 2",
            TextFormat::Dec,
            LineEnding::Both,
            CrcAlgorithm::None,
        )
        .unwrap();

        assert_eq!(command.bytes(), [1, 2]);
    }

    #[test]
    fn author_collects_all_violations() {
        let err = Command::author("  ", "zz", TextFormat::Hex, LineEnding::None, CrcAlgorithm::None)
            .unwrap_err();
        assert_eq!(
            err.violations(),
            [
                Violation::MissingName,
                Violation::Unparseable(FormatError::NoTokens {
                    format: TextFormat::Hex
                }),
            ]
        );

        let err = Command::author("", "", TextFormat::Ascii, LineEnding::None, CrcAlgorithm::None)
            .unwrap_err();
        assert_eq!(
            err.violations(),
            [Violation::MissingName, Violation::MissingSequence]
        );
        assert_eq!(
            err.to_string(),
            "Command name is required. Command sequence is required."
        );
    }

    #[test]
    fn validate_stored_command() {
        let command = Command::new("Reset", CommandSequence::from_bytes(&[0x01]));
        assert!(command.validate().is_ok());

        let empty = Command::new(" ", CommandSequence::default());
        assert_eq!(
            empty.validate().unwrap_err().violations(),
            vec![Violation::MissingName, Violation::MissingSequence]
        );
    }

    #[test]
    fn render_defaults_to_hex() {
        let command = Command::new("Raw", CommandSequence::from_bytes(&[0x0F, 0xF0]));
        assert_eq!(command.render(None), "0F F0");
        assert_eq!(command.render(Some(TextFormat::Bin)), "00001111 11110000");
    }
}
