use std::borrow::Cow;

use log::{trace, warn};
use serial_codec::{
    cobs, CobsError, CrcAlgorithm, CrcStatus, FormatError, LineEnding, TextFormat,
};

/// Settings for one send/display panel.
///
/// CRC trailers and COBS framing only apply in [`TextFormat::Hex`] mode, where the user is
/// working with raw frames. ASCII, DEC and BIN input is sent exactly as parsed, and received
/// bytes are rendered without unframing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct PipelineConfig {
    pub format: TextFormat,
    /// Appended to ASCII input only.
    pub line_ending: LineEnding,
    pub crc: CrcAlgorithm,
    pub cobs: bool,
}

impl PipelineConfig {
    pub fn new(format: TextFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_crc(mut self, crc: CrcAlgorithm) -> Self {
        self.crc = crc;
        self
    }

    pub fn with_cobs(mut self, cobs: bool) -> Self {
        self.cobs = cobs;
        self
    }

    /// Whether CRC and COBS settings take effect.
    pub fn frames_raw_bytes(&self) -> bool {
        self.format == TextFormat::Hex
    }

    /// Whether inbound data is COBS framed and must be split on delimiters.
    pub fn unframes_cobs(&self) -> bool {
        self.frames_raw_bytes() && self.cobs
    }

    /// Turns user text into the bytes to write to the port.
    ///
    /// Text that parses to no bytes yields an empty buffer, without a CRC trailer or COBS frame,
    /// meaning there is nothing to send.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the text holds nothing parseable in the selected format.
    pub fn prepare_for_send(&self, text: &str) -> Result<Vec<u8>, FormatError> {
        let source = match self.format {
            TextFormat::Ascii => self.line_ending.terminate(text),
            _ => Cow::Borrowed(text),
        };

        let mut bytes = self.format.decode(&source)?;

        if self.frames_raw_bytes() && !bytes.is_empty() {
            bytes = self.crc.append(&bytes);
            if self.cobs {
                bytes = cobs::encode(&bytes);
            }
        }

        trace!("Prepared {} byte(s) for send: {:02X?}", bytes.len(), bytes);
        Ok(bytes)
    }

    /// Turns bytes received from the port into display text.
    ///
    /// This never fails. Frames that cannot be unframed are shown as received and flagged
    /// with `crc_valid == Some(false)`.
    pub fn prepare_for_display(&self, bytes: &[u8]) -> Received {
        if !self.frames_raw_bytes() {
            return Received {
                text: self.format.encode(bytes),
                crc_valid: None,
                framing_error: None,
            };
        }

        let unframed = if self.cobs {
            match cobs::decode(bytes) {
                Ok(decoded) => Cow::Owned(decoded),
                Err(err) => {
                    warn!("Showing {} raw byte(s): {}", bytes.len(), err);
                    return Received {
                        text: self.format.encode(bytes),
                        crc_valid: Some(false),
                        framing_error: Some(err),
                    };
                }
            }
        } else {
            Cow::Borrowed(bytes)
        };

        let check = self.crc.validate_and_strip(&unframed);
        match check.status {
            CrcStatus::Mismatch { found, expected } => warn!(
                "{} mismatch: found {:#06X}, expected {:#06X}",
                self.crc, found, expected
            ),
            CrcStatus::TooShort { len, width } => warn!(
                "{} check skipped: {} byte(s) cannot hold a {} byte trailer",
                self.crc, len, width
            ),
            CrcStatus::Unchecked | CrcStatus::Valid => {}
        }

        Received {
            text: self.format.encode(&check.payload),
            crc_valid: check.is_valid(),
            framing_error: None,
        }
    }
}

/// Received bytes rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub text: String,
    /// `None` when no checksum was configured.
    pub crc_valid: Option<bool>,
    /// Set when COBS unframing failed and `text` shows the raw bytes instead.
    pub framing_error: Option<CobsError>,
}

#[cfg(test)]
mod tests {
    use serial_codec::{cobs, CobsErrorKind, CrcAlgorithm, LineEnding, TextFormat};

    use super::PipelineConfig;

    #[test]
    fn hex_send_without_framing() {
        let config = PipelineConfig::new(TextFormat::Hex);
        assert_eq!(
            config.prepare_for_send("2D 2D 6F").unwrap(),
            [0x2D, 0x2D, 0x6F]
        );
    }

    #[test]
    fn hex_send_with_crc() {
        let config = PipelineConfig::new(TextFormat::Hex).with_crc(CrcAlgorithm::Crc8);
        assert_eq!(
            config.prepare_for_send("2D 2D 6F").unwrap(),
            [0x2D, 0x2D, 0x6F, 0xE8]
        );
    }

    #[test]
    fn hex_send_with_crc_then_cobs() {
        let config = PipelineConfig::new(TextFormat::Hex)
            .with_crc(CrcAlgorithm::Crc16)
            .with_cobs(true);

        let sent = config.prepare_for_send("11 00 22").unwrap();
        let unframed = cobs::decode(&sent).unwrap();

        assert_eq!(sent.last(), Some(&0x00));
        assert_eq!(unframed, CrcAlgorithm::Crc16.append(&[0x11, 0x00, 0x22]));
    }

    #[test]
    fn ascii_send_ignores_crc_and_cobs() {
        let config = PipelineConfig::new(TextFormat::Ascii)
            .with_line_ending(LineEnding::Both)
            .with_crc(CrcAlgorithm::Crc8)
            .with_cobs(true);

        assert_eq!(config.prepare_for_send("AT").unwrap(), b"AT\r\n");
    }

    #[test]
    fn line_ending_only_applies_to_ascii() {
        let config = PipelineConfig::new(TextFormat::Dec).with_line_ending(LineEnding::Nl);
        assert_eq!(config.prepare_for_send("1, 2").unwrap(), [1, 2]);
    }

    #[test]
    fn blank_send_is_not_framed() {
        let config = PipelineConfig::new(TextFormat::Hex)
            .with_crc(CrcAlgorithm::Crc8)
            .with_cobs(true);
        assert!(config.prepare_for_send("  ").unwrap().is_empty());

        assert!(PipelineConfig::new(TextFormat::Dec)
            .prepare_for_send(" ")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unparseable_send_is_an_error() {
        assert!(PipelineConfig::new(TextFormat::Bin)
            .prepare_for_send("abc")
            .is_err());
    }

    #[test]
    fn display_full_round_trip() {
        let config = PipelineConfig::new(TextFormat::Hex)
            .with_crc(CrcAlgorithm::Crc16)
            .with_cobs(true);

        let sent = config.prepare_for_send("2D 00 6F").unwrap();
        let shown = config.prepare_for_display(&sent);

        assert_eq!(shown.text, "2D 00 6F");
        assert_eq!(shown.crc_valid, Some(true));
        assert_eq!(shown.framing_error, None);
    }

    #[test]
    fn display_reports_crc_mismatch() {
        let config = PipelineConfig::new(TextFormat::Hex).with_crc(CrcAlgorithm::Crc8);
        let shown = config.prepare_for_display(&[0x2D, 0x2D, 0x6F, 0xE9]);

        assert_eq!(shown.text, "2D 2D 6F");
        assert_eq!(shown.crc_valid, Some(false));
    }

    #[test]
    fn display_without_crc_is_unchecked() {
        let config = PipelineConfig::new(TextFormat::Hex);
        let shown = config.prepare_for_display(&[0x2D, 0x6F]);

        assert_eq!(shown.text, "2D 6F");
        assert_eq!(shown.crc_valid, None);
    }

    #[test]
    fn display_degrades_on_bad_frame() {
        let config = PipelineConfig::new(TextFormat::Hex).with_cobs(true);
        let shown = config.prepare_for_display(&[0x01, 0x02, 0x00]);

        assert_eq!(shown.text, "01 02 00");
        assert_eq!(shown.crc_valid, Some(false));
        assert!(matches!(
            shown.framing_error.map(|err| err.kind()),
            Some(CobsErrorKind::Truncated { .. })
        ));
    }

    #[test]
    fn display_decodes_single_byte_frame() {
        let config = PipelineConfig::new(TextFormat::Hex).with_cobs(true);
        assert_eq!(config.prepare_for_display(&[0x02, 0x02, 0x00]).text, "02");
    }

    #[test]
    fn display_short_crc_keeps_bytes() {
        let config = PipelineConfig::new(TextFormat::Hex).with_crc(CrcAlgorithm::Crc16);
        let shown = config.prepare_for_display(&[0x42]);

        assert_eq!(shown.text, "42");
        assert_eq!(shown.crc_valid, Some(false));
    }

    #[test]
    fn non_hex_display_is_never_unframed() {
        let config = PipelineConfig::new(TextFormat::Dec)
            .with_crc(CrcAlgorithm::Crc8)
            .with_cobs(true);
        let shown = config.prepare_for_display(&[0x02, 0x02, 0x00]);

        assert_eq!(shown.text, "2 2 0");
        assert_eq!(shown.crc_valid, None);
    }

    #[test]
    fn ascii_display_is_lossy() {
        let shown = PipelineConfig::default().prepare_for_display(&[b'O', b'K', 0xFF]);
        assert_eq!(shown.text, "OK\u{FFFD}");
    }
}
