use std::future::Future;

use log::{debug, trace, warn};
use serial_codec::{cobs, Command, FormatError, FrameAccumulator, TextFormat};
use thiserror::Error;

use crate::{PipelineConfig, Received};

/// A byte transport to a serial device.
///
/// Implementations own the port itself (baud rate, flow control, reconnects). A [`Session`]
/// only ever hands them finished buffers and asks for whatever arrived next.
pub trait Link {
    type Error: std::error::Error + 'static;

    /// Writes a complete buffer to the device.
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;

    /// Waits for the next chunk of inbound bytes.
    ///
    /// Chunks are not aligned to frames.
    fn recv(&mut self) -> impl Future<Output = Result<Vec<u8>, Self::Error>>;
}

#[derive(Error, Debug)]
pub enum SendError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Nothing to send")]
    Empty,
    #[error("Link failed: {0}")]
    Link(#[source] E),
}

/// A [`Link`] paired with the settings of one terminal panel.
#[derive(Debug)]
pub struct Session<L: Link> {
    link: L,
    config: PipelineConfig,
    frames: FrameAccumulator,
}

impl<L: Link> Session<L> {
    pub fn new(link: L, config: PipelineConfig) -> Self {
        Self::with_max_frame_len(link, config, FrameAccumulator::DEFAULT_MAX_LEN)
    }

    /// Creates a session that stops waiting for a COBS delimiter after `max_frame_len` bytes.
    ///
    /// The bytes collected so far are then shown raw in HEX and flagged as failing the check.
    pub fn with_max_frame_len(link: L, config: PipelineConfig, max_frame_len: usize) -> Self {
        Self {
            link,
            config,
            frames: FrameAccumulator::with_max_len(max_frame_len),
        }
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Swaps the active settings.
    ///
    /// Any partially received frame is dropped, since it was framed under the old settings.
    pub fn reconfigure(&mut self, config: PipelineConfig) {
        if self.frames.pending() > 0 {
            debug!(
                "Dropping {} buffered byte(s) on reconfigure",
                self.frames.pending()
            );
        }
        self.frames.clear();
        self.config = config;
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Parses `text` with the session's settings and writes the result.
    ///
    /// Returns the bytes that were written.
    pub async fn send_text(&mut self, text: &str) -> Result<Vec<u8>, SendError<L::Error>> {
        let bytes = self.config.prepare_for_send(text)?;
        if bytes.is_empty() {
            warn!("Not sending {:?}: no bytes in {} input", text, self.config.format);
            return Err(SendError::Empty);
        }

        self.link.send(&bytes).await.map_err(SendError::Link)?;
        debug!("Sent {} byte(s)", bytes.len());

        Ok(bytes)
    }

    /// Writes a stored command.
    ///
    /// Commands already carry their CRC trailer, so only COBS framing is applied here, and only
    /// when the session is in HEX mode with COBS enabled.
    pub async fn send_command(
        &mut self,
        command: &Command,
    ) -> Result<Vec<u8>, SendError<L::Error>> {
        let mut bytes = command.bytes();
        if bytes.is_empty() {
            warn!("Command {:?} has no bytes", command.name);
            return Err(SendError::Empty);
        }
        if self.config.unframes_cobs() {
            bytes = cobs::encode(&bytes);
        }

        self.link.send(&bytes).await.map_err(SendError::Link)?;
        debug!("Sent command {:?} ({} byte(s))", command.name, bytes.len());

        Ok(bytes)
    }

    /// Reads one chunk from the link and renders it.
    ///
    /// In HEX mode with COBS enabled the chunk is split on frame delimiters and each frame
    /// becomes one entry; a frame still waiting for its delimiter is held back for the next
    /// call. Otherwise the whole chunk becomes a single entry.
    pub async fn recv_display(&mut self) -> Result<Vec<Received>, L::Error> {
        let chunk = self.link.recv().await?;
        trace!("Received {} byte(s): {:02X?}", chunk.len(), chunk);

        if !self.config.unframes_cobs() {
            if chunk.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![self.config.prepare_for_display(&chunk)]);
        }

        let received = self
            .frames
            .feed(&chunk)
            .into_iter()
            .map(|frame| {
                if frame.complete {
                    self.config.prepare_for_display(&frame.bytes)
                } else {
                    warn!(
                        "Frame exceeded {} bytes without a delimiter",
                        frame.bytes.len()
                    );
                    Received {
                        text: TextFormat::Hex.encode(&frame.bytes),
                        crc_valid: Some(false),
                        framing_error: None,
                    }
                }
            })
            .collect();

        Ok(received)
    }
}
