//! Send and display pipeline for serial command sequences.
//!
//! [`PipelineConfig`] composes the codecs from [`codec`] in the order a serial terminal needs
//! them: text is parsed, optionally given a CRC trailer and optionally COBS framed on the way
//! out, and the mirror image happens on the way in. Configuration is always passed explicitly,
//! so several panels with different settings can share one process.
//!
//! Port handling is left to the caller through the [`Link`] trait; a [`Session`] glues a link
//! to a configuration.

pub use serial_codec as codec;

mod pipeline;
mod session;

pub use pipeline::{PipelineConfig, Received};
pub use session::{Link, SendError, Session};
