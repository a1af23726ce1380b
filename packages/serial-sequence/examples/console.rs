//! Interactive echo console.
//!
//! Everything sent is looped straight back, so this shows what a device would receive and how
//! the same bytes are rendered on the way in. Lines starting with `:` change settings:
//!
//! ```text
//! :format hex     :crc crc-16     :cobs on     :ending both
//! ```

use std::{collections::VecDeque, convert::Infallible, future::Future};

use futures::executor::block_on;
use log::{error, info};
use rustyline::{error::ReadlineError, DefaultEditor};
use serial_sequence::{
    codec::{CrcAlgorithm, LineEnding, TextFormat},
    Link, PipelineConfig, Session,
};

#[derive(Default)]
struct Echo {
    pending: VecDeque<Vec<u8>>,
}

impl Link for Echo {
    type Error = Infallible;

    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), Infallible>> {
        self.pending.push_back(bytes.to_vec());
        async { Ok(()) }
    }

    fn recv(&mut self) -> impl Future<Output = Result<Vec<u8>, Infallible>> {
        let next = self.pending.pop_front().unwrap_or_default();
        async move { Ok(next) }
    }
}

fn apply_setting(config: PipelineConfig, line: &str) -> Result<PipelineConfig, String> {
    let (key, value) = line.split_once(' ').unwrap_or((line, ""));
    let value = value.trim();

    Ok(match key {
        "format" => PipelineConfig {
            format: value.parse::<TextFormat>().map_err(|e| e.to_string())?,
            ..config
        },
        "crc" => config.with_crc(value.parse::<CrcAlgorithm>().map_err(|e| e.to_string())?),
        "ending" => config.with_line_ending(value.parse::<LineEnding>().map_err(|e| e.to_string())?),
        "cobs" => config.with_cobs(matches!(value, "on" | "true" | "1")),
        _ => return Err(format!("unknown setting `{key}`")),
    })
}

fn main() {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .unwrap();

    let mut session = Session::new(Echo::default(), PipelineConfig::new(TextFormat::Hex));
    let mut editor = DefaultEditor::new().unwrap();

    loop {
        let config = session.config();
        let prompt = format!(
            "[{} {} cobs={}] >> ",
            config.format, config.crc, config.cobs
        );

        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                error!("{e}");
                break;
            }
        };
        let _ = editor.add_history_entry(line.as_str());

        if let Some(setting) = line.strip_prefix(':') {
            match apply_setting(config, setting.trim()) {
                Ok(config) => session.reconfigure(config),
                Err(e) => error!("{e}"),
            }
            continue;
        }

        match block_on(session.send_text(&line)) {
            Ok(bytes) => info!("tx {:02X?}", bytes),
            Err(e) => {
                error!("{e}");
                continue;
            }
        }

        let received = block_on(session.recv_display()).unwrap_or_default();
        for entry in received {
            match entry.crc_valid {
                Some(valid) => info!("rx {} (crc ok: {valid})", entry.text),
                None => info!("rx {}", entry.text),
            }
        }
    }
}
