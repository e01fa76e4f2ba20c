//! Routes `tracing` events from the core crate to the browser console.
//!
//! Each formatted event is buffered and written with the console method that
//! matches its level, so `warn!` shows up as a console warning.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wasm_bindgen::prelude::*;

/// Install the console logger.
///
/// `level` is an `EnvFilter` directive such as `"debug"` or
/// `"squish_core=trace"`; it defaults to `"info"`. Calling this again after a
/// logger is installed is a no-op.
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) -> Result<(), JsValue> {
    let filter = parse_filter(level.as_deref()).map_err(|e| JsValue::from_str(&e))?;
    install(filter);
    Ok(())
}

pub(crate) fn parse_filter(level: Option<&str>) -> Result<EnvFilter, String> {
    EnvFilter::try_new(level.unwrap_or("info"))
        .map_err(|e| format!("InvalidConfig: bad log filter: {}", e))
}

fn install(filter: EnvFilter) {
    // No clock in the browser sandbox
    let layer = fmt::layer()
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .with_writer(ConsoleMakeWriter);

    if tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("logger already installed");
    }
}

/// Hands out one [`ConsoleWriter`] per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::new(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter::new(*meta.level())
    }
}

/// Buffers one formatted event and flushes it to the console on drop.
#[derive(Debug)]
pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl ConsoleWriter {
    fn new(level: Level) -> Self {
        Self {
            level,
            buf: Vec::new(),
        }
    }

    fn line(&self) -> String {
        event_line(&self.buf)
    }
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        emit(self.level, &self.line());
    }
}

/// The buffered event text without its trailing newline.
pub(crate) fn event_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).trim_end_matches('\n').to_string()
}

#[cfg(target_arch = "wasm32")]
fn emit(level: Level, line: &str) {
    use web_sys::console;

    let msg = JsValue::from_str(line);
    match level {
        Level::ERROR => console::error_1(&msg),
        Level::WARN => console::warn_1(&msg),
        Level::INFO => console::info_1(&msg),
        _ => console::debug_1(&msg),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(_level: Level, line: &str) {
    eprintln!("{}", line);
}
