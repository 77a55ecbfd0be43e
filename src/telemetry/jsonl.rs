//! JSON Lines output
//!
//! One object per event, tagged by `"event"`:
//!
//! ```text
//! {"event":"status","status":"connected","transport":"serial","at":"..."}
//! {"event":"frame","frame":{"mode":"normal",...,"average_speed":46.0},"received_at":"..."}
//! ```

use serde::Serialize;
use std::io::Write;
use tracing::warn;

use super::TelemetrySink;
use crate::events::{ErrorMessage, FrameMessage, StatusMessage};

/// Writes each event as one JSON line
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    frames_written: u64,
    errors_written: u64,
    write_failures: u64,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Line<'a> {
    Frame(&'a FrameMessage),
    Status(&'a StatusMessage),
    Error(&'a ErrorMessage),
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_written: 0,
            errors_written: 0,
            write_failures: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn errors_written(&self) -> u64 {
        self.errors_written
    }

    /// Lines that could not be serialized or written
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: Line<'_>) -> bool {
        let result = serde_json::to_writer(&mut self.writer, &line)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());

        match result {
            Ok(()) => true,
            Err(e) => {
                self.write_failures += 1;
                warn!("Failed to write telemetry line: {}", e);
                false
            }
        }
    }
}

impl<W: Write> TelemetrySink for JsonLinesSink<W> {
    fn on_frame(&mut self, message: &FrameMessage) {
        if self.write_line(Line::Frame(message)) {
            self.frames_written += 1;
        }
    }

    fn on_status(&mut self, message: &StatusMessage) {
        self.write_line(Line::Status(message));
    }

    fn on_error(&mut self, message: &ErrorMessage) {
        if self.write_line(Line::Error(message)) {
            self.errors_written += 1;
        }
    }
}
