//! # Telemetry Module
//!
//! Consumer side of the event queue.
//!
//! This module handles:
//! - The [`TelemetrySink`] callbacks a display or logger implements
//! - Draining the supervisor's queue into a sink until the queue closes
//! - Writing events as JSON Lines ([`JsonLinesSink`])

pub mod jsonl;

use tokio::sync::mpsc;

use crate::events::{ErrorMessage, FrameMessage, StatusMessage, TelemetryEvent};

pub use jsonl::JsonLinesSink;

/// Receives events on the consumer's context
pub trait TelemetrySink {
    fn on_frame(&mut self, message: &FrameMessage);

    fn on_status(&mut self, message: &StatusMessage);

    fn on_error(&mut self, message: &ErrorMessage);
}

/// Route one event to the matching callback
pub fn dispatch<S: TelemetrySink + ?Sized>(sink: &mut S, event: &TelemetryEvent) {
    match event {
        TelemetryEvent::Frame(message) => sink.on_frame(message),
        TelemetryEvent::Status(message) => sink.on_status(message),
        TelemetryEvent::Error(message) => sink.on_error(message),
    }
}

/// Forward events until every sender is gone
///
/// Returns the number of events delivered.
pub async fn drain<S: TelemetrySink + ?Sized>(
    events: &mut mpsc::Receiver<TelemetryEvent>,
    sink: &mut S,
) -> u64 {
    let mut delivered = 0;
    while let Some(event) = events.recv().await {
        dispatch(sink, &event);
        delivered += 1;
    }
    delivered
}
