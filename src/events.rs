//! # Telemetry Events
//!
//! Typed messages handed from the acquisition task to the consumer.
//!
//! The consumer drains them from a queue on its own schedule; nothing here
//! is shared or mutated after it is sent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::LinkError;
use crate::protocol::{DecodeError, TelemetryFrame};
use crate::transport::TransportKind;

/// Link status as reported to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Connected,
    Disconnected,
    Error,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkStatus::Connected => "connected",
            LinkStatus::Disconnected => "disconnected",
            LinkStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Fault category of an [`ErrorMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Transport could not be established
    Open,
    /// Established transport failed mid-stream
    Read,
    /// One line was rejected by the decoder
    Decode,
}

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMessage {
    pub frame: TelemetryFrame,
    pub received_at: DateTime<Utc>,
}

/// A status transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    pub status: LinkStatus,
    pub transport: TransportKind,
    pub at: DateTime<Utc>,
}

/// A diagnostic; never ends the stream by itself
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub kind: FaultKind,
    pub transport: TransportKind,
    pub reason: String,
    /// Offending line for decode faults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_line: Option<String>,
    pub at: DateTime<Utc>,
}

impl ErrorMessage {
    /// Describe a transport fault
    pub fn from_link_error(transport: TransportKind, error: &LinkError) -> Self {
        let (kind, reason) = match error {
            LinkError::OpenFailure { cause, .. } => (FaultKind::Open, cause.clone()),
            LinkError::DiscoveryEmpty => (FaultKind::Open, error.to_string()),
            LinkError::ReadFailure { cause, .. } => (FaultKind::Read, cause.clone()),
            LinkError::Io(e) => (FaultKind::Read, e.to_string()),
            LinkError::Config(e) => (FaultKind::Open, e.to_string()),
            LinkError::Decode(e) => return Self::decode(transport, e),
        };
        Self {
            kind,
            transport,
            reason,
            raw_line: None,
            at: Utc::now(),
        }
    }

    /// Describe a rejected line
    pub fn decode(transport: TransportKind, error: &DecodeError) -> Self {
        Self {
            kind: FaultKind::Decode,
            transport,
            reason: error.reason.to_string(),
            raw_line: Some(error.raw_line.clone()),
            at: Utc::now(),
        }
    }
}

/// Everything the acquisition task emits
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Frame(FrameMessage),
    Status(StatusMessage),
    Error(ErrorMessage),
}

impl TelemetryEvent {
    pub fn frame(frame: TelemetryFrame) -> Self {
        Self::Frame(FrameMessage {
            frame,
            received_at: Utc::now(),
        })
    }

    pub fn status(status: LinkStatus, transport: TransportKind) -> Self {
        Self::Status(StatusMessage {
            status,
            transport,
            at: Utc::now(),
        })
    }

    /// The status carried by a `Status` event
    pub fn as_status(&self) -> Option<LinkStatus> {
        match self {
            Self::Status(message) => Some(message.status),
            _ => None,
        }
    }
}
