//! # Dashboard Telemetry Protocol
//!
//! The vehicle controller prints one record per line, fields separated by `/`.
//!
//! This module handles:
//! - Protocol constants and the typed [`TelemetryFrame`]
//! - All-or-nothing line decoding with field-level diagnostics

pub mod decoder;
pub mod frame;

pub use decoder::{decode, parse_frame, DecodeError, DecodeFailure};
pub use frame::{AuxLight, DriveMode, Gear, Headlight, PowerState, TelemetryFrame};
