//! # GoToGo Link
//!
//! Live telemetry from the GoToGo vehicle controller over USB serial or WiFi.
//!
//! This library provides the link layer: discovering the controller's serial
//! port, reading newline-delimited records over serial or TCP, decoding them
//! into typed frames, and supervising the connection with automatic reconnect.

pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod protocol;
pub mod supervisor;
pub mod telemetry;
pub mod transport;
