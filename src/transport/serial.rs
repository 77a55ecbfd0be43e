//! # Serial Transport
//!
//! USB cable link to the vehicle controller.
//!
//! The controller firmware prints one record per line at 115200 baud (8N1).
//! When no device path is configured the port is auto-detected through
//! [`discovery`](crate::discovery) on every open attempt, so a board that
//! re-enumerates under a new name is picked up on reconnect.

use async_trait::async_trait;
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use super::{read_line_from, LineAssembler, Transport, TransportKind};
use crate::discovery;
use crate::error::{LinkError, Result};

/// Bytes requested from the port per read
pub const SERIAL_CHUNK_SIZE: usize = 256;

/// Serial port transport
pub struct SerialTransport {
    /// Configured device path, `None` to auto-detect
    port: Option<String>,
    baud_rate: u32,
    /// Hints passed to discovery when auto-detecting
    board_hints: Vec<String>,
    /// Path actually opened
    device_path: Option<String>,
    stream: Option<tokio_serial::SerialStream>,
    lines: LineAssembler,
    scratch: [u8; SERIAL_CHUNK_SIZE],
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port)
            .field("baud_rate", &self.baud_rate)
            .field("device_path", &self.device_path)
            .field("open", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    pub fn new(port: Option<String>, baud_rate: u32, board_hints: Vec<String>) -> Self {
        Self {
            port,
            baud_rate,
            board_hints,
            device_path: None,
            stream: None,
            lines: LineAssembler::new(),
            scratch: [0u8; SERIAL_CHUNK_SIZE],
        }
    }

    /// Device path of the open port, if any
    pub fn device_path(&self) -> Option<&str> {
        self.device_path.as_deref()
    }

    fn resolve_path(&self) -> Result<String> {
        if let Some(port) = &self.port {
            return Ok(port.clone());
        }

        match discovery::require_best(&self.board_hints) {
            Ok(best) => {
                info!(
                    "Auto-detected serial port {} ({})",
                    best.device_path, best.description
                );
                Ok(best.device_path)
            }
            Err(e) => Err(LinkError::open(TransportKind::Serial, e)),
        }
    }

    /// Open a specific serial port with 8N1 settings
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Line speed
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| LinkError::open(TransportKind::Serial, format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    async fn open(&mut self) -> Result<()> {
        self.close().await;

        let path = self.resolve_path()?;
        debug!("Opening serial port {} at {} baud", path, self.baud_rate);

        let stream = Self::open_port(&path, self.baud_rate)?;
        info!("Opened serial port {} at {} baud", path, self.baud_rate);

        self.stream = Some(stream);
        self.device_path = Some(path);
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<String> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(LinkError::read(TransportKind::Serial, "port is not open"));
        };
        read_line_from(
            stream,
            &mut self.lines,
            &mut self.scratch,
            timeout,
            TransportKind::Serial,
        )
        .await
    }

    async fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            debug!(
                "Closed serial port {}",
                self.device_path.as_deref().unwrap_or("?")
            );
        }
        self.lines.clear();
        self.device_path = None;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
