//! # Transport Module
//!
//! Byte-stream links to the vehicle controller.
//!
//! This module handles:
//! - The [`Transport`] capability (`open`, `read_line`, `close`) shared by every link kind
//! - USB serial, TCP network stream, and the reserved short-range wireless kind
//! - Reassembling newline-terminated records from raw reads
//! - Creating one transport per connection attempt via [`TransportFactory`]

pub mod line;
pub mod network;
pub mod serial;
pub mod wireless;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;

use crate::error::{LinkError, Result};

pub use line::LineAssembler;
pub use network::NetworkTransport;
pub use serial::SerialTransport;
pub use wireless::WirelessTransport;

/// Default serial baud rate of the controller firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default controller address when it runs as a WiFi access point
pub const DEFAULT_HOST: &str = "192.168.1.100";

/// Default TCP port served by the controller
pub const DEFAULT_TCP_PORT: u16 = 8888;

/// Default RFCOMM channel for the wireless kind
pub const DEFAULT_BT_CHANNEL: u8 = 1;

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Physical/logical channel family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// USB cable serial port
    #[serde(alias = "usb")]
    Serial,

    /// TCP stream over WiFi
    #[serde(alias = "wifi", alias = "tcp")]
    Network,

    /// Reserved short-range wireless link (Bluetooth RFCOMM)
    #[serde(alias = "bluetooth")]
    Wireless,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Serial => "serial",
            TransportKind::Network => "network",
            TransportKind::Wireless => "wireless",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" | "usb" => Ok(TransportKind::Serial),
            "network" | "wifi" | "tcp" => Ok(TransportKind::Network),
            "wireless" | "bluetooth" => Ok(TransportKind::Wireless),
            other => Err(format!(
                "unknown transport '{}' (expected serial, network or wireless)",
                other
            )),
        }
    }
}

/// Parameters of one logical connection
///
/// Fixed for the lifetime of a supervisor session and reused verbatim on
/// every reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionParameters {
    Serial {
        /// Device path; `None` auto-detects through port discovery on open
        port: Option<String>,
        baud_rate: u32,
    },
    Network {
        host: String,
        port: u16,
    },
    Wireless {
        address: Option<String>,
        channel: u8,
    },
}

impl ConnectionParameters {
    /// Serial link at the default baud rate
    pub fn serial(port: Option<String>) -> Self {
        Self::Serial {
            port,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// TCP link to `host:port`
    pub fn network(host: impl Into<String>, port: u16) -> Self {
        Self::Network {
            host: host.into(),
            port,
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Serial { .. } => TransportKind::Serial,
            Self::Network { .. } => TransportKind::Network,
            Self::Wireless { .. } => TransportKind::Wireless,
        }
    }
}

impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { port: Some(port), baud_rate } => {
                write!(f, "serial {} @ {} baud", port, baud_rate)
            }
            Self::Serial { port: None, baud_rate } => {
                write!(f, "serial (auto-detect) @ {} baud", baud_rate)
            }
            Self::Network { host, port } => write!(f, "tcp {}:{}", host, port),
            Self::Wireless { address, channel } => write!(
                f,
                "wireless {} ch {}",
                address.as_deref().unwrap_or("(unset)"),
                channel
            ),
        }
    }
}

/// Uniform contract over every transport kind
///
/// One instance represents one connection attempt. `read_line` is only valid
/// after a successful `open`; `close` may be called any number of times.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Transport family, used to tag errors and status events
    fn kind(&self) -> TransportKind;

    /// Establish the link
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::OpenFailure`] if the link cannot be established
    async fn open(&mut self) -> Result<()>;

    /// Read the next record line, waiting at most `timeout`
    ///
    /// Returns an empty string when no complete line arrived in time.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ReadFailure`] on an I/O fault or end of stream
    async fn read_line(&mut self, timeout: Duration) -> Result<String>;

    /// Release the link; never fails, errors are only logged
    async fn close(&mut self);

    /// True between a successful `open` and the next `close`
    fn is_open(&self) -> bool;
}

/// Creates a fresh transport for each connection attempt
pub trait TransportFactory: Send + Sync {
    fn create(&self, params: &ConnectionParameters) -> Box<dyn Transport>;
}

/// Factory for the real serial / TCP / wireless transports
#[derive(Debug, Clone)]
pub struct DefaultTransportFactory {
    /// Upper bound on TCP connection establishment
    pub connect_timeout: Duration,

    /// Description hints used when the serial port is auto-detected
    pub board_hints: Vec<String>,
}

impl Default for DefaultTransportFactory {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            board_hints: crate::discovery::default_board_hints(),
        }
    }
}

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, params: &ConnectionParameters) -> Box<dyn Transport> {
        match params {
            ConnectionParameters::Serial { port, baud_rate } => Box::new(SerialTransport::new(
                port.clone(),
                *baud_rate,
                self.board_hints.clone(),
            )),
            ConnectionParameters::Network { host, port } => Box::new(NetworkTransport::new(
                host.clone(),
                *port,
                self.connect_timeout,
            )),
            ConnectionParameters::Wireless { address, channel } => {
                Box::new(WirelessTransport::new(address.clone(), *channel))
            }
        }
    }
}

/// Read from `reader` until `lines` yields a complete line or `timeout` expires
///
/// Bytes of an unfinished line stay buffered in `lines` for the next call.
pub(crate) async fn read_line_from<R>(
    reader: &mut R,
    lines: &mut LineAssembler,
    scratch: &mut [u8],
    timeout: Duration,
    kind: TransportKind,
) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(line) = lines.next_line() {
            return Ok(line);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(String::new());
        }

        match tokio::time::timeout(remaining, reader.read(scratch)).await {
            Ok(Ok(0)) => return Err(LinkError::read(kind, "end of stream")),
            Ok(Ok(n)) => lines.push(&scratch[..n]),
            Ok(Err(e)) => return Err(LinkError::read(kind, e)),
            Err(_) => return Ok(String::new()),
        }
    }
}
