//! # Network Transport
//!
//! TCP stream to a controller running a WiFi module.
//!
//! Connection establishment is bounded by a connect timeout (5s by default)
//! so an unreachable host fails fast; after the handshake each read is
//! bounded by the per-call timeout passed to `read_line`.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::{read_line_from, LineAssembler, Transport, TransportKind};
use crate::error::{LinkError, Result};

/// Bytes requested from the socket per read
pub const NETWORK_CHUNK_SIZE: usize = 1024;

/// TCP stream transport
pub struct NetworkTransport {
    host: String,
    port: u16,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    lines: LineAssembler,
    scratch: [u8; NETWORK_CHUNK_SIZE],
}

impl std::fmt::Debug for NetworkTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("open", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

impl NetworkTransport {
    pub fn new(host: String, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host,
            port,
            connect_timeout,
            stream: None,
            lines: LineAssembler::new(),
            scratch: [0u8; NETWORK_CHUNK_SIZE],
        }
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Network
    }

    async fn open(&mut self) -> Result<()> {
        self.close().await;

        let endpoint = self.endpoint();
        debug!("Connecting to {} (timeout {:?})", endpoint, self.connect_timeout);

        let connect = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await;

        let stream = match connect {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(LinkError::open(
                    TransportKind::Network,
                    format!("{}: {}", endpoint, e),
                ))
            }
            Err(_) => {
                return Err(LinkError::open(
                    TransportKind::Network,
                    format!("{}: connect timed out after {:?}", endpoint, self.connect_timeout),
                ))
            }
        };

        info!("Connected to {}", endpoint);
        self.stream = Some(stream);
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<String> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(LinkError::read(TransportKind::Network, "socket is not connected"));
        };
        read_line_from(
            stream,
            &mut self.lines,
            &mut self.scratch,
            timeout,
            TransportKind::Network,
        )
        .await
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Ignoring shutdown error on {}: {}", self.endpoint(), e);
            }
            debug!("Closed connection to {}", self.endpoint());
        }
        self.lines.clear();
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
