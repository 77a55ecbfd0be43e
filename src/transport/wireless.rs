//! Reserved short-range wireless transport
//!
//! Bluetooth RFCOMM is part of the connection vocabulary (configuration,
//! status events) but has no link implementation on this build, so every
//! open attempt fails cleanly.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{Transport, TransportKind};
use crate::error::{LinkError, Result};

#[derive(Debug)]
pub struct WirelessTransport {
    address: Option<String>,
    channel: u8,
}

impl WirelessTransport {
    pub fn new(address: Option<String>, channel: u8) -> Self {
        Self { address, channel }
    }
}

#[async_trait]
impl Transport for WirelessTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Wireless
    }

    async fn open(&mut self) -> Result<()> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| LinkError::open(TransportKind::Wireless, "no device address configured"))?;

        Err(LinkError::open(
            TransportKind::Wireless,
            format!("{} channel {}: not supported on this build", address, self.channel),
        ))
    }

    async fn read_line(&mut self, _timeout: Duration) -> Result<String> {
        Err(LinkError::read(TransportKind::Wireless, "link is not open"))
    }

    async fn close(&mut self) {
        debug!("Wireless transport close (nothing to release)");
    }

    fn is_open(&self) -> bool {
        false
    }
}
