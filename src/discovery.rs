//! # Port Discovery
//!
//! Enumerates host serial ports and picks the one most likely to be the
//! vehicle controller.
//!
//! Selection order:
//! 1. A port whose description matches a board hint, or whose USB vendor id
//!    belongs to a common USB-serial bridge
//! 2. A port whose device path follows the host OS naming for USB serial
//! 3. The first enumerated port

use serde::Serialize;
use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::{debug, warn};

use crate::error::{LinkError, Result};

/// USB vendor ids of boards and USB-serial bridge chips seen on controllers
pub const KNOWN_USB_VENDOR_IDS: &[(u16, &str)] = &[
    (0x2341, "Arduino"),
    (0x2A03, "Arduino.org"),
    (0x1A86, "WCH CH340"),
    (0x10C4, "Silicon Labs CP210x"),
    (0x0403, "FTDI"),
];

/// Description substrings that identify a controller board
pub fn default_board_hints() -> Vec<String> {
    vec!["Arduino".to_string(), "USB".to_string()]
}

/// One host-visible serial endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// Path or name to open (e.g. `/dev/ttyACM0`, `COM3`)
    pub device_path: String,

    /// Human readable description
    pub description: String,

    /// Hardware id, `USB VID:PID=2341:0043 SER=...` for USB ports
    pub hardware_id: String,
}

impl PortInfo {
    /// USB vendor id parsed back out of the hardware id
    pub fn usb_vendor_id(&self) -> Option<u16> {
        let start = self.hardware_id.find("VID:PID=")? + "VID:PID=".len();
        let vid = self.hardware_id.get(start..start + 4)?;
        u16::from_str_radix(vid, 16).ok()
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (description, hardware_id) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = usb
                    .product
                    .clone()
                    .or_else(|| usb.manufacturer.clone())
                    .unwrap_or_else(|| "USB Serial Device".to_string());
                let serial = usb
                    .serial_number
                    .map(|s| format!(" SER={}", s))
                    .unwrap_or_default();
                (
                    description,
                    format!("USB VID:PID={:04X}:{:04X}{}", usb.vid, usb.pid, serial),
                )
            }
            SerialPortType::BluetoothPort => ("Bluetooth".to_string(), "n/a".to_string()),
            SerialPortType::PciPort => ("PCI".to_string(), "n/a".to_string()),
            SerialPortType::Unknown => ("n/a".to_string(), "n/a".to_string()),
        };

        Self {
            device_path: info.port_name,
            description,
            hardware_id,
        }
    }
}

/// Operating system family, for device naming conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => HostOs::Windows,
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            _ => HostOs::Other,
        }
    }

    /// Whether `path` follows this OS's naming for USB serial adapters
    pub fn is_usb_serial_path(&self, path: &str) -> bool {
        match self {
            HostOs::Linux => path.starts_with("/dev/ttyUSB") || path.starts_with("/dev/ttyACM"),
            HostOs::MacOs => {
                let lower = path.to_lowercase();
                (path.starts_with("/dev/cu.") || path.starts_with("/dev/tty."))
                    && (lower.contains("usb") || lower.contains("serial"))
            }
            HostOs::Windows | HostOs::Other => false,
        }
    }
}

/// List serial ports visible to the host
///
/// An enumeration failure is logged and reported as an empty list; having no
/// ports is a normal outcome that the caller decides how to handle.
pub fn discover() -> Vec<PortInfo> {
    match tokio_serial::available_ports() {
        Ok(ports) => {
            let ports: Vec<PortInfo> = ports.into_iter().map(PortInfo::from).collect();
            debug!("Discovered {} serial port(s)", ports.len());
            ports
        }
        Err(e) => {
            warn!("Serial port enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// Pick the preferred port for the running OS with the default hints
pub fn select_best(ports: &[PortInfo]) -> Option<&PortInfo> {
    select_best_for(ports, HostOs::current(), &default_board_hints())
}

/// Pick the preferred port for `os`
///
/// Returns `None` only when `ports` is empty.
pub fn select_best_for<'a>(
    ports: &'a [PortInfo],
    os: HostOs,
    hints: &[String],
) -> Option<&'a PortInfo> {
    let hints: Vec<String> = hints.iter().map(|h| h.to_lowercase()).collect();

    let matches_hint = |port: &PortInfo| {
        let description = port.description.to_lowercase();
        hints.iter().any(|h| description.contains(h.as_str()))
            || port
                .usb_vendor_id()
                .is_some_and(|vid| KNOWN_USB_VENDOR_IDS.iter().any(|(known, _)| *known == vid))
    };

    ports
        .iter()
        .find(|port| matches_hint(port))
        .or_else(|| ports.iter().find(|port| os.is_usb_serial_path(&port.device_path)))
        .or_else(|| ports.first())
}

/// Discover ports and return the preferred one
///
/// # Errors
///
/// Returns [`LinkError::DiscoveryEmpty`] when the host has no serial ports
pub fn require_best(hints: &[String]) -> Result<PortInfo> {
    let ports = discover();
    select_best_for(&ports, HostOs::current(), hints)
        .cloned()
        .ok_or(LinkError::DiscoveryEmpty)
}
