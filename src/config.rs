//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! serial link with auto-detection at 115200 baud.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{LinkError, Result};
use crate::supervisor::SupervisorSettings;
use crate::transport::{ConnectionParameters, DefaultTransportFactory, TransportKind};

/// Baud rates accepted for the serial link
pub const STANDARD_BAUD_RATES: [u32; 12] = [
    9600, 19200, 38400, 57600, 115200, 230400, 250000, 460800, 500000, 921600, 1000000, 2000000,
];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Which link to open and where
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    #[serde(default = "default_transport")]
    pub transport: TransportKind,

    /// Serial device path; absent means auto-detect
    #[serde(default)]
    pub serial_port: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    #[serde(default)]
    pub bt_address: Option<String>,

    #[serde(default = "default_bt_channel")]
    pub bt_channel: u8,
}

/// Acquisition loop timing
#[derive(Debug, Deserialize, Clone)]
pub struct SupervisorConfig {
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

/// Serial port auto-detection
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Case-insensitive substrings matched against port descriptions
    #[serde(default = "default_board_hints")]
    pub board_hints: Vec<String>,
}

// Default value functions
fn default_transport() -> TransportKind { TransportKind::Serial }
fn default_baud_rate() -> u32 { crate::transport::DEFAULT_BAUD_RATE }
fn default_host() -> String { crate::transport::DEFAULT_HOST.to_string() }
fn default_tcp_port() -> u16 { crate::transport::DEFAULT_TCP_PORT }
fn default_bt_channel() -> u8 { crate::transport::DEFAULT_BT_CHANNEL }

fn default_read_timeout_ms() -> u64 { 1000 }
fn default_connect_timeout_ms() -> u64 { 5000 }
fn default_reconnect_delay_ms() -> u64 { 5000 }
fn default_event_queue_capacity() -> usize { crate::supervisor::DEFAULT_EVENT_QUEUE_CAPACITY }

fn default_board_hints() -> Vec<String> { crate::discovery::default_board_hints() }

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            serial_port: None,
            baud_rate: default_baud_rate(),
            host: default_host(),
            tcp_port: default_tcp_port(),
            bt_address: None,
            bt_channel: default_bt_channel(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            event_queue_capacity: default_event_queue_capacity(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            board_hints: default_board_hints(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> LinkError {
    LinkError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gotogo_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] if any value is out of its valid range
    pub fn validate(&self) -> Result<()> {
        let connection = &self.connection;

        if !STANDARD_BAUD_RATES.contains(&connection.baud_rate) {
            return Err(invalid(format!(
                "baud_rate {} is not a standard rate ({:?})",
                connection.baud_rate, STANDARD_BAUD_RATES
            )));
        }

        if let Some(port) = &connection.serial_port {
            if port.trim().is_empty() {
                return Err(invalid("serial_port cannot be empty (omit it to auto-detect)"));
            }
        }

        if connection.transport == TransportKind::Network && connection.host.trim().is_empty() {
            return Err(invalid("host cannot be empty for the network transport"));
        }

        if connection.tcp_port == 0 {
            return Err(invalid("tcp_port must be between 1 and 65535"));
        }

        if connection.bt_channel == 0 || connection.bt_channel > 30 {
            return Err(invalid("bt_channel must be between 1 and 30"));
        }

        // Validate timing fields
        let supervisor = &self.supervisor;

        if supervisor.read_timeout_ms == 0 || supervisor.read_timeout_ms > 10000 {
            return Err(invalid("read_timeout_ms must be between 1 and 10000"));
        }

        for (name, value) in [
            ("connect_timeout_ms", supervisor.connect_timeout_ms),
            ("reconnect_delay_ms", supervisor.reconnect_delay_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        if supervisor.event_queue_capacity == 0 {
            return Err(invalid("event_queue_capacity must be greater than 0"));
        }

        Ok(())
    }

    /// Connection parameters for the configured transport
    pub fn to_parameters(&self) -> ConnectionParameters {
        let connection = &self.connection;
        match connection.transport {
            TransportKind::Serial => ConnectionParameters::Serial {
                port: connection.serial_port.clone(),
                baud_rate: connection.baud_rate,
            },
            TransportKind::Network => {
                ConnectionParameters::network(connection.host.clone(), connection.tcp_port)
            }
            TransportKind::Wireless => ConnectionParameters::Wireless {
                address: connection.bt_address.clone(),
                channel: connection.bt_channel,
            },
        }
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            read_timeout: Duration::from_millis(self.supervisor.read_timeout_ms),
            reconnect_delay: Duration::from_millis(self.supervisor.reconnect_delay_ms),
            event_queue_capacity: self.supervisor.event_queue_capacity,
        }
    }

    pub fn transport_factory(&self) -> DefaultTransportFactory {
        DefaultTransportFactory {
            connect_timeout: Duration::from_millis(self.supervisor.connect_timeout_ms),
            board_hints: self.discovery.board_hints.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rejected(config: &Config, needle: &str) {
        match config.validate() {
            Err(LinkError::Config(e)) => assert!(
                e.to_string().contains(needle),
                "error {:?} does not mention {:?}",
                e.to_string(),
                needle
            ),
            other => panic!("Expected config error mentioning {:?}, got: {:?}", needle, other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.connection.transport, TransportKind::Serial);
        assert_eq!(config.connection.serial_port, None);
        assert_eq!(config.connection.baud_rate, 115200);
        assert_eq!(config.connection.host, "192.168.1.100");
        assert_eq!(config.connection.tcp_port, 8888);
        assert_eq!(config.connection.bt_channel, 1);
        assert_eq!(config.supervisor.read_timeout_ms, 1000);
        assert_eq!(config.supervisor.reconnect_delay_ms, 5000);
        assert_eq!(config.discovery.board_hints, vec!["Arduino", "USB"]);
    }

    #[test]
    fn test_empty_file_equals_default() {
        let parsed = Config::from_toml("").unwrap();
        let default = Config::default();
        assert_eq!(parsed.to_parameters(), default.to_parameters());
        assert_eq!(parsed.supervisor.connect_timeout_ms, default.supervisor.connect_timeout_ms);
        assert_eq!(parsed.discovery.board_hints, default.discovery.board_hints);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let config_content = r#"
[connection]
transport = "wifi"
host = "10.0.0.7"
tcp_port = 9000

[supervisor]
read_timeout_ms = 250
reconnect_delay_ms = 2000
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.connection.transport, TransportKind::Network);
        assert_eq!(
            config.to_parameters(),
            ConnectionParameters::network("10.0.0.7", 9000)
        );

        let settings = config.supervisor_settings();
        assert_eq!(settings.read_timeout, Duration::from_millis(250));
        assert_eq!(settings.reconnect_delay, Duration::from_secs(2));
        assert_eq!(settings.event_queue_capacity, 256);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/gotogo-link.toml").unwrap_err();
        assert!(matches!(err, LinkError::Io(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = Config::from_toml("[connection\ntransport = ").unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }

    #[test]
    fn test_unknown_transport_is_rejected() {
        let err = Config::from_toml("[connection]\ntransport = \"carrier-pigeon\"").unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }

    #[test]
    fn test_transport_aliases() {
        for (alias, kind) in [
            ("usb", TransportKind::Serial),
            ("serial", TransportKind::Serial),
            ("tcp", TransportKind::Network),
            ("network", TransportKind::Network),
            ("bluetooth", TransportKind::Wireless),
            ("wireless", TransportKind::Wireless),
        ] {
            let config =
                Config::from_toml(&format!("[connection]\ntransport = \"{}\"", alias)).unwrap();
            assert_eq!(config.connection.transport, kind, "alias {}", alias);
        }
    }

    #[test]
    fn test_serial_parameters() {
        let config = Config::from_toml(
            "[connection]\nserial_port = \"/dev/ttyUSB0\"\nbaud_rate = 9600",
        )
        .unwrap();
        assert_eq!(
            config.to_parameters(),
            ConnectionParameters::Serial {
                port: Some("/dev/ttyUSB0".to_string()),
                baud_rate: 9600,
            }
        );
    }

    #[test]
    fn test_wireless_parameters() {
        let config = Config::from_toml(
            "[connection]\ntransport = \"bluetooth\"\nbt_address = \"00:11:22:33:44:55\"\nbt_channel = 3",
        )
        .unwrap();
        assert_eq!(
            config.to_parameters(),
            ConnectionParameters::Wireless {
                address: Some("00:11:22:33:44:55".to_string()),
                channel: 3,
            }
        );
    }

    #[test]
    fn test_transport_factory_settings() {
        let config = Config::from_toml(
            "[supervisor]\nconnect_timeout_ms = 1500\n[discovery]\nboard_hints = [\"CH340\"]",
        )
        .unwrap();
        let factory = config.transport_factory();
        assert_eq!(factory.connect_timeout, Duration::from_millis(1500));
        assert_eq!(factory.board_hints, vec!["CH340"]);
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.connection.baud_rate = 420000;
        assert_rejected(&config, "baud_rate");
    }

    #[test]
    fn test_valid_baud_rates() {
        let mut config = Config::default();
        for rate in STANDARD_BAUD_RATES {
            config.connection.baud_rate = rate;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", rate);
        }
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.connection.serial_port = Some("  ".to_string());
        assert_rejected(&config, "serial_port");
    }

    #[test]
    fn test_empty_host_for_network() {
        let mut config = Config::default();
        config.connection.transport = TransportKind::Network;
        config.connection.host = String::new();
        assert_rejected(&config, "host");
    }

    #[test]
    fn test_empty_host_ignored_for_serial() {
        let mut config = Config::default();
        config.connection.host = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tcp_port_zero() {
        let mut config = Config::default();
        config.connection.tcp_port = 0;
        assert_rejected(&config, "tcp_port");
    }

    #[test]
    fn test_bt_channel_out_of_range() {
        let mut config = Config::default();
        config.connection.bt_channel = 0;
        assert_rejected(&config, "bt_channel");
        config.connection.bt_channel = 31;
        assert_rejected(&config, "bt_channel");
        config.connection.bt_channel = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_read_timeout_zero() {
        let mut config = Config::default();
        config.supervisor.read_timeout_ms = 0;
        assert_rejected(&config, "read_timeout_ms");
    }

    #[test]
    fn test_read_timeout_too_high() {
        let mut config = Config::default();
        config.supervisor.read_timeout_ms = 10001;
        assert_rejected(&config, "read_timeout_ms");
    }

    #[test]
    fn test_connect_timeout_zero() {
        let mut config = Config::default();
        config.supervisor.connect_timeout_ms = 0;
        assert_rejected(&config, "connect_timeout_ms");
    }

    #[test]
    fn test_reconnect_delay_too_high() {
        let mut config = Config::default();
        config.supervisor.reconnect_delay_ms = 60001;
        assert_rejected(&config, "reconnect_delay_ms");
    }

    #[test]
    fn test_event_queue_capacity_zero() {
        let mut config = Config::default();
        config.supervisor.event_queue_capacity = 0;
        assert_rejected(&config, "event_queue_capacity");
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_transport(), TransportKind::Serial);
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_host(), "192.168.1.100");
        assert_eq!(default_tcp_port(), 8888);
        assert_eq!(default_bt_channel(), 1);
        assert_eq!(default_read_timeout_ms(), 1000);
        assert_eq!(default_connect_timeout_ms(), 5000);
        assert_eq!(default_reconnect_delay_ms(), 5000);
        assert_eq!(default_event_queue_capacity(), 256);
    }

    #[test]
    fn test_shipped_default_file_is_valid() {
        let contents = include_str!("../config/default.toml");
        let config = Config::from_toml(contents).unwrap();
        assert_eq!(config.to_parameters(), Config::default().to_parameters());
    }
}
