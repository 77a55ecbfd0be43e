//! # Error Types
//!
//! Custom error types for the telemetry link using `thiserror`.

use thiserror::Error;

use crate::protocol::DecodeError;
use crate::transport::TransportKind;

/// Main error type for the telemetry link
#[derive(Debug, Error)]
pub enum LinkError {
    /// Port enumeration produced nothing to connect to
    #[error("no serial ports found")]
    DiscoveryEmpty,

    /// Transport could not be established
    #[error("failed to open {transport} transport: {cause}")]
    OpenFailure {
        transport: TransportKind,
        cause: String,
    },

    /// I/O fault on an established transport
    #[error("read failed on {transport} transport: {cause}")]
    ReadFailure {
        transport: TransportKind,
        cause: String,
    },

    /// One malformed protocol line
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Build an [`LinkError::OpenFailure`] from any displayable cause
    pub fn open(transport: TransportKind, cause: impl std::fmt::Display) -> Self {
        Self::OpenFailure {
            transport,
            cause: cause.to_string(),
        }
    }

    /// Build a [`LinkError::ReadFailure`] from any displayable cause
    pub fn read(transport: TransportKind, cause: impl std::fmt::Display) -> Self {
        Self::ReadFailure {
            transport,
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for the telemetry link
pub type Result<T> = std::result::Result<T, LinkError>;
