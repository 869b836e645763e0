//! Error types for NMEA receiver operations
//!
//! This module defines the errors that can surface through the public
//! [`Device`](crate::device::Device) API. Problems inside the receive path
//! (unframed bytes, malformed or unknown sentences) are never reported here;
//! they are logged and skipped so later sentences keep flowing.

/// Main error type for NMEA receiver operations
#[derive(Debug)]
pub enum GpsError {
    /// I/O error reported by the transport
    ///
    /// Raised by reads or writes on the underlying byte link, e.g. when a
    /// serial device disappears or a TCP peer resets the connection.
    IoError(std::io::Error),

    /// JSON serialization/deserialization error
    ///
    /// Occurs when a [`DeviceConfig`](crate::config::DeviceConfig) document
    /// is malformed or does not match the expected structure.
    SerdeError(serde_json::Error),

    /// The transport rejected its configuration
    ///
    /// Fatal to [`Device::create`](crate::device::Device::create): no device
    /// is constructed and the transport binding is released.
    TransportConfig(String),

    /// Another live device is already bound to this transport id
    TransportInUse(String),

    /// A negative watchdog timeout was requested
    ///
    /// The value is the rejected timeout in milliseconds.
    InvalidTimeout(i64),

    /// Protocol-level error
    ///
    /// Indicates a sentence or command that cannot be expressed on the wire,
    /// such as a command containing an embedded line terminator.
    ProtocolError(&'static str),
}

impl core::fmt::Display for GpsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpsError::IoError(err) => write!(f, "IoError: {}", err),
            GpsError::SerdeError(err) => write!(f, "SerdeError: {}", err),
            GpsError::TransportConfig(msg) => write!(f, "TransportConfig: {}", msg),
            GpsError::TransportInUse(id) => {
                write!(f, "TransportInUse: a device is already bound to {}", id)
            }
            GpsError::InvalidTimeout(ms) => write!(f, "InvalidTimeout: {} ms", ms),
            GpsError::ProtocolError(msg) => write!(f, "ProtocolError: {}", msg),
        }
    }
}

impl core::error::Error for GpsError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            GpsError::IoError(err) => Some(err),
            GpsError::SerdeError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GpsError {
    fn from(err: std::io::Error) -> Self {
        GpsError::IoError(err)
    }
}

impl From<serde_json::Error> for GpsError {
    fn from(err: serde_json::Error) -> Self {
        GpsError::SerdeError(err)
    }
}
