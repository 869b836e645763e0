//! Device and transport configuration
//!
//! Configuration is plain serde data and is usually loaded from JSON:
//!
//! ```
//! use nmea_receiver::config::DeviceConfig;
//!
//! let config = DeviceConfig::from_json(r#"{
//!     "transport": { "baud_rate": 9600, "parity": "N" },
//!     "watchdog_timeout": 2000
//! }"#).unwrap();
//! assert_eq!(config.transport.baud_rate, 9600);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as, skip_serializing_none};

use crate::Result;
use crate::framer::{DEFAULT_BUFFER_LIMIT, OverflowPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    #[default]
    No,
    Odd,
    Even,
}

impl Serialize for Parity {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Parity::No => "N",
            Parity::Odd => "O",
            Parity::Even => "E",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for Parity {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = String::deserialize(deserializer)?;
        match v.as_str() {
            "N" => Ok(Parity::No),
            "O" => Ok(Parity::Odd),
            "E" => Ok(Parity::Even),
            _ => Err(serde::de::Error::custom(format!(
                "invalid Parity value: {}",
                v
            ))),
        }
    }
}

/// Serial line settings handed to [`Transport::configure`](crate::transport::Transport::configure)
///
/// Transports that are not serial lines (TCP, in-memory) may ignore
/// everything but still reject settings that fail [`validate`](Self::validate).
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    /// Driver-side receive buffer size in bytes
    pub rx_buffer_size: Option<usize>,
    /// Driver-side transmit buffer size in bytes
    pub tx_buffer_size: Option<usize>,
}

impl Default for TransportConfig {
    /// 9600 8N1, the NMEA 0183 default
    fn default() -> Self {
        TransportConfig {
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::No,
            stop_bits: 1,
            rx_buffer_size: None,
            tx_buffer_size: None,
        }
    }
}

impl TransportConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Checks the settings every transport must refuse
    pub fn validate(&self) -> core::result::Result<(), String> {
        if self.baud_rate == 0 {
            return Err("baud rate must be positive".into());
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(format!("unsupported data bits: {}", self.data_bits));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(format!("unsupported stop bits: {}", self.stop_bits));
        }
        Ok(())
    }
}

/// Everything needed to create a [`Device`](crate::device::Device)
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub transport: TransportConfig,
    /// Silence after which the link is declared timed out, in milliseconds
    ///
    /// Absent or zero leaves the watchdog disabled.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchdog_timeout: Option<Duration>,
    /// Maximum unterminated bytes kept by the line framer
    pub rx_buffer_limit: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            transport: TransportConfig::default(),
            watchdog_timeout: None,
            rx_buffer_limit: DEFAULT_BUFFER_LIMIT,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl DeviceConfig {
    /// Parses a configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(crate::error::GpsError::SerdeError)
    }

    /// Renders the configuration as a JSON document
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(crate::error::GpsError::SerdeError)
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_watchdog_timeout(mut self, timeout: Duration) -> Self {
        self.watchdog_timeout = Some(timeout);
        self
    }

    pub fn with_rx_buffer_limit(mut self, limit: usize, policy: OverflowPolicy) -> Self {
        self.rx_buffer_limit = limit;
        self.overflow_policy = policy;
        self
    }
}
