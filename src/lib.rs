//! # nmea-receiver
//!
//! Core of an NMEA 0183 GPS receiver driver.
//!
//! This library turns the byte stream of a GPS receiver into cached,
//! timestamped readings and a small set of events. It frames CR LF
//! terminated sentences, decodes RMC and GGA, tracks fix and connection
//! state, and queues outbound commands for flow-controlled transmission.
//!
//! ## Overview
//!
//! A [`device::Device`] owns one receiver link. The host calls its hooks when
//! the transport has bytes, can accept bytes, or when the watchdog timer
//! fires; the device reports what changed through an
//! [`device::EventSink`]. Events carry no payload: the sink re-queries the
//! device for the reading it is interested in, along with its age.
//!
//! The [`driver`] module pumps a `std::io` or `futures_io` stream through a
//! device for hosts that do not want to call the hooks themselves.
//!
//! ## Example
//!
//! ```no_run
//! use nmea_receiver::config::DeviceConfig;
//! use nmea_receiver::device::{Device, Event};
//! use nmea_receiver::driver::blocking::Driver;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     // NMEA over TCP, e.g. a serial-to-network bridge
//!     let mut driver = Driver::connect(
//!         "127.0.0.1:10110",
//!         DeviceConfig::default(),
//!         |device: &Device, event: Event| match event {
//!             Event::LocationUpdate => println!("Location: {:?}", device.get_location()),
//!             Event::FixLost => println!("Fix lost"),
//!             _ => {}
//!         },
//!     )?;
//!
//!     driver.run()?;
//!     Ok(())
//! }
//! ```

use crate::error::GpsError;

/// Device settings, loadable from JSON
pub mod config;

/// The receiver device, its caches, state machines and events
pub mod device;

/// Stream drivers that call the device hooks
pub mod driver;

/// Error types used throughout the library
pub mod error;

/// CR LF line framing of the receive stream
pub mod framer;

/// Sentence types, decoding and checksums
pub mod protocol;

/// Clock and scheduler collaborators
pub mod timer;

/// Byte transports and transport id binding
pub mod transport;

/// Convenience type alias for Results with GpsError
pub type Result<T> = core::result::Result<T, GpsError>;
