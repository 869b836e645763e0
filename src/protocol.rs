//! Sentence-level protocol definitions
//!
//! A receiver talks NMEA 0183: ASCII sentences of the form
//! `$<address>,<field>,...*<checksum>\r\n`. This module defines the
//! collaborator seams around those sentences:
//!
//! - [`RawLine`]: one framed sentence as it came off the wire
//! - [`SentenceDecoder`]: classifies a sentence and extracts typed fields
//! - [`NmeaRequest`]: renders an outbound command string
//!
//! The bundled [`nmea::NmeaDecoder`] understands RMC and GGA from any talker
//! and recognises `$P...` vendor sentences as proprietary.

/// Default NMEA 0183 sentence decoder
pub mod nmea;
/// MediaTek PMTK command set and proprietary sentence parsing
#[cfg(feature = "pmtk")]
pub mod pmtk;
/// Typed field sets produced by the decoder
pub mod types;

use types::{Gga, Rmc};

/// Two-byte sentence terminator used on the wire
pub const TERMINATOR: &[u8; 2] = b"\r\n";

/// One framed sentence, terminator included
///
/// Produced by the [`LineFramer`](crate::framer::LineFramer) and handed to the
/// sentence router. A `RawLine` is never mutated after framing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawLine(Vec<u8>);

impl RawLine {
    /// Wraps raw sentence bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        RawLine(bytes.into())
    }

    /// Full line bytes including the terminator, if one was present
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Line bytes with a trailing CR LF removed
    pub fn body(&self) -> &[u8] {
        self.0.strip_suffix(TERMINATOR).unwrap_or(&self.0)
    }

    /// Line body as text, or `None` if it is not valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.body()).ok()
    }

    /// True for an empty or whitespace-only line
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|b| b.is_ascii_whitespace())
    }

    /// Length in bytes, terminator included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the line holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the line and returns its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for RawLine {
    fn from(s: &str) -> Self {
        RawLine(s.as_bytes().to_vec())
    }
}

/// Classification of one sentence
///
/// Decoders return the field set for the two tracked sentence kinds and a
/// bare tag for everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    /// Position, velocity and date/time (RMC)
    PrimaryFix(Rmc),
    /// Fix quality, satellites, HDOP and altitude (GGA)
    SecondaryFix(Gga),
    /// Vendor-specific `$P...` sentence
    Proprietary,
    /// Well-formed sentence of a kind this decoder does not track
    Unrecognized,
    /// Not a valid sentence: bad framing, checksum mismatch or unparsable field
    Malformed,
}

/// Classifies sentence text and extracts typed fields
///
/// The input is the sentence body without its line terminator. Decoders
/// must not panic on arbitrary input.
pub trait SentenceDecoder: Send {
    fn decode(&self, sentence: &str) -> Sentence;
}

/// An outbound command for the receiver
///
/// `to_command` returns the sentence without its line terminator; the
/// [`Device`](crate::device::Device) appends CR LF when queueing.
pub trait NmeaRequest {
    fn to_command(&self) -> String;
}

/// XOR checksum over the characters between `$` and `*`
pub fn checksum(payload: &str) -> u8 {
    payload.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Builds `$<payload>*<checksum>` for the given payload
pub fn with_checksum(payload: &str) -> String {
    format!("${}*{:02X}", payload, checksum(payload))
}

/// Splits `$payload*hh` into its payload, verifying the checksum if present
///
/// Returns `None` when the leading `$` is missing, the checksum is not two
/// hex digits, or it does not match the payload.
pub(crate) fn verified_payload(sentence: &str) -> Option<&str> {
    let body = sentence.trim_end().strip_prefix('$')?;
    match body.rsplit_once('*') {
        Some((payload, sum)) => {
            if sum.len() != 2 {
                return None;
            }
            let expected = u8::from_str_radix(sum, 16).ok()?;
            (checksum(payload) == expected).then_some(payload)
        }
        None => Some(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_line_body_strips_terminator() {
        let line = RawLine::from("$GPGGA,1*00\r\n");
        assert_eq!(line.body(), b"$GPGGA,1*00");
        assert_eq!(line.as_str(), Some("$GPGGA,1*00"));
        assert_eq!(line.len(), 13);
    }

    #[test]
    fn test_raw_line_blank() {
        assert!(RawLine::from("\r\n").is_blank());
        assert!(RawLine::from("  \t\r\n").is_blank());
        assert!(!RawLine::from("$\r\n").is_blank());
    }

    #[test]
    fn test_checksum_matches_known_commands() {
        assert_eq!(with_checksum("PMTK220,1000"), "$PMTK220,1000*1F");
        assert_eq!(with_checksum("PMTK251,9600"), "$PMTK251,9600*17");
        assert_eq!(with_checksum("PGCMD,33,1"), "$PGCMD,33,1*6C");
    }

    #[test]
    fn test_verified_payload() {
        assert_eq!(verified_payload("$PMTK605*31"), Some("PMTK605"));
        assert_eq!(verified_payload("$PMTK605"), Some("PMTK605"));
        assert_eq!(verified_payload("$PMTK605*30"), None);
        assert_eq!(verified_payload("$PMTK605*3"), None);
        assert_eq!(verified_payload("PMTK605*31"), None);
    }
}
