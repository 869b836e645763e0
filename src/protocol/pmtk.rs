//! MediaTek PMTK commands and replies
//!
//! Receivers built on MediaTek chipsets (MT3329, MT3339, ...) accept
//! configuration through `$PMTK` sentences and answer with `$PMTK001`
//! acknowledgements. Commands implement [`NmeaRequest`] and can be queued
//! with [`Device::send_request`](crate::device::Device::send_request);
//! replies are picked up by registering a [`PmtkHandler`] as the device's
//! proprietary handler.
//!
//! # References
//!
//! - MTK NMEA Packet User Manual (PMTK command packets, revision A11)

use serde_repr::{Deserialize_repr, Serialize_repr};

use super::{NmeaRequest, RawLine, verified_payload, with_checksum};
use crate::device::{Device, ProprietaryHandler};

bitflags::bitflags! {
    /// Sentences enabled by [`PmtkCommand::SetNmeaOutput`]
    ///
    /// Bit positions follow the field order of `PMTK314`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SentenceOutput: u32 {
        const GLL = 1 << 0;
        const RMC = 1 << 1;
        const VTG = 1 << 2;
        const GGA = 1 << 3;
        const GSA = 1 << 4;
        const GSV = 1 << 5;
        const ZDA = 1 << 17;
    }
}

/// Number of frequency fields carried by `PMTK314`
const OUTPUT_FIELDS: u32 = 19;

/// A PMTK configuration command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmtkCommand {
    /// `PMTK220`: interval between NMEA outputs in milliseconds
    SetNmeaUpdateRate(u32),
    /// `PMTK300`: interval between position fixes in milliseconds
    SetFixControlRate(u32),
    /// `PMTK251`: serial baud rate
    SetBaudRate(u32),
    /// `PMTK314`: which sentences the receiver emits, once per fix
    SetNmeaOutput(SentenceOutput),
    /// `PMTK185,0`
    LocusStartLog,
    /// `PMTK185,1`
    LocusStopLog,
    /// `PMTK183`
    LocusQueryStatus,
    /// `PMTK184,1`
    LocusEraseFlash,
    /// `PMTK313,1`: search for SBAS satellites
    EnableSbas,
    /// `PMTK301,2`: use WAAS for DGPS corrections
    EnableWaas,
    /// `PMTK161,0`
    Standby,
    /// `PMTK010,002`
    Awake,
    /// `PMTK605`: ask for firmware release and version
    QueryRelease,
    /// `PGCMD,33`: antenna status reporting on or off
    AntennaStatus(bool),
}

impl NmeaRequest for PmtkCommand {
    fn to_command(&self) -> String {
        let payload = match self {
            PmtkCommand::SetNmeaUpdateRate(ms) => format!("PMTK220,{}", ms),
            PmtkCommand::SetFixControlRate(ms) => format!("PMTK300,{},0,0,0,0", ms),
            PmtkCommand::SetBaudRate(baud) => format!("PMTK251,{}", baud),
            PmtkCommand::SetNmeaOutput(output) => {
                let fields: Vec<&str> = (0..OUTPUT_FIELDS)
                    .map(|bit| if output.bits() & (1 << bit) != 0 { "1" } else { "0" })
                    .collect();
                format!("PMTK314,{}", fields.join(","))
            }
            PmtkCommand::LocusStartLog => "PMTK185,0".into(),
            PmtkCommand::LocusStopLog => "PMTK185,1".into(),
            PmtkCommand::LocusQueryStatus => "PMTK183".into(),
            PmtkCommand::LocusEraseFlash => "PMTK184,1".into(),
            PmtkCommand::EnableSbas => "PMTK313,1".into(),
            PmtkCommand::EnableWaas => "PMTK301,2".into(),
            PmtkCommand::Standby => "PMTK161,0".into(),
            PmtkCommand::Awake => "PMTK010,002".into(),
            PmtkCommand::QueryRelease => "PMTK605".into(),
            PmtkCommand::AntennaStatus(true) => "PGCMD,33,1".into(),
            PmtkCommand::AntennaStatus(false) => "PGCMD,33,0".into(),
        };
        with_checksum(&payload)
    }
}

/// Result flag of a `PMTK001` acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum AckFlag {
    InvalidCommand = 0,
    UnsupportedCommand = 1,
    ActionFailed = 2,
    ActionSucceeded = 3,
}

impl TryFrom<u8> for AckFlag {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(AckFlag::InvalidCommand),
            1 => Ok(AckFlag::UnsupportedCommand),
            2 => Ok(AckFlag::ActionFailed),
            3 => Ok(AckFlag::ActionSucceeded),
            other => Err(other),
        }
    }
}

/// `PMTK001,<command>,<flag>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PmtkAck {
    /// Packet type of the acknowledged command, e.g. 220
    pub command: u16,
    pub flag: AckFlag,
}

/// `PMTK010,<msg>` system message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum SystemMessage {
    Unknown = 0,
    Startup = 1,
    /// Host aiding (EPO) requested
    Notification = 2,
    /// Transition to normal mode succeeded
    Normal = 3,
}

/// A parsed PMTK reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PmtkSentence {
    Ack(PmtkAck),
    System(SystemMessage),
    /// Any other `$PMTK`/`$PGxxx` payload, checksum removed
    Other(String),
}

impl PmtkSentence {
    /// Parses one PMTK sentence body
    ///
    /// Returns `None` for non-PMTK input or when the checksum does not match.
    pub fn parse(sentence: &str) -> Option<Self> {
        let payload = verified_payload(sentence)?;
        if !payload.starts_with("PMTK") && !payload.starts_with("PG") {
            return None;
        }

        let mut fields = payload.split(',');
        match fields.next()? {
            "PMTK001" => {
                let command = fields.next()?.parse().ok()?;
                let flag = fields.next()?.parse::<u8>().ok()?;
                let flag = AckFlag::try_from(flag).ok()?;
                Some(PmtkSentence::Ack(PmtkAck { command, flag }))
            }
            "PMTK010" => {
                let msg = match fields.next()?.parse::<u8>().ok()? {
                    1 => SystemMessage::Startup,
                    2 => SystemMessage::Notification,
                    3 => SystemMessage::Normal,
                    _ => SystemMessage::Unknown,
                };
                Some(PmtkSentence::System(msg))
            }
            _ => Some(PmtkSentence::Other(payload.to_string())),
        }
    }
}

/// Proprietary handler that parses PMTK replies
///
/// Each recognised reply is passed to the callback together with the device,
/// so the callback can queue a follow-up command or re-query readings.
pub struct PmtkHandler<F> {
    callback: F,
}

impl<F> PmtkHandler<F>
where
    F: FnMut(PmtkSentence, &mut Device) + Send,
{
    pub fn new(callback: F) -> Self {
        PmtkHandler { callback }
    }
}

impl<F> ProprietaryHandler for PmtkHandler<F>
where
    F: FnMut(PmtkSentence, &mut Device) + Send,
{
    fn handle(&mut self, line: &RawLine, device: &mut Device) {
        let Some(text) = line.as_str() else {
            return;
        };
        match PmtkSentence::parse(text) {
            Some(sentence) => {
                tracing::debug!("PMTK reply: {:?}", sentence);
                (self.callback)(sentence, device);
            }
            None => tracing::debug!("Ignoring proprietary sentence: {}", text),
        }
    }
}
