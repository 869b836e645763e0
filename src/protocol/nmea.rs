//! Talker-agnostic RMC/GGA decoder
//!
//! Accepts any two-letter talker id (`GP`, `GN`, `GL`, ...) in front of the
//! sentence type. A `*hh` checksum is verified when present; sentences that
//! omit it are accepted as-is, matching the lenient mode most receivers'
//! host libraries use.

use chrono::NaiveTime;

use super::types::{Gga, NmeaDate, Rmc};
use super::{Sentence, SentenceDecoder, verified_payload};

/// The bundled [`SentenceDecoder`]
#[derive(Debug, Clone, Copy, Default)]
pub struct NmeaDecoder;

impl NmeaDecoder {
    pub fn new() -> Self {
        NmeaDecoder
    }
}

impl SentenceDecoder for NmeaDecoder {
    fn decode(&self, sentence: &str) -> Sentence {
        let sentence = sentence.trim_end();
        if sentence.starts_with('!') {
            // AIS encapsulation, never position data for us
            return Sentence::Unrecognized;
        }

        let Some(payload) = verified_payload(sentence) else {
            return Sentence::Malformed;
        };

        let mut fields = payload.split(',');
        let address = fields.next().unwrap_or_default();
        if !address.bytes().all(|b| b.is_ascii_alphanumeric()) || address.is_empty() {
            return Sentence::Malformed;
        }
        if address.starts_with('P') {
            return Sentence::Proprietary;
        }
        if address.len() != 5 {
            return Sentence::Malformed;
        }

        let fields: Vec<&str> = fields.collect();
        match &address[2..] {
            "RMC" => parse_rmc(&fields).map_or(Sentence::Malformed, Sentence::PrimaryFix),
            "GGA" => parse_gga(&fields).map_or(Sentence::Malformed, Sentence::SecondaryFix),
            _ => Sentence::Unrecognized,
        }
    }
}

/// `hhmmss[.sss]`
fn parse_time(field: &str) -> Result<Option<NaiveTime>, ()> {
    if field.is_empty() {
        return Ok(None);
    }
    let (whole, frac) = field.split_once('.').unwrap_or((field, ""));
    if whole.len() != 6 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    let hours: u32 = whole[0..2].parse().map_err(|_| ())?;
    let minutes: u32 = whole[2..4].parse().map_err(|_| ())?;
    let seconds: u32 = whole[4..6].parse().map_err(|_| ())?;

    let micros = if frac.is_empty() {
        0
    } else {
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(());
        }
        // pad/truncate to six digits
        let digits: String = frac.chars().chain(std::iter::repeat('0')).take(6).collect();
        digits.parse::<u32>().map_err(|_| ())?
    };

    NaiveTime::from_hms_micro_opt(hours, minutes, seconds, micros)
        .map(Some)
        .ok_or(())
}

/// `ddmmyy`
fn parse_date(field: &str) -> Result<Option<NmeaDate>, ()> {
    if field.is_empty() {
        return Ok(None);
    }
    if field.len() != 6 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    let day: u8 = field[0..2].parse().map_err(|_| ())?;
    let month: u8 = field[2..4].parse().map_err(|_| ())?;
    let year: u8 = field[4..6].parse().map_err(|_| ())?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(());
    }
    Ok(Some(NmeaDate { day, month, year }))
}

/// `[d]ddmm.mmmm` plus hemisphere, converted to signed decimal degrees
fn parse_coord(value: &str, hemisphere: &str) -> Result<Option<f64>, ()> {
    if value.is_empty() {
        return Ok(None);
    }
    let raw: f64 = value.parse().map_err(|_| ())?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(());
    }
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Ok(Some(decimal)),
        "S" | "W" => Ok(Some(-decimal)),
        _ => Err(()),
    }
}

fn parse_float(field: &str) -> Result<Option<f64>, ()> {
    if field.is_empty() {
        return Ok(None);
    }
    field.parse::<f64>().map(Some).map_err(|_| ())
}

fn parse_int(field: &str) -> Result<u8, ()> {
    if field.is_empty() {
        return Ok(0);
    }
    field.parse::<u8>().map_err(|_| ())
}

fn parse_char(field: &str) -> Option<char> {
    field.chars().next()
}

fn parse_rmc(fields: &[&str]) -> Option<Rmc> {
    if fields.len() < 11 {
        return None;
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or_default();

    let valid = match field(1) {
        "A" => true,
        "V" | "" => false,
        _ => return None,
    };

    let variation = match parse_float(field(9)).ok()? {
        Some(v) => match field(10) {
            "W" => Some(-v),
            _ => Some(v),
        },
        None => None,
    };

    Some(Rmc {
        time: parse_time(field(0)).ok()?,
        valid,
        latitude: parse_coord(field(2), field(3)).ok()?,
        longitude: parse_coord(field(4), field(5)).ok()?,
        speed: parse_float(field(6)).ok()?,
        course: parse_float(field(7)).ok()?,
        date: parse_date(field(8)).ok()?,
        variation,
    })
}

fn parse_gga(fields: &[&str]) -> Option<Gga> {
    if fields.len() < 14 {
        return None;
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or_default();

    Some(Gga {
        time: parse_time(field(0)).ok()?,
        latitude: parse_coord(field(1), field(2)).ok()?,
        longitude: parse_coord(field(3), field(4)).ok()?,
        fix_quality: parse_int(field(5)).ok()?,
        satellites_tracked: parse_int(field(6)).ok()?,
        hdop: parse_float(field(7)).ok()?,
        altitude: parse_float(field(8)).ok()?,
        altitude_units: parse_char(field(9)),
        geoid_height: parse_float(field(10)).ok()?,
        dgps_age: parse_float(field(12)).ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &str) -> Sentence {
        NmeaDecoder.decode(s)
    }

    #[test]
    fn test_decode_rmc() {
        let Sentence::PrimaryFix(rmc) = decode(
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A",
        ) else {
            panic!("expected RMC");
        };
        assert!(rmc.valid);
        assert!((rmc.latitude.unwrap() - 48.1173).abs() < 1e-9);
        assert!((rmc.longitude.unwrap() - 11.516_666_666).abs() < 1e-6);
        assert_eq!(rmc.speed, Some(22.4));
        assert_eq!(rmc.course, Some(84.4));
        assert_eq!(rmc.variation, Some(-3.1));
        assert_eq!(
            rmc.date,
            Some(NmeaDate {
                day: 23,
                month: 3,
                year: 94
            })
        );
        assert_eq!(rmc.time, NaiveTime::from_hms_opt(12, 35, 19));
    }

    #[test]
    fn test_decode_rmc_void() {
        let Sentence::PrimaryFix(rmc) = decode("$GPRMC,123519,V,,,,,,,230394,,*33") else {
            panic!("expected RMC");
        };
        assert!(!rmc.valid);
        assert_eq!(rmc.latitude, None);
    }

    #[test]
    fn test_decode_gga() {
        let Sentence::SecondaryFix(gga) =
            decode("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47")
        else {
            panic!("expected GGA");
        };
        assert_eq!(gga.fix_quality, 1);
        assert_eq!(gga.satellites_tracked, 8);
        assert_eq!(gga.hdop, Some(0.9));
        assert_eq!(gga.altitude, Some(545.4));
        assert_eq!(gga.altitude_units, Some('M'));
        assert_eq!(gga.geoid_height, Some(46.9));
        assert_eq!(gga.dgps_age, None);
    }

    #[test]
    fn test_decode_fractional_time() {
        assert_eq!(
            parse_time("235959.25"),
            Ok(NaiveTime::from_hms_micro_opt(23, 59, 59, 250_000))
        );
        assert_eq!(parse_time("2359"), Err(()));
    }

    #[test]
    fn test_decode_other_talkers() {
        assert!(matches!(
            decode("$GNGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            Sentence::SecondaryFix(_)
        ));
    }

    #[test]
    fn test_decode_classification() {
        assert_eq!(decode("$GPGSV,3,1,11,03,03,111,00*4A"), Sentence::Unrecognized);
        assert_eq!(decode("$PMTK001,220,3*30"), Sentence::Proprietary);
        assert_eq!(decode("$GPGGA,123519*00"), Sentence::Malformed);
        assert_eq!(decode("garbage"), Sentence::Malformed);
        assert_eq!(decode(""), Sentence::Malformed);
        assert_eq!(decode("$GPRMC,1,2,3"), Sentence::Malformed);
        assert_eq!(
            decode("$GPRMC,123519,A,4807.038,Q,01131.000,E,022.4,084.4,230394,003.1,W"),
            Sentence::Malformed
        );
    }
}
