use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Calendar date exactly as carried by RMC: day, month, two-digit year
///
/// The century is applied later by the device (see
/// [`CENTURY`](crate::device::CENTURY)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NmeaDate {
    pub day: u8,
    pub month: u8,
    /// Two-digit year, 0..=99
    pub year: u8,
}

/// Recommended Minimum sentence (RMC)
///
/// Carries the primary fix: position, speed, course, magnetic variation
/// and the UTC date/time of the fix.
///
/// Reference: [NMEA 0183 RMC](https://gpsd.gitlab.io/gpsd/NMEA.html#_rmc_recommended_minimum_navigation_information)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rmc {
    /// UTC time of fix
    pub time: Option<NaiveTime>,
    /// Status flag: `true` for `A` (active), `false` for `V` (void)
    pub valid: bool,
    /// Latitude in degrees (positive = North)
    pub latitude: Option<f64>,
    /// Longitude in degrees (positive = East)
    pub longitude: Option<f64>,
    /// Speed over ground in knots
    pub speed: Option<f64>,
    /// True course over ground in degrees
    pub course: Option<f64>,
    /// UTC date of fix
    pub date: Option<NmeaDate>,
    /// Magnetic variation in degrees (positive = East)
    pub variation: Option<f64>,
}

/// Global Positioning System Fix Data (GGA)
///
/// Reference: [NMEA 0183 GGA](https://gpsd.gitlab.io/gpsd/NMEA.html#_gga_global_positioning_system_fix_data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gga {
    /// UTC time of fix
    pub time: Option<NaiveTime>,
    /// Latitude in degrees (positive = North)
    pub latitude: Option<f64>,
    /// Longitude in degrees (positive = East)
    pub longitude: Option<f64>,
    /// Fix quality, 0 = no fix
    pub fix_quality: u8,
    /// Number of satellites in use
    pub satellites_tracked: u8,
    /// Horizontal dilution of precision
    pub hdop: Option<f64>,
    /// Antenna altitude above mean sea level
    pub altitude: Option<f64>,
    /// Unit of `altitude`, normally `M`
    pub altitude_units: Option<char>,
    /// Geoidal separation
    pub geoid_height: Option<f64>,
    /// Age of differential corrections in seconds
    pub dgps_age: Option<f64>,
}
