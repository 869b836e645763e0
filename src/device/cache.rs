//! Latest-value caches with independent arrival timestamps

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Position and velocity from the most recent valid RMC sentence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationReading {
    /// Degrees, positive = North
    pub latitude: f64,
    /// Degrees, positive = East
    pub longitude: f64,
    /// Speed over ground in knots
    pub speed: Option<f64>,
    /// True course over ground in degrees
    pub course: Option<f64>,
    /// Magnetic variation in degrees, positive = East
    pub variation: Option<f64>,
}

/// UTC date and time of the most recent valid RMC sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateTimeReading {
    pub date: NaiveDate,
    /// Time of day including the sub-second fraction
    pub time: NaiveTime,
}

impl DateTimeReading {
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }
}

/// Fix data from the most recent GGA sentence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SatelliteReading {
    pub satellites_tracked: u8,
    /// 0 = no fix
    pub fix_quality: u8,
    pub hdop: Option<f64>,
    /// Metres above mean sea level
    pub altitude: Option<f64>,
}

/// Which cached reading an age query refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadingKind {
    Location,
    DateTime,
    Satellite,
}

#[derive(Debug, Clone, Copy, Default)]
struct Stamped<T> {
    value: T,
    /// Uptime at which `value` was framed; `None` until the first update
    at: Option<Duration>,
}

impl<T: Copy> Stamped<T> {
    fn update(&mut self, value: T, now: Duration) {
        self.value = value;
        // timestamps of one kind never go backwards
        self.at = Some(self.at.map_or(now, |prev| prev.max(now)));
    }

    fn age(&self, now: Duration) -> Option<Duration> {
        self.at.map(|at| now.saturating_sub(at))
    }

    fn get(&self, now: Duration) -> (T, Option<Duration>) {
        (self.value, self.age(now))
    }
}

/// Holds the latest reading of each kind and when it arrived
///
/// Ages are `None` for a kind that has never been updated, which is
/// distinct from `Some(Duration::ZERO)` for one that just arrived.
#[derive(Debug, Clone, Default)]
pub struct ReadingCache {
    location: Stamped<LocationReading>,
    datetime: Stamped<DateTimeReading>,
    satellites: Stamped<SatelliteReading>,
}

impl ReadingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces location and date/time together, stamped with one instant
    pub fn update_fix(&mut self, location: LocationReading, datetime: DateTimeReading, now: Duration) {
        self.location.update(location, now);
        self.datetime.update(datetime, now);
    }

    /// Replaces the satellite reading and returns the previous fix quality
    pub fn update_satellites(&mut self, reading: SatelliteReading, now: Duration) -> u8 {
        let previous = self.satellites.value.fix_quality;
        self.satellites.update(reading, now);
        previous
    }

    pub fn location(&self, now: Duration) -> (LocationReading, Option<Duration>) {
        self.location.get(now)
    }

    pub fn datetime(&self, now: Duration) -> (DateTimeReading, Option<Duration>) {
        self.datetime.get(now)
    }

    pub fn satellites(&self, now: Duration) -> (SatelliteReading, Option<Duration>) {
        self.satellites.get(now)
    }

    pub fn age(&self, kind: ReadingKind, now: Duration) -> Option<Duration> {
        match kind {
            ReadingKind::Location => self.location.age(now),
            ReadingKind::DateTime => self.datetime.age(now),
            ReadingKind::Satellite => self.satellites.age(now),
        }
    }

    /// Current UTC estimate: the cached date/time advanced by its age
    ///
    /// Returns the estimate together with the age that was added, or `None`
    /// if no date/time has been received yet.
    pub fn wallclock(&self, now: Duration) -> Option<(DateTime<Utc>, Duration)> {
        let (reading, age) = self.datetime.get(now);
        let age = age?;
        let instant = reading.to_utc() + TimeDelta::from_std(age).ok()?;
        Some((instant, age))
    }
}
